use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use drivemirror_core::{DriveClient, DriveError, DriveFile};
use thiserror::Error;

use super::paths::{self, PathError};
use super::resolver::{ResolveError, resolve_folder};
use super::state::{FileRecord, StateError, StateStore, SyncState};
use super::transfer::{TransferClient, TransferError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("folder resolution error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("path error: {0}")]
    Path(#[from] PathError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
enum UploadError {
    #[error("api error: {0}")]
    Api(#[from] DriveError),
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
}

/// Name-based exclusions applied while walking the local tree.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    /// Directory names that suppress their whole subtree, matched against
    /// every path component.
    pub folders: Vec<String>,
    /// Exact file names that are never uploaded.
    pub files: Vec<String>,
    /// Case-insensitive file name suffixes that are never uploaded.
    pub suffixes: Vec<String>,
    /// Files whose name starts with this marker are treated as hidden.
    pub hidden_marker: char,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            folders: vec![".git".to_string()],
            files: Vec::new(),
            suffixes: vec![".sample".to_string()],
            hidden_marker: '.',
        }
    }
}

impl IgnoreRules {
    fn skips_subpath(&self, subpath: &str) -> bool {
        self.folders
            .iter()
            .any(|ignored| paths::contains_component(subpath, ignored))
    }

    fn skips_file(&self, name: &str) -> bool {
        if name.starts_with(self.hidden_marker) {
            return true;
        }
        if self.files.iter().any(|ignored| ignored == name) {
            return true;
        }
        let lowered = name.to_ascii_lowercase();
        self.suffixes
            .iter()
            .any(|suffix| lowered.ends_with(&suffix.to_ascii_lowercase()))
    }
}

struct LocalFile {
    name: String,
    path: PathBuf,
    modified: i64,
}

struct LocalDirectory {
    subpath: String,
    files: Vec<LocalFile>,
}

/// Walks the local tree and mirrors it into the configured remote folder,
/// uploading new and changed files and reusing previously created remote
/// folders via the persisted state.
pub struct SyncDriver {
    client: DriveClient,
    transfer: TransferClient,
    store: StateStore,
    ignore: IgnoreRules,
}

impl SyncDriver {
    pub fn new(client: DriveClient, store: StateStore) -> Self {
        Self {
            client,
            transfer: TransferClient::new(),
            store,
            ignore: IgnoreRules::default(),
        }
    }

    pub fn with_ignore_rules(mut self, ignore: IgnoreRules) -> Self {
        self.ignore = ignore;
        self
    }

    /// Runs one full sync pass. Per-item remote failures are logged and
    /// skipped; only local state persistence and tree walking problems
    /// abort the run.
    pub async fn run(
        &self,
        state: &mut SyncState,
        local_root: &Path,
        root_folder_id: &str,
    ) -> Result<(), SyncError> {
        for directory in scan_tree(local_root, &self.ignore)? {
            let folder_id = if directory.subpath.is_empty() {
                root_folder_id.to_string()
            } else {
                match resolve_folder(
                    &self.client,
                    &self.store,
                    state,
                    &directory.subpath,
                    root_folder_id,
                )
                .await
                {
                    Ok(id) => id,
                    Err(ResolveError::State(err)) => return Err(err.into()),
                    Err(err) => {
                        eprintln!(
                            "[drivemirror] folder error for {}: {err}",
                            directory.subpath
                        );
                        continue;
                    }
                }
            };

            for file in &directory.files {
                self.sync_file(state, &folder_id, file).await?;
            }
        }
        Ok(())
    }

    async fn sync_file(
        &self,
        state: &mut SyncState,
        folder_id: &str,
        file: &LocalFile,
    ) -> Result<(), SyncError> {
        if let Some(existing) = state.file_record(folder_id, &file.name).cloned() {
            // Non-strict on purpose: an equal timestamp counts as current.
            if existing.last_modified >= file.modified {
                eprintln!(
                    "[drivemirror] skipped {} (remote copy is current)",
                    file.path.display()
                );
                return Ok(());
            }
            // Best effort. A failed delete leaves an orphaned remote copy
            // under the old id; the new version is uploaded regardless.
            match self.client.delete_file(&existing.id).await {
                Ok(()) => {
                    // The record must not outlive the remote file it points
                    // at. Dropping it here means a failed upload leaves the
                    // file looking new on the next run.
                    state.remove_file(folder_id, &file.name);
                    self.store.save(state)?;
                    eprintln!(
                        "[drivemirror] deleted stale copy of {} ({})",
                        file.name, existing.id
                    );
                }
                Err(err) => eprintln!(
                    "[drivemirror] delete failed for {} ({}): {err}",
                    file.name, existing.id
                ),
            }
        }

        match self.upload(folder_id, file).await {
            Ok(uploaded) => {
                state.record_file(
                    folder_id,
                    file.name.clone(),
                    FileRecord {
                        id: uploaded.id.clone(),
                        last_modified: file.modified,
                    },
                );
                self.store.save(state)?;
                eprintln!(
                    "[drivemirror] uploaded {} ({})",
                    file.path.display(),
                    uploaded.id
                );
            }
            Err(err) => {
                eprintln!("[drivemirror] upload failed for {}: {err}", file.path.display());
            }
        }
        Ok(())
    }

    async fn upload(&self, folder_id: &str, file: &LocalFile) -> Result<DriveFile, UploadError> {
        let session = self
            .client
            .start_resumable_upload(&file.name, folder_id)
            .await?;
        Ok(self.transfer.upload_from_path(&session, &file.path).await?)
    }
}

/// Collects every non-ignored directory under `root` in depth-first order,
/// together with the directly contained files that survive the ignore
/// rules. Entries are sorted by name so runs are deterministic.
fn scan_tree(root: &Path, ignore: &IgnoreRules) -> Result<Vec<LocalDirectory>, SyncError> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let subpath = paths::relative_subpath(root, &dir)?;
        if !subpath.is_empty() && ignore.skips_subpath(&subpath) {
            eprintln!(
                "[drivemirror] skipped subtree {} (ignored folder)",
                dir.display()
            );
            continue;
        }
        let mut files = Vec::new();
        let mut subdirs = Vec::new();

        let mut entries: Vec<fs::DirEntry> = fs::read_dir(&dir)?.collect::<Result<_, _>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let Ok(name) = entry.file_name().into_string() else {
                eprintln!(
                    "[drivemirror] skipped {:?} (non-unicode name)",
                    entry.path()
                );
                continue;
            };
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                subdirs.push(entry.path());
            } else if file_type.is_file() {
                if ignore.skips_file(&name) {
                    eprintln!(
                        "[drivemirror] skipped {} (ignored file)",
                        entry.path().display()
                    );
                    continue;
                }
                let modified = local_mtime(&entry.path())?;
                files.push(LocalFile {
                    name,
                    path: entry.path(),
                    modified,
                });
            }
        }

        out.push(LocalDirectory { subpath, files });
        // Reverse so the stack pops subdirectories in name order.
        for subdir in subdirs.into_iter().rev() {
            stack.push(subdir);
        }
    }

    Ok(out)
}

fn local_mtime(path: &Path) -> Result<i64, io::Error> {
    let modified = fs::metadata(path)?.modified()?;
    let seconds = match modified.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs() as i64,
        Err(before_epoch) => -(before_epoch.duration().as_secs() as i64),
    };
    Ok(seconds)
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod driver_tests;
