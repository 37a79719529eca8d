use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_STATE_FILE: &str = "drivemirror-state.json";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Remote identity of one uploaded file, keyed by name under its parent
/// folder id. Replaced wholesale when the file is re-uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub last_modified: i64,
}

/// Everything remembered between runs: which remote folder backs each local
/// subpath, and which remote file backs each uploaded name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub folders: BTreeMap<String, String>,
    #[serde(default)]
    pub files: BTreeMap<String, BTreeMap<String, FileRecord>>,
}

impl SyncState {
    pub fn folder_id(&self, subpath: &str) -> Option<&str> {
        self.folders.get(subpath).map(String::as_str)
    }

    pub fn record_folder(&mut self, subpath: impl Into<String>, folder_id: impl Into<String>) {
        self.folders.insert(subpath.into(), folder_id.into());
    }

    pub fn file_record(&self, folder_id: &str, name: &str) -> Option<&FileRecord> {
        self.files.get(folder_id)?.get(name)
    }

    pub fn record_file(&mut self, folder_id: impl Into<String>, name: impl Into<String>, record: FileRecord) {
        self.files
            .entry(folder_id.into())
            .or_default()
            .insert(name.into(), record);
    }

    pub fn remove_file(&mut self, folder_id: &str, name: &str) {
        if let Some(records) = self.files.get_mut(folder_id) {
            records.remove(name);
            if records.is_empty() {
                self.files.remove(folder_id);
            }
        }
    }
}

/// Loads and persists [`SyncState`] as pretty JSON at a fixed path.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the persisted state. A missing or malformed file yields an
    /// empty state instead of an error so a fresh run can always start.
    pub fn load(&self) -> SyncState {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => SyncState::default(),
        }
    }

    /// Persists the state atomically: write a `.partial` sibling, fsync,
    /// then rename over the real file so readers never see a torn write.
    pub fn save(&self, state: &SyncState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let partial = partial_path(&self.path);
        let mut file = fs::File::create(&partial)?;
        serde_json::to_writer_pretty(&mut file, state)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        fs::rename(&partial, &self.path)?;
        Ok(())
    }
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}
