use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::sync::driver::IgnoreRules;
use crate::sync::state::DEFAULT_STATE_FILE;

const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Resolved run configuration: the local tree to mirror, the remote target
/// folder, and where sync state lives.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub local_folder: PathBuf,
    pub root_folder_id: String,
    pub state_path: PathBuf,
    pub ignore: IgnoreRules,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    root_folder_id: Option<String>,
    local_folder: Option<PathBuf>,
    #[serde(default)]
    state_path: Option<PathBuf>,
    #[serde(default)]
    ignored_folders: Option<Vec<String>>,
    #[serde(default)]
    ignored_files: Option<Vec<String>>,
    #[serde(default)]
    ignored_suffixes: Option<Vec<String>>,
}

impl SyncConfig {
    /// Loads `config.json` (or an explicitly given file) and applies
    /// `DRIVEMIRROR_*` environment overrides on top.
    pub fn load(explicit_path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match explicit_path {
            Some(path) => {
                let bytes = fs::read(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?
            }
            None => match fs::read(DEFAULT_CONFIG_FILE) {
                Ok(bytes) => serde_json::from_slice(&bytes)
                    .with_context(|| format!("failed to parse {DEFAULT_CONFIG_FILE}"))?,
                Err(_) => ConfigFile::default(),
            },
        };
        resolve(file, &|name| std::env::var(name).ok())
    }
}

fn resolve(file: ConfigFile, env: &dyn Fn(&str) -> Option<String>) -> anyhow::Result<SyncConfig> {
    let root_folder_id = env("DRIVEMIRROR_ROOT_FOLDER_ID")
        .or(file.root_folder_id)
        .context("root_folder_id is not configured (config.json or DRIVEMIRROR_ROOT_FOLDER_ID)")?;
    let local_folder = env("DRIVEMIRROR_LOCAL_FOLDER")
        .map(PathBuf::from)
        .or(file.local_folder)
        .context("local_folder is not configured (config.json or DRIVEMIRROR_LOCAL_FOLDER)")?;
    let state_path = env("DRIVEMIRROR_STATE_PATH")
        .map(PathBuf::from)
        .or(file.state_path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));

    let mut ignore = IgnoreRules::default();
    if let Some(folders) = file.ignored_folders {
        ignore.folders = folders;
    }
    if let Some(files) = file.ignored_files {
        ignore.files = files;
    }
    if let Some(suffixes) = file.ignored_suffixes {
        ignore.suffixes = suffixes;
    }

    Ok(SyncConfig {
        local_folder,
        root_folder_id,
        state_path,
        ignore,
    })
}
