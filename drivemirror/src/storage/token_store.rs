use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::OAuthState;

const APP_DIR: &str = "drivemirror";
const TOKEN_FILENAME: &str = "token.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("token file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no saved token")]
    TokenNotFound,
    #[error("user data directory is unavailable")]
    MissingDataDir,
}

/// Stores the OAuth state as a JSON file under the user data directory.
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new() -> Result<Self, StorageError> {
        let mut path = dirs::data_dir().ok_or(StorageError::MissingDataDir)?;
        path.push(APP_DIR);
        path.push(TOKEN_FILENAME);
        Ok(Self { path })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save_state(&self, state: &OAuthState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn get_state(&self) -> Result<OAuthState, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::TokenNotFound);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn delete_state(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn has_state(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_state() -> OAuthState {
        OAuthState {
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
            expires_at: Some(1_700_000_000),
            scope: Some("https://www.googleapis.com/auth/drive.file".into()),
            token_type: Some("Bearer".into()),
        }
    }

    #[test]
    fn save_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let storage = TokenStorage::with_path(dir.path().join("nested/token.json"));

        storage.save_state(&sample_state()).unwrap();
        assert!(storage.has_state());
        assert_eq!(storage.get_state().unwrap(), sample_state());
    }

    #[test]
    fn missing_token_reports_not_found() {
        let dir = tempdir().unwrap();
        let storage = TokenStorage::with_path(dir.path().join("token.json"));

        assert!(!storage.has_state());
        assert!(matches!(
            storage.get_state(),
            Err(StorageError::TokenNotFound)
        ));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = TokenStorage::with_path(dir.path().join("token.json"));

        storage.save_state(&sample_state()).unwrap();
        storage.delete_state().unwrap();
        storage.delete_state().unwrap();
        assert!(!storage.has_state());
    }
}
