//! Persistent key/value store for the user's bearer credential.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Could not determine a data directory")]
    NoDataDir,
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Source of opaque credentials, keyed by name.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError>;

    fn remove(&self, key: &str) -> Result<(), CredentialError>;
}

/// Credentials held in memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor holding a single credential.
    pub fn with(key: &str, value: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert(key.to_string(), value.to_string());
        Self {
            values: RwLock::new(values),
        }
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> CredentialError {
    CredentialError::Lock(e.to_string())
}

impl CredentialStore for MemoryCredentials {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.values.read().map_err(lock_error)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.values
            .write()
            .map_err(lock_error)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CredentialError> {
        self.values.write().map_err(lock_error)?.remove(key);
        Ok(())
    }
}

/// Credentials stored as a JSON object in a single file.
///
/// The file is re-read on every access so several processes can share it.
#[derive(Debug)]
pub struct FileCredentials {
    path: PathBuf,
    write_lock: RwLock<()>,
}

impl FileCredentials {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: RwLock::new(()),
        }
    }

    /// Credentials file in the default location.
    ///
    /// On Linux: `~/.local/share/inkroom/credentials.json`
    /// On Windows: `%LOCALAPPDATA%\inkroom\credentials.json`
    pub fn default_location() -> Result<Self, CredentialError> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or(CredentialError::NoDataDir)?;
        Ok(Self::new(base.join("inkroom").join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(json) if json.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentials {
    fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        let _guard = self.write_lock.read().map_err(lock_error)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        let _guard = self.write_lock.write().map_err(lock_error)?;
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> Result<(), CredentialError> {
        let _guard = self.write_lock.write().map_err(lock_error)?;
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_credentials() {
        let creds = MemoryCredentials::with("whiteboard_user_token", "abc");
        assert_eq!(creds.get("whiteboard_user_token").unwrap().as_deref(), Some("abc"));
        creds.remove("whiteboard_user_token").unwrap();
        assert_eq!(creds.get("whiteboard_user_token").unwrap(), None);
    }

    #[test]
    fn test_file_credentials_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");
        let creds = FileCredentials::new(path.clone());
        assert_eq!(creds.get("token").unwrap(), None);

        creds.set("token", "s3cret").unwrap();
        let reopened = FileCredentials::new(path);
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("s3cret"));

        reopened.remove("token").unwrap();
        assert_eq!(creds.get("token").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{not json").unwrap();
        let creds = FileCredentials::new(path);
        assert!(matches!(creds.get("token"), Err(CredentialError::Serialization(_))));
    }
}
