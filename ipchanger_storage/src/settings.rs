use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;
use log::debug;
use tempfile::NamedTempFile;

use crate::errors::StorageError;

/// A string-valued key/value store, the persistence seam of [`crate::ProfileStore`].
pub trait SettingsBackend {
    /// `Ok(None)` when the key has never been written.
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: SettingsBackend + ?Sized> SettingsBackend for Arc<T> {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_string(key, value)
    }
}

/// One file per key inside a settings directory.
#[derive(Debug, Clone)]
pub struct FileSettings {
    dir: PathBuf,
}

impl FileSettings {
    /// `~/.config/ipchanger` on Linux, `%APPDATA%\ipchanger` on Windows, etc.
    pub fn new() -> Result<Self, StorageError> {
        let proj = ProjectDirs::from("", "", "ipchanger").ok_or(StorageError::ConfigDir)?;
        Ok(Self::with_dir(proj.config_dir()))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SettingsBackend for FileSettings {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.file_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a temp file next to the target and renames it over, so a
    /// reader never sees a half-written value.
    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        let path = self.file_for(key);
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }
}

/// In-process backend for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsBackend for MemorySettings {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.values.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
