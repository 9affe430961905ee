//! String key/value entries persisted as one JSON object.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocalStorageError {
    #[error("I/O error for {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] io::Error),

    #[error("Local storage file {} is not valid JSON: {}", .0.display(), .1)]
    Corrupt(PathBuf, #[source] serde_json::Error),

    #[error("Entry '{key}' could not be (de)serialized: {source}")]
    Entry {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Persisted string entries, shared by everything that keeps state across
/// runs. Every write is flushed to disk immediately.
#[derive(Debug)]
pub struct LocalStorage {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl LocalStorage {
    /// Storage that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Opens the file at `path`. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LocalStorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| LocalStorageError::Corrupt(path.clone(), e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(LocalStorageError::Io(path, e)),
        };

        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), LocalStorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LocalStorageError::Io(parent.to_path_buf(), e))?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| LocalStorageError::Corrupt(path.clone(), e))?;
        fs::write(path, content).map_err(|e| LocalStorageError::Io(path.clone(), e))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), LocalStorageError> {
        let mut entries = self.entries();
        entries.insert(key.to_string(), value.into());
        self.flush(&entries)
    }

    /// Removes `key`. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), LocalStorageError> {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    /// Reads `key` as JSON. Absent is `Ok(None)`; unparsable is an error.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LocalStorageError> {
        match self.get(key) {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| LocalStorageError::Entry {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), LocalStorageError> {
        let raw = serde_json::to_string(value).map_err(|source| LocalStorageError::Entry {
            key: key.to_string(),
            source,
        })?;
        self.set(key, raw)
    }
}
