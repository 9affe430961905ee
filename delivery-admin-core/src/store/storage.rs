//! On-disk persistence for collection documents.
//!
//! Each collection is one Automerge document stored as
//! `<data_dir>/<collection>.automerge`. Writers serialize on an advisory
//! lock file next to it; saves replace the file atomically so readers never
//! see a partial document.

use automerge::AutoCommit;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// File extension for collection documents.
const DOC_EXTENSION: &str = "automerge";

/// Errors that can occur during collection storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error reading or writing a file.
    #[error("I/O error for {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] io::Error),

    /// Error loading/parsing an Automerge document.
    #[error("Failed to load document {}: {}", .0.display(), .1)]
    Load(PathBuf, String),

    /// Collection name that cannot be used as a file name.
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),
}

/// Exclusive write lock on one collection, released on drop.
#[derive(Debug)]
pub struct CollectionLock {
    file: File,
}

impl Drop for CollectionLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Storage for collection documents.
///
/// Handles loading and saving collections to the filesystem.
#[derive(Clone, Debug)]
pub struct CollectionStorage {
    data_dir: PathBuf,
}

impl CollectionStorage {
    /// Creates a new storage instance rooted at `data_dir`.
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Rejects names that could escape the data directory.
    pub fn validate_collection(collection: &str) -> Result<(), StorageError> {
        if collection.is_empty()
            || collection.contains('/')
            || collection.contains('\\')
            || collection.contains("..")
            || collection.starts_with('.')
        {
            return Err(StorageError::InvalidCollection(collection.to_string()));
        }
        Ok(())
    }

    /// Returns the full path for a collection.
    pub fn path(&self, collection: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", collection, DOC_EXTENSION))
    }

    fn lock_path(&self, collection: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}.lock", collection, DOC_EXTENSION))
    }

    /// Blocks until this process holds the collection's write lock.
    pub fn lock(&self, collection: &str) -> Result<CollectionLock, StorageError> {
        Self::validate_collection(collection)?;
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::Io(self.data_dir.clone(), e))?;

        let path = self.lock_path(collection);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StorageError::Io(path.clone(), e))?;
        file.lock_exclusive()
            .map_err(|e| StorageError::Io(path, e))?;

        Ok(CollectionLock { file })
    }

    /// Checks if a collection exists on disk.
    pub fn exists(&self, collection: &str) -> bool {
        self.path(collection).exists()
    }

    /// Loads a collection from disk.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn load(&self, collection: &str) -> Result<Option<AutoCommit>, StorageError> {
        Self::validate_collection(collection)?;
        let path = self.path(collection);

        match fs::read(&path) {
            Ok(bytes) => {
                let doc = AutoCommit::load(&bytes)
                    .map_err(|e| StorageError::Load(path, e.to_string()))?;
                Ok(Some(doc))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }

    /// Loads a collection or creates an empty one if it doesn't exist.
    pub fn load_or_create(&self, collection: &str) -> Result<AutoCommit, StorageError> {
        match self.load(collection)? {
            Some(doc) => Ok(doc),
            None => Ok(AutoCommit::new()),
        }
    }

    /// Saves a collection to disk, creating the data directory if needed.
    ///
    /// Callers sharing the data directory with other processes must hold the
    /// collection's [`lock`](Self::lock) and merge the on-disk document first.
    pub fn save(&self, collection: &str, doc: &mut AutoCommit) -> Result<(), StorageError> {
        Self::validate_collection(collection)?;

        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::Io(self.data_dir.clone(), e))?;

        let path = self.path(collection);
        let staging = path.with_extension(format!("{}.tmp", DOC_EXTENSION));
        let bytes = doc.save();

        fs::write(&staging, bytes).map_err(|e| StorageError::Io(staging.clone(), e))?;
        fs::rename(&staging, &path).map_err(|e| StorageError::Io(path, e))?;

        Ok(())
    }
}
