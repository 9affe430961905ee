//! Document store error types.

use thiserror::Error;

use super::storage::StorageError;

/// Errors that can occur during document store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An update targeted a document that does not exist.
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Automerge operation failed.
    #[error("Automerge error: {0}")]
    Automerge(String),

    /// A server-timestamp placeholder reached the encoder unresolved.
    #[error("Unresolved server timestamp in field '{0}'")]
    UnresolvedTimestamp(String),

    /// Persisting or loading a collection failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The store's lock was poisoned by a panicking writer.
    #[error("Document store lock poisoned")]
    LockPoisoned,
}

impl From<automerge::AutomergeError> for StoreError {
    fn from(e: automerge::AutomergeError) -> Self {
        StoreError::Automerge(e.to_string())
    }
}
