//! Document store: the persistence client the data-access services talk to.
//!
//! The store models a schema-less document database:
//!
//! - named collections of documents keyed by generated ids
//! - ordered, filtered queries
//! - atomic write batches
//! - server timestamps resolved at write time
//! - snapshot subscriptions that re-deliver a query's full result set on
//!   every change
//!
//! [`LocalStore`] implements [`DocumentStore`] on top of Automerge documents,
//! one per collection, optionally persisted to a data directory.

mod batch;
mod codec;
mod error;
mod local;
mod query;
mod storage;
mod subscription;
mod value;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use batch::{BatchOp, WriteBatch};
pub use error::StoreError;
pub use local::LocalStore;
pub use query::{Direction, Query};
pub use storage::{CollectionStorage, StorageError};
pub use subscription::{Listener, ListenerRegistry, SnapshotListener, Subscription};
pub use value::{FieldValue, Fields};

/// A document read from a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_i64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_bool)
    }

    pub fn get_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(FieldValue::as_timestamp)
    }
}

/// Operations a document database client must provide.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Adds a document under a generated id and returns the id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Creates or overwrites the document at `id`.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Reads one document. Absence is `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merges top-level fields into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Runs a one-shot query.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Commits every operation in `batch`, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Delivers the query's current results to `listener` now and again
    /// after every change to the queried collection.
    fn subscribe(
        &self,
        query: Query,
        listener: SnapshotListener,
    ) -> Result<Subscription, StoreError>;
}
