//! Local [`DocumentStore`] backed by one Automerge document per collection.
//!
//! Several stores (in one process or many) may share a data directory. Each
//! read merges the collection file into the cached document, and each write
//! merges, applies and saves while holding the collection's file lock, so
//! concurrent sessions never drop each other's documents.

use async_trait::async_trait;
use automerge::AutoCommit;
use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::batch::{BatchOp, WriteBatch};
use super::codec;
use super::error::StoreError;
use super::query::Query;
use super::storage::CollectionStorage;
use super::subscription::{ListenerRegistry, SnapshotListener, Subscription};
use super::value::{resolve_server_timestamps, timestamp_from_millis, Fields};
use super::{Document, DocumentStore};

struct Inner {
    collections: HashMap<String, AutoCommit>,
    last_timestamp: Option<DateTime<Utc>>,
    /// Bumped whenever any cached collection changes.
    version: u64,
}

impl Inner {
    /// Server clock, truncated to stored precision and strictly increasing.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut ts = timestamp_from_millis(now.timestamp_millis()).unwrap_or(now);
        if let Some(last) = self.last_timestamp {
            if ts <= last {
                ts = last + Duration::milliseconds(1);
            }
        }
        self.last_timestamp = Some(ts);
        ts
    }
}

/// Document store kept in memory and optionally persisted to a data directory.
///
/// Collections are loaded lazily on first access. Every write (single or
/// batched) is staged on copies of the affected collections and only swapped
/// in once all operations succeeded.
pub struct LocalStore {
    inner: Mutex<Inner>,
    storage: Option<CollectionStorage>,
    listeners: Arc<ListenerRegistry>,
}

impl LocalStore {
    /// Creates a store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::with_storage(None)
    }

    /// Creates a store persisting collections under `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_storage(Some(CollectionStorage::new(data_dir.into())))
    }

    fn with_storage(storage: Option<CollectionStorage>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                collections: HashMap::new(),
                last_timestamp: None,
                version: 0,
            }),
            storage,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Returns the data directory, if persistent.
    pub fn data_dir(&self) -> Option<&PathBuf> {
        self.storage.as_ref().map(CollectionStorage::data_dir)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Picks up changes other stores saved to the data directory and
    /// re-delivers affected subscriptions.
    ///
    /// Returns whether anything changed. In-memory stores never change here.
    pub fn refresh(&self) -> Result<bool, StoreError> {
        let mut changed = BTreeSet::new();
        let result = self.pull_all(&self.listeners.collections(), &mut changed);
        self.notify(&changed);
        result.map(|()| !changed.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn load<'a>(
        &self,
        collections: &'a mut HashMap<String, AutoCommit>,
        name: &str,
    ) -> Result<&'a mut AutoCommit, StoreError> {
        CollectionStorage::validate_collection(name)?;

        match collections.entry(name.to_string()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let doc = match &self.storage {
                    Some(storage) => storage.load_or_create(name)?,
                    None => AutoCommit::new(),
                };
                Ok(e.insert(doc))
            }
        }
    }

    /// Merges the saved copy of `name` into the cache. Returns whether the
    /// cached document gained changes.
    fn pull(&self, inner: &mut Inner, name: &str) -> Result<bool, StoreError> {
        let doc = self.load(&mut inner.collections, name)?;
        let Some(storage) = &self.storage else {
            return Ok(false);
        };
        let Some(mut saved) = storage.load(name)? else {
            return Ok(false);
        };

        let before = doc.get_heads();
        doc.merge(&mut saved)?;
        let pulled = doc.get_heads() != before;
        if pulled {
            inner.version += 1;
            tracing::debug!(collection = name, "Merged changes from disk");
        }
        Ok(pulled)
    }

    fn pull_all(
        &self,
        names: &BTreeSet<String>,
        changed: &mut BTreeSet<String>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for name in names {
            if self.pull(&mut inner, name)? {
                changed.insert(name.clone());
            }
        }
        Ok(())
    }

    /// Reads the cached result of `query` with the version it reflects.
    fn snapshot(&self, query: &Query) -> Result<(u64, Vec<Document>), StoreError> {
        let mut inner = self.lock()?;
        let version = inner.version;
        let doc = self.load(&mut inner.collections, query.collection_name())?;
        let documents = codec::read_all_documents(doc)?;
        Ok((version, query.apply(documents)))
    }

    /// Brings one collection up to date with disk before a read.
    fn sync(&self, name: &str) -> Result<(), StoreError> {
        let mut changed = BTreeSet::new();
        let pulled = self.pull_all(&BTreeSet::from([name.to_string()]), &mut changed);
        self.notify(&changed);
        pulled
    }

    /// Applies operations atomically. Collections that changed (including
    /// changes merged from disk before a failed batch) are added to `changed`.
    fn apply(&self, ops: Vec<BatchOp>, changed: &mut BTreeSet<String>) -> Result<(), StoreError> {
        let names: BTreeSet<String> = ops.iter().map(|op| op.collection().to_string()).collect();
        for name in &names {
            CollectionStorage::validate_collection(name)?;
        }

        // Sorted acquisition keeps concurrent multi-collection batches from deadlocking.
        let _locks = match &self.storage {
            Some(storage) => names
                .iter()
                .map(|name| storage.lock(name))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let mut inner = self.lock()?;
        for name in &names {
            if self.pull(&mut inner, name)? {
                changed.insert(name.clone());
            }
        }

        let now = inner.next_timestamp();
        let mut staged: HashMap<String, AutoCommit> = HashMap::new();

        for op in ops {
            let doc = match staged.entry(op.collection().to_string()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let current = self.load(&mut inner.collections, e.key())?.clone();
                    e.insert(current)
                }
            };

            match op {
                BatchOp::Set { id, mut fields, .. } => {
                    resolve_server_timestamps(&mut fields, now);
                    codec::write_document(doc, &id, &fields)?;
                }
                BatchOp::Update {
                    collection,
                    id,
                    mut fields,
                } => {
                    resolve_server_timestamps(&mut fields, now);
                    if !codec::merge_document(doc, &id, &fields)? {
                        return Err(StoreError::NotFound { collection, id });
                    }
                }
            }
        }

        // Disk writes are per collection; a batch spanning collections can
        // be partially persisted if the filesystem fails midway.
        if let Some(storage) = &self.storage {
            for (name, doc) in staged.iter_mut() {
                storage.save(name, doc)?;
            }
        }

        changed.extend(staged.keys().cloned());
        inner.collections.extend(staged);
        inner.version += 1;

        Ok(())
    }

    /// Re-delivers every listener whose collection changed. Called without the lock held.
    fn notify(&self, changed: &BTreeSet<String>) {
        if changed.is_empty() {
            return;
        }
        for listener in self.listeners.matching(changed) {
            match self.snapshot(listener.query()) {
                Ok((version, documents)) => listener.offer(version, documents),
                Err(e) => tracing::warn!(
                    collection = listener.query().collection_name(),
                    "Failed to refresh subscription: {}",
                    e
                ),
            }
        }
    }

    fn write(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut changed = BTreeSet::new();
        let result = self.apply(ops, &mut changed);
        self.notify(&changed);
        result
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.write(vec![BatchOp::Set {
            collection: collection.to_string(),
            id: id.clone(),
            fields,
        }])?;
        tracing::debug!(collection, id = %id, "Document added");
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.write(vec![BatchOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        }])
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.sync(collection)?;
        let mut inner = self.lock()?;
        let doc = self.load(&mut inner.collections, collection)?;
        codec::read_document(doc, id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.write(vec![BatchOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        }])
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.sync(query.collection_name())?;
        self.snapshot(query).map(|(_, documents)| documents)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let count = batch.len();
        self.write(batch.into_ops())?;
        tracing::debug!(operations = count, "Batch committed");
        Ok(())
    }

    fn subscribe(
        &self,
        query: Query,
        listener: SnapshotListener,
    ) -> Result<Subscription, StoreError> {
        let (subscription, registered) = self.listeners.register(query.clone(), listener);
        self.sync(query.collection_name())?;
        let (version, documents) = self.snapshot(&query)?;
        registered.offer(version, documents);
        Ok(subscription)
    }
}
