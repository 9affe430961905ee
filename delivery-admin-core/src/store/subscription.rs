//! Snapshot listeners and the handles that keep them registered.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::query::Query;
use super::Document;

/// Callback receiving the full, current result set of a query.
pub type SnapshotListener = Arc<dyn Fn(Vec<Document>) + Send + Sync>;

#[derive(Default)]
struct Delivery {
    delivered: Option<u64>,
    pending: Option<(u64, Vec<Document>)>,
    in_progress: bool,
}

impl Delivery {
    fn is_newer(&self, version: u64) -> bool {
        let latest = self.pending.as_ref().map(|(v, _)| *v).or(self.delivered);
        latest.map_or(true, |latest| version > latest)
    }
}

/// A registered query and its callback.
///
/// Snapshots are tagged with the store version they were read at. Older
/// snapshots than the last one offered are dropped, and callbacks for one
/// listener never overlap.
pub struct Listener {
    query: Query,
    callback: SnapshotListener,
    delivery: Mutex<Delivery>,
}

impl Listener {
    fn new(query: Query, callback: SnapshotListener) -> Self {
        Self {
            query,
            callback,
            delivery: Mutex::new(Delivery::default()),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Hands a snapshot read at `version` to the callback.
    ///
    /// If another thread is already inside the callback (or the callback
    /// itself caused this offer) the snapshot is parked and delivered by
    /// that caller once it returns.
    pub fn offer(&self, version: u64, documents: Vec<Document>) {
        let mut state = self.delivery.lock().unwrap_or_else(|e| e.into_inner());
        if !state.is_newer(version) {
            return;
        }
        state.pending = Some((version, documents));
        if state.in_progress {
            return;
        }

        state.in_progress = true;
        while let Some((version, documents)) = state.pending.take() {
            drop(state);
            (self.callback)(documents);
            state = self.delivery.lock().unwrap_or_else(|e| e.into_inner());
            state.delivered = Some(version);
        }
        state.in_progress = false;
    }
}

/// Registered snapshot listeners, keyed by subscription id.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Arc<Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a listener and returns the handle that owns its registration.
    pub fn register(
        self: &Arc<Self>,
        query: Query,
        callback: SnapshotListener,
    ) -> (Subscription, Arc<Listener>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(Listener::new(query, callback));
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::clone(&listener));

        tracing::debug!(subscription = id, "Listener registered");

        let subscription = Subscription {
            id,
            registry: Arc::downgrade(self),
        };
        (subscription, listener)
    }

    fn remove(&self, id: u64) -> bool {
        let removed = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some();
        if removed {
            tracing::debug!(subscription = id, "Listener removed");
        }
        removed
    }

    fn contains(&self, id: u64) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&id)
    }

    /// Listeners whose query reads one of the `changed` collections.
    pub fn matching(&self, changed: &BTreeSet<String>) -> Vec<Arc<Listener>> {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|l| changed.contains(l.query.collection_name()))
            .cloned()
            .collect()
    }

    /// Collections read by at least one listener.
    pub fn collections(&self) -> BTreeSet<String> {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|l| l.query.collection_name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a live snapshot subscription.
///
/// The listener stays registered until [`Subscription::unsubscribe`] is
/// called or the handle is dropped.
#[must_use = "dropping a Subscription stops its listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|r| r.contains(self.id))
            .unwrap_or(false)
    }

    /// Stops the listener.
    pub fn unsubscribe(self) {
        // Drop performs the removal.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> SnapshotListener {
        Arc::new(|_docs: Vec<Document>| {})
    }

    fn docs(ids: &[&str]) -> Vec<Document> {
        ids.iter()
            .map(|id| Document {
                id: id.to_string(),
                fields: Default::default(),
            })
            .collect()
    }

    fn recording() -> (SnapshotListener, Arc<Mutex<Vec<usize>>>) {
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: SnapshotListener = Arc::new(move |docs: Vec<Document>| {
            sink.lock().unwrap().push(docs.len());
        });
        (callback, seen)
    }

    #[test]
    fn test_drop_unregisters() {
        let registry = ListenerRegistry::new();
        let sub = registry.register(Query::collection("deliveries"), noop()).0;
        assert!(sub.is_active());
        assert_eq!(registry.len(), 1);

        drop(sub);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe_unregisters() {
        let registry = ListenerRegistry::new();
        let keep = registry.register(Query::collection("deliveries"), noop()).0;
        let stop = registry.register(Query::collection("deliveries"), noop()).0;

        stop.unsubscribe();
        assert_eq!(registry.len(), 1);
        assert!(keep.is_active());
    }

    #[test]
    fn test_matching_filters_by_collection() {
        let registry = ListenerRegistry::new();
        let _a = registry.register(Query::collection("deliveries"), noop()).0;
        let _b = registry.register(Query::collection("deliveryPartners"), noop()).0;

        let changed: BTreeSet<String> = ["deliveries".to_string()].into_iter().collect();
        let matching = registry.matching(&changed);
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].query().collection_name(), "deliveries");
    }

    #[test]
    fn test_collections_lists_subscribed() {
        let registry = ListenerRegistry::new();
        let _a = registry.register(Query::collection("deliveries"), noop()).0;
        let _b = registry.register(Query::collection("deliveries"), noop()).0;
        let _c = registry.register(Query::collection("admins"), noop()).0;

        let names: Vec<String> = registry.collections().into_iter().collect();
        assert_eq!(names, vec!["admins".to_string(), "deliveries".to_string()]);
    }

    #[test]
    fn test_stale_snapshot_is_dropped() {
        let registry = ListenerRegistry::new();
        let (callback, seen) = recording();
        let (_sub, listener) = registry.register(Query::collection("deliveries"), callback);

        listener.offer(0, docs(&["a"]));
        listener.offer(2, docs(&["a", "b", "c"]));
        listener.offer(1, docs(&["a", "b"]));
        listener.offer(2, docs(&["a", "b", "c"]));

        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_offer_from_inside_callback_is_delivered_after() {
        let registry = ListenerRegistry::new();
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let slot: Arc<Mutex<Option<Arc<Listener>>>> = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&seen);
        let inner_slot = Arc::clone(&slot);
        let callback: SnapshotListener = Arc::new(move |docs: Vec<Document>| {
            sink.lock().unwrap().push(docs.len());
            if docs.len() == 1 {
                let listener = inner_slot.lock().unwrap().clone().unwrap();
                listener.offer(5, vec![docs[0].clone(), docs[0].clone()]);
                // Parked until this call returns.
                assert_eq!(sink.lock().unwrap().len(), 1);
            }
        });
        let (_sub, listener) = registry.register(Query::collection("deliveries"), callback);
        *slot.lock().unwrap() = Some(Arc::clone(&listener));

        listener.offer(1, docs(&["a"]));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_concurrent_offers_end_on_newest() {
        let registry = ListenerRegistry::new();
        let (callback, seen) = recording();
        let (_sub, listener) = registry.register(Query::collection("deliveries"), callback);

        let handles: Vec<_> = (1..=8u64)
            .map(|v| {
                let listener = Arc::clone(&listener);
                std::thread::spawn(move || {
                    let ids: Vec<String> = (0..v).map(|i| i.to_string()).collect();
                    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
                    listener.offer(v, docs(&refs));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&8));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_handle_outliving_registry_is_inactive() {
        let registry = ListenerRegistry::new();
        let sub = registry.register(Query::collection("deliveries"), noop()).0;
        drop(registry);
        assert!(!sub.is_active());
    }
}
