//! Memory 文档存储 (同进程)
//!
//! In-process [`DocumentStore`] used by tests and the demo. Writes made
//! through the handle are pushed to live subscriptions the way a hosted
//! store would push them, and failures can be injected per call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{
    ChangeBatch, ChangeKind, ConnectionSettings, DocumentChange, DocumentStore, RemoteDocument,
    StoreConnector, StoreError, Subscription,
};

#[derive(Default)]
struct StoreState {
    /// collection -> documents in insertion order
    collections: HashMap<String, Vec<RemoteDocument>>,
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<ChangeBatch>>>,
    failing_deletes: HashSet<String>,
    next_snapshot_error: Option<StoreError>,
    next_listen_error: Option<StoreError>,
    snapshot_calls: usize,
    delete_calls: usize,
}

impl StoreState {
    fn publish(&mut self, collection: &str, change: DocumentChange) {
        if let Some(subscribers) = self.subscribers.get_mut(collection) {
            let batch = ChangeBatch {
                changes: vec![change],
            };
            // Closed receivers are dropped here
            subscribers.retain(|tx| tx.send(batch.clone()).is_ok());
        }
    }
}

/// In-memory document store, clones share the same data
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<StoreState>>,
}

impl std::fmt::Debug for MemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryDocumentStore")
            .field("collections", &state.collections.len())
            .field("snapshot_calls", &state.snapshot_calls)
            .finish()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document under a generated id, returns the id
    pub fn insert(&self, collection: &str, fields: Value) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.insert_with_id(collection, &id, fields);
        id
    }

    /// Add or replace a document
    pub fn insert_with_id(&self, collection: &str, id: &str, fields: Value) {
        let document = RemoteDocument::from_json(id, fields);
        let mut state = self.state.lock();
        let docs = state.collections.entry(collection.to_string()).or_default();
        let kind = match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => {
                *existing = document.clone();
                ChangeKind::Modified
            }
            None => {
                docs.push(document.clone());
                ChangeKind::Added
            }
        };
        state.publish(collection, DocumentChange { kind, document });
    }

    /// Replace the fields of an existing document
    pub fn update(&self, collection: &str, id: &str, fields: Value) -> bool {
        let exists = self
            .state
            .lock()
            .collections
            .get(collection)
            .is_some_and(|docs| docs.iter().any(|d| d.id == id));
        if exists {
            self.insert_with_id(collection, id, fields);
        }
        exists
    }

    /// Make every delete of `id` fail until cleared
    pub fn fail_delete_of(&self, id: &str) {
        self.state.lock().failing_deletes.insert(id.to_string());
    }

    pub fn clear_delete_failures(&self) {
        self.state.lock().failing_deletes.clear();
    }

    pub fn fail_next_snapshot(&self, error: StoreError) {
        self.state.lock().next_snapshot_error = Some(error);
    }

    pub fn fail_next_listen(&self, error: StoreError) {
        self.state.lock().next_listen_error = Some(error);
    }

    /// End every live subscription, as a dropped connection would
    pub fn close_streams(&self) {
        self.state.lock().subscribers.clear();
    }

    pub fn snapshot_calls(&self) -> usize {
        self.state.lock().snapshot_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.state.lock().delete_calls
    }

    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .subscribers
            .get(collection)
            .map(|s| s.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    pub fn documents(&self, collection: &str) -> Vec<RemoteDocument> {
        self.state
            .lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn snapshot(&self, collection: &str) -> Result<Vec<RemoteDocument>, StoreError> {
        let mut state = self.state.lock();
        state.snapshot_calls += 1;
        if let Some(error) = state.next_snapshot_error.take() {
            return Err(error);
        }
        Ok(state.collections.get(collection).cloned().unwrap_or_default())
    }

    async fn listen(&self, collection: &str) -> Result<Subscription, StoreError> {
        let mut state = self.state.lock();
        if let Some(error) = state.next_listen_error.take() {
            return Err(error);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let initial = ChangeBatch {
            changes: state
                .collections
                .get(collection)
                .map(|docs| docs.iter().cloned().map(DocumentChange::added).collect())
                .unwrap_or_default(),
        };
        // Sent under the lock so no later write can overtake it
        let _ = tx.send(initial);
        state
            .subscribers
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        Ok(Subscription::new(rx))
    }

    async fn delete(&self, collection: &str, document_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.delete_calls += 1;
        if state.failing_deletes.contains(document_id) {
            return Err(StoreError::Unavailable(format!(
                "delete of {document_id} failed"
            )));
        }

        let removed = state.collections.get_mut(collection).and_then(|docs| {
            let index = docs.iter().position(|d| d.id == document_id)?;
            Some(docs.remove(index))
        });
        // Deleting a missing document succeeds, as in the hosted store
        if let Some(document) = removed {
            state.publish(
                collection,
                DocumentChange {
                    kind: ChangeKind::Removed,
                    document,
                },
            );
        }
        Ok(())
    }
}

/// Connector handing out a shared [`MemoryDocumentStore`]
#[derive(Debug, Clone)]
pub struct MemoryStoreConnector {
    store: MemoryDocumentStore,
    reject_with: Arc<Mutex<Option<StoreError>>>,
    connects: Arc<Mutex<Vec<String>>>,
}

impl MemoryStoreConnector {
    pub fn new(store: MemoryDocumentStore) -> Self {
        Self {
            store,
            reject_with: Arc::new(Mutex::new(None)),
            connects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Refuse every following connect with `error`
    pub fn reject_with(&self, error: StoreError) {
        *self.reject_with.lock() = Some(error);
    }

    pub fn accept(&self) {
        *self.reject_with.lock() = None;
    }

    /// Project ids of successful connects
    pub fn connected_projects(&self) -> Vec<String> {
        self.connects.lock().clone()
    }

    pub fn store(&self) -> &MemoryDocumentStore {
        &self.store
    }
}

#[async_trait]
impl StoreConnector for MemoryStoreConnector {
    async fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn DocumentStore>, StoreError> {
        if let Some(error) = self.reject_with.lock().clone() {
            return Err(error);
        }
        if settings.project_id.trim().is_empty() {
            return Err(StoreError::NotFound("project id is empty".to_string()));
        }
        self.connects.lock().push(settings.project_id.clone());
        Ok(Arc::new(self.store.clone()))
    }
}
