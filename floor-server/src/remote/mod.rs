//! Remote document store abstraction
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │          WebOrderService             │
//! └──────────────────┬───────────────────┘
//!                    │
//!          ┌─────────┴──────────┐
//!          │ StoreConnector     │  ◄── 可插拔
//!          │   └─ DocumentStore │
//!          └─────────┬──────────┘
//!                    │
//!          ┌─────────┴──────────┐
//!          ▼                    ▼
//!   (hosted store client)  MemoryDocumentStore
//!                           (同进程 / 测试)
//! ```
//!
//! Documents are loosely typed: a string id plus a JSON field map. Turning
//! them into domain types is the job of [`crate::web_orders::document`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

pub mod credentials;
pub mod memory;

pub use credentials::{Credentials, load_credentials};
pub use memory::{MemoryDocumentStore, MemoryStoreConnector};

/// One document of a remote collection
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build from a JSON value; anything but an object yields no fields
    pub fn from_json(id: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, fields)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub document: RemoteDocument,
}

impl DocumentChange {
    pub fn added(document: RemoteDocument) -> Self {
        Self {
            kind: ChangeKind::Added,
            document,
        }
    }
}

/// Changes delivered together by one push from the store
///
/// The first batch after subscribing holds every pre-existing document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeBatch {
    pub changes: Vec<DocumentChange>,
}

impl ChangeBatch {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Live change stream of one collection
///
/// Dropping it ends the subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ChangeBatch>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<ChangeBatch>) -> Self {
        Self { rx }
    }

    /// Next batch, `None` once the store closed the stream
    pub async fn next_batch(&mut self) -> Option<ChangeBatch> {
        self.rx.recv().await
    }
}

/// Remote store client errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("authentication rejected: {0}")]
    Unauthenticated(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("connection closed")]
    Closed,
}

impl StoreError {
    /// Caused by startup input (credentials, project, collection) rather
    /// than by a single failed call
    pub fn is_configuration(&self) -> bool {
        matches!(self, StoreError::Unauthenticated(_) | StoreError::NotFound(_))
    }
}

/// Connected handle to a remote document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document currently in `collection`
    async fn snapshot(&self, collection: &str) -> Result<Vec<RemoteDocument>, StoreError>;

    /// Subscribe to changes; the first batch is the current content
    async fn listen(&self, collection: &str) -> Result<Subscription, StoreError>;

    async fn delete(&self, collection: &str, document_id: &str) -> Result<(), StoreError>;
}

/// Connection parameters
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub project_id: String,
    pub database_id: String,
    pub credentials: Credentials,
}

/// Opens [`DocumentStore`] connections
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn DocumentStore>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_object_json_has_no_fields() {
        let doc = RemoteDocument::from_json("a", json!([1, 2]));
        assert!(doc.fields.is_empty());

        let doc = RemoteDocument::from_json("b", json!({"phoneNumber": "555"}));
        assert_eq!(doc.field("phoneNumber"), Some(&json!("555")));
    }

    #[test]
    fn configuration_errors() {
        assert!(StoreError::Unauthenticated("x".into()).is_configuration());
        assert!(StoreError::NotFound("db".into()).is_configuration());
        assert!(!StoreError::Unavailable("x".into()).is_configuration());
        assert!(!StoreError::Closed.is_configuration());
    }
}
