//! Bulk delete of remote order documents
//!
//! Deletes are issued concurrently and are not transactional: documents
//! deleted before a failure stay deleted. The history cache is invalidated
//! as soon as anything was actually removed.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;

use super::cache::OrderHistoryCache;
use crate::remote::DocumentStore;
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct DeletionCoordinator {
    store: Arc<dyn DocumentStore>,
    collection: String,
    cache: Arc<OrderHistoryCache>,
}

impl DeletionCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        cache: Arc<OrderHistoryCache>,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            cache,
        }
    }

    /// Delete every document in `ids`
    ///
    /// Fails with a validation error for an empty set and with
    /// [`AppError::PartialDelete`] naming the ids that could not be deleted.
    pub async fn delete<I, S>(&self, ids: I) -> AppResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: BTreeSet<String> = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(AppError::validation("no document ids to delete"));
        }

        let attempted = ids.len();
        let results = join_all(ids.iter().map(|id| async move {
            let result = self.store.delete(&self.collection, id).await;
            (id, result)
        }))
        .await;

        let mut failed = Vec::new();
        for (id, result) in results {
            if let Err(e) = result {
                tracing::warn!(doc_id = %id, error = %e, "Remote delete failed");
                failed.push(id.clone());
            }
        }

        if failed.len() < attempted {
            self.cache.invalidate();
        }
        if failed.is_empty() {
            tracing::info!(count = attempted, "Remote orders deleted");
            Ok(())
        } else {
            Err(AppError::PartialDelete { attempted, failed })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryDocumentStore;
    use serde_json::json;

    const ORDERS: &str = "orders";

    async fn populated(count: usize) -> (MemoryDocumentStore, Arc<OrderHistoryCache>, DeletionCoordinator) {
        let store = MemoryDocumentStore::new();
        for i in 1..=count {
            store.insert_with_id(
                ORDERS,
                &format!("id{i}"),
                json!({"createdAt": i, "items": [{"name": "Soup", "quantity": 1, "price": 5}]}),
            );
        }
        let remote: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let cache = Arc::new(OrderHistoryCache::new(Arc::clone(&remote), ORDERS));
        cache.get_all().await.unwrap();
        let coordinator = DeletionCoordinator::new(remote, ORDERS, Arc::clone(&cache));
        (store, cache, coordinator)
    }

    #[tokio::test]
    async fn empty_set_is_rejected() {
        let (store, cache, coordinator) = populated(1).await;
        let err = coordinator.delete(Vec::<String>::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(cache.is_populated());
        assert_eq!(store.delete_calls(), 0);
    }

    #[tokio::test]
    async fn success_invalidates_and_refetch_drops_deleted() {
        let (_store, cache, coordinator) = populated(5).await;

        coordinator.delete(["id3"]).await.unwrap();
        assert!(!cache.is_populated());

        let history = cache.get_all().await.unwrap();
        assert_eq!(history.len(), 4);
        assert!(!history.contains_remote("id3"));
    }

    #[tokio::test]
    async fn partial_failure_names_failed_ids_and_still_invalidates() {
        let (store, cache, coordinator) = populated(3).await;
        store.fail_delete_of("id2");

        let err = coordinator.delete(["id1", "id2", "id3"]).await.unwrap_err();
        match err {
            AppError::PartialDelete { attempted, failed } => {
                assert_eq!(attempted, 3);
                assert_eq!(failed, vec!["id2".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!cache.is_populated());
        assert_eq!(store.documents(ORDERS).len(), 1);
    }

    #[tokio::test]
    async fn total_failure_keeps_cache() {
        let (store, cache, coordinator) = populated(2).await;
        store.fail_delete_of("id1");

        assert!(coordinator.delete(["id1"]).await.is_err());
        assert!(cache.is_populated());
    }

    #[tokio::test]
    async fn duplicate_ids_are_deleted_once() {
        let (store, _cache, coordinator) = populated(2).await;
        coordinator.delete(["id1", "id1", " id1 "]).await.unwrap();
        assert_eq!(store.delete_calls(), 1);
    }
}
