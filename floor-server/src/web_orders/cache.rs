//! Order history cache
//!
//! Holds every remote order, fetched on first use and kept until
//! invalidated. All callers between two invalidations share one
//! [`OrderHistory`]; newly ingested orders are prepended to it in place.
//!
//! ```text
//!  empty ──get_all──► fetching ──ok──► populated ──invalidate──► empty
//!                        │                 ▲
//!                        └─ record_new ────┘ (merged after the fetch)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use shared::models::Order;

use super::document::parse_web_order;
use crate::remote::DocumentStore;
use crate::utils::AppResult;

/// Shared, most-recent-first list of remote orders
#[derive(Debug, Clone, Default)]
pub struct OrderHistory {
    inner: Arc<RwLock<Vec<Order>>>,
}

impl OrderHistory {
    fn new(orders: Vec<Order>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(orders)),
        }
    }

    /// Borrow the list; keep the guard short-lived
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<Order>> {
        self.inner.read()
    }

    /// Owned copy of the current content
    pub fn to_vec(&self) -> Vec<Order> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn contains_remote(&self, remote_id: &str) -> bool {
        self.inner
            .read()
            .iter()
            .any(|o| o.remote_id.as_deref() == Some(remote_id))
    }

    /// Same underlying list
    pub fn ptr_eq(&self, other: &OrderHistory) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Prepend unless an order with the same remote id is present
    fn prepend(&self, order: &Order) -> bool {
        let mut orders = self.inner.write();
        let duplicate = order.remote_id.as_deref().is_some_and(|id| {
            orders.iter().any(|o| o.remote_id.as_deref() == Some(id))
        });
        if duplicate {
            return false;
        }
        orders.insert(0, order.clone());
        true
    }
}

#[derive(Default)]
struct CacheState {
    history: Option<OrderHistory>,
    generation: u64,
    fetching: bool,
    /// Orders ingested while a fetch is in flight
    arrivals: Vec<Order>,
}

pub struct OrderHistoryCache {
    store: Arc<dyn DocumentStore>,
    collection: String,
    state: Mutex<CacheState>,
    /// Serializes fetches so concurrent first calls fetch once
    fill_lock: tokio::sync::Mutex<()>,
    fetches: AtomicUsize,
}

impl std::fmt::Debug for OrderHistoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderHistoryCache")
            .field("collection", &self.collection)
            .field("populated", &self.is_populated())
            .field("fetches", &self.fetch_count())
            .finish()
    }
}

impl OrderHistoryCache {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            state: Mutex::new(CacheState::default()),
            fill_lock: tokio::sync::Mutex::new(()),
            fetches: AtomicUsize::new(0),
        }
    }

    fn cached(&self) -> Option<OrderHistory> {
        self.state.lock().history.clone()
    }

    /// All remote orders, most recent first
    ///
    /// Fetches on the first call after construction or invalidation. A fetch
    /// error leaves the cache empty and is returned to the caller.
    pub async fn get_all(&self) -> AppResult<OrderHistory> {
        if let Some(history) = self.cached() {
            return Ok(history);
        }

        let _fill = self.fill_lock.lock().await;
        if let Some(history) = self.cached() {
            return Ok(history);
        }

        let generation = {
            let mut state = self.state.lock();
            state.fetching = true;
            state.arrivals.clear();
            state.generation
        };
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let documents = match self.store.snapshot(&self.collection).await {
            Ok(documents) => documents,
            Err(e) => {
                let mut state = self.state.lock();
                state.fetching = false;
                state.arrivals.clear();
                tracing::warn!(collection = %self.collection, error = %e, "Order history fetch failed");
                return Err(e.into());
            }
        };

        let total = documents.len();
        let mut orders: Vec<Order> = documents
            .iter()
            .filter_map(|doc| match parse_web_order(doc) {
                Ok(parsed) => Some(parsed.into_history_order()),
                Err(e) => {
                    tracing::warn!(doc_id = %doc.id, error = %e, "Skipping unreadable order document");
                    None
                }
            })
            .collect();

        let mut state = self.state.lock();
        state.fetching = false;
        for order in std::mem::take(&mut state.arrivals) {
            let known = order.remote_id.is_some()
                && orders.iter().any(|o| o.remote_id == order.remote_id);
            if !known {
                orders.push(order);
            }
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::info!(documents = total, orders = orders.len(), "Order history fetched");

        let history = OrderHistory::new(orders);
        if state.generation == generation {
            state.history = Some(history.clone());
        } else {
            tracing::debug!("Cache invalidated during fetch, result not kept");
        }
        Ok(history)
    }

    /// Drop the cached list; the next [`get_all`](Self::get_all) fetches
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.history = None;
        state.generation += 1;
        tracing::debug!(generation = state.generation, "Order history invalidated");
    }

    /// Prepend a newly ingested order when the cache is populated
    ///
    /// Returns whether the order was added to a populated cache.
    pub fn record_new(&self, order: &Order) -> bool {
        let mut state = self.state.lock();
        if state.fetching {
            state.arrivals.push(order.clone());
        }
        match &state.history {
            Some(history) => history.prepend(order),
            None => false,
        }
    }

    pub fn is_populated(&self) -> bool {
        self.state.lock().history.is_some()
    }

    /// Number of remote fetches made so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}
