//! Ingestion pipeline
//!
//! ```text
//! RemoteDocument ─► parse ─► owner thread: dedup + take-away table + order
//!                                  │
//!                                  ▼ committed
//!                  notify ─► new-order event ─► history cache
//! ```
//!
//! The dedup check and the commit run inside one owner-thread job, so two
//! deliveries of the same document can never both pass the check.

use std::sync::Arc;

use shared::models::Order;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::cache::OrderHistoryCache;
use super::document::{DocumentError, parse_web_order};
use super::notifier::OrderNotifier;
use crate::core::OwnerDispatcher;
use crate::floor::{FloorService, TakeawayOrderCreate, TakeawaySource};
use crate::remote::RemoteDocument;
use crate::utils::AppResult;

/// What happened to one document
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Committed(Order),
    /// An order for this remote document already exists
    Duplicate,
    /// Unusable document; nothing was created
    Dropped(DocumentError),
}

impl IngestOutcome {
    pub fn into_order(self) -> Option<Order> {
        match self {
            IngestOutcome::Committed(order) => Some(order),
            _ => None,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, IngestOutcome::Committed(_))
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    floor: OwnerDispatcher<FloorService>,
    cache: Arc<OrderHistoryCache>,
    notifier: Arc<dyn OrderNotifier>,
    events: broadcast::Sender<Order>,
    takeaway_capacity: i32,
}

impl IngestionPipeline {
    pub fn new(
        floor: OwnerDispatcher<FloorService>,
        cache: Arc<OrderHistoryCache>,
        notifier: Arc<dyn OrderNotifier>,
        events: broadcast::Sender<Order>,
        takeaway_capacity: i32,
    ) -> Self {
        Self {
            floor,
            cache,
            notifier,
            events,
            takeaway_capacity,
        }
    }

    /// Ingest one document, returning the committed order if one was created
    pub async fn ingest(&self, document: RemoteDocument) -> AppResult<Option<Order>> {
        Ok(self.process(document).await?.into_order())
    }

    /// Ingest one document and report what happened to it
    ///
    /// Only a stopped owner thread is an error; malformed and duplicate
    /// documents are outcomes.
    pub async fn process(&self, document: RemoteDocument) -> AppResult<IngestOutcome> {
        let parsed = match parse_web_order(&document) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(doc_id = %document.id, error = %e, "Web order dropped");
                return Ok(IngestOutcome::Dropped(e));
            }
        };
        if parsed.skipped_items > 0 {
            tracing::warn!(
                doc_id = %parsed.remote_id,
                skipped = parsed.skipped_items,
                kept = parsed.items.len(),
                "Some items of web order were invalid"
            );
        }

        let doc_id = parsed.remote_id.clone();
        let capacity = self.takeaway_capacity;
        let committed = self
            .floor
            .call(move |floor| {
                let notes = parsed.notes();
                let items =
                    parsed.order_items(|name| floor.find_dish_by_name(name).map(|dish| dish.id));
                floor.add_takeaway_order(TakeawayOrderCreate {
                    source: TakeawaySource::App,
                    customer: parsed.customer,
                    capacity,
                    created_at: Some(parsed.created_at),
                    notes,
                    items,
                    remote_id: Some(parsed.remote_id),
                })
            })
            .await?;

        let Some(order) = committed else {
            tracing::info!(doc_id = %doc_id, "Web order already ingested");
            return Ok(IngestOutcome::Duplicate);
        };

        tracing::info!(
            doc_id = %doc_id,
            order_id = order.id,
            table_id = order.table_id,
            total = %order.total_amount(),
            "Web order committed"
        );
        self.after_commit(&order).await;
        Ok(IngestOutcome::Committed(order))
    }

    async fn after_commit(&self, order: &Order) {
        if let Err(e) = self.notifier.notify(order).await {
            tracing::warn!(order_id = order.id, error = %e, "New order alert failed");
        }
        // No subscriber is fine
        let receivers = self.events.send(order.clone()).unwrap_or(0);
        tracing::debug!(order_id = order.id, receivers, "New order event sent");
        self.cache.record_new(order);
    }

    /// Ingest documents from `rx` one at a time until cancelled or the
    /// listener side closes
    pub async fn run(self, mut rx: mpsc::Receiver<RemoteDocument>, shutdown: CancellationToken) {
        tracing::info!("Ingestion worker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Ingestion worker stopping");
                    break;
                }
                document = rx.recv() => {
                    let Some(document) = document else {
                        tracing::info!("Document queue closed, ingestion worker exiting");
                        break;
                    };
                    if let Err(e) = self.process(document).await {
                        tracing::error!(error = %e, "Web order ingestion failed");
                        if self.floor.is_closed() {
                            break;
                        }
                    }
                }
            }
        }
    }
}
