//! Change listener
//!
//! Turns the raw change stream into a stream of genuinely new documents.
//! The first batch after subscribing replays what already exists and is
//! thrown away whole, whatever its size. After that only `Added` changes
//! pass; edits and removals made elsewhere are not mirrored locally.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::remote::{ChangeBatch, ChangeKind, RemoteDocument, Subscription};

#[derive(Debug, Default)]
pub struct ChangeListener {
    batches_seen: u64,
    replayed: usize,
    forwarded: u64,
}

impl ChangeListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents of `batch` that should be ingested
    pub fn classify(&mut self, batch: ChangeBatch) -> Vec<RemoteDocument> {
        self.batches_seen += 1;
        if self.batches_seen == 1 {
            self.replayed = batch.len();
            tracing::info!(existing = batch.len(), "Initial snapshot received, not ingested");
            return Vec::new();
        }

        let mut fresh = Vec::new();
        for change in batch.changes {
            match change.kind {
                ChangeKind::Added => fresh.push(change.document),
                kind => {
                    tracing::debug!(doc_id = %change.document.id, ?kind, "Ignoring change")
                }
            }
        }
        self.forwarded += fresh.len() as u64;
        fresh
    }

    /// Whether the initial snapshot has been consumed
    pub fn is_primed(&self) -> bool {
        self.batches_seen > 0
    }

    /// Size of the discarded initial snapshot
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Forward new documents to `tx` until cancelled, the stream ends, or
    /// the receiving side goes away
    pub async fn run(
        mut self,
        mut subscription: Subscription,
        tx: mpsc::Sender<RemoteDocument>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Change listener started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(forwarded = self.forwarded, "Change listener stopping");
                    break;
                }
                batch = subscription.next_batch() => {
                    let Some(batch) = batch else {
                        tracing::warn!("Remote change stream closed");
                        break;
                    };
                    for document in self.classify(batch) {
                        tracing::info!(doc_id = %document.id, "New web order document");
                        if tx.send(document).await.is_err() {
                            tracing::warn!("Ingestion queue closed, listener exiting");
                            return;
                        }
                    }
                }
            }
        }
    }
}
