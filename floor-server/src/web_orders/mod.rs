//! Web order synchronization
//!
//! Remote order documents flow from the change listener through the
//! ingestion pipeline into the floor service. The history cache and the
//! deletion coordinator serve the order history view.

pub mod cache;
pub mod deletion;
pub mod document;
pub mod ingestion;
pub mod listener;
pub mod notifier;
pub mod service;

pub use cache::{OrderHistory, OrderHistoryCache};
pub use deletion::DeletionCoordinator;
pub use document::{DocumentError, ParsedItem, ParsedWebOrder, parse_web_order};
pub use ingestion::{IngestOutcome, IngestionPipeline};
pub use listener::ChangeListener;
pub use notifier::{NotifyError, OrderNotifier, SilentNotifier, TerminalBell};
pub use service::WebOrderService;
