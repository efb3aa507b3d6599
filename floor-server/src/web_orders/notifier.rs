//! New order alert
//!
//! Fired after a web order is committed. Alerts are best-effort: a failing
//! notifier is logged by the pipeline and never blocks ingestion.

use async_trait::async_trait;
use shared::models::Order;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("alert output failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("alert rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify(&self, order: &Order) -> Result<(), NotifyError>;
}

/// Does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

#[async_trait]
impl OrderNotifier for SilentNotifier {
    async fn notify(&self, _order: &Order) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Rings the terminal bell (BEL) on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

#[async_trait]
impl OrderNotifier for TerminalBell {
    async fn notify(&self, order: &Order) -> Result<(), NotifyError> {
        let mut out = tokio::io::stdout();
        out.write_all(b"\x07").await?;
        out.flush().await?;
        tracing::debug!(order_id = order.id, "Bell rung");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderStatus;

    fn order() -> Order {
        Order {
            id: 1,
            table_id: 1,
            created_at: 0,
            status: OrderStatus::Pending,
            notes: String::new(),
            items: Vec::new(),
            remote_id: Some("doc".to_string()),
        }
    }

    #[tokio::test]
    async fn bell_and_silent_notifiers_succeed() {
        TerminalBell.notify(&order()).await.unwrap();
        SilentNotifier.notify(&order()).await.unwrap();
    }
}
