//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Dish id used for items that do not reference the dish catalog
pub const ADHOC_DISH_ID: i64 = 0;

/// Table id used for orders shown outside the floor plan (remote history)
pub const UNASSIGNED_TABLE_ID: i64 = 0;

/// Order status
///
/// ```text
/// Pending → InProgress → Ready → Served → Paid
///    └──────────┴──────────┴───────┴────→ Cancelled
/// ```
///
/// Paid and Cancelled are terminal. Explicit status updates are not
/// checked against this graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    Ready,
    Served,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Keeps its table occupied
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

/// Order item (菜品行)
///
/// Name and unit price are captured when the item is ordered; later catalog
/// price changes do not affect existing orders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Catalog dish reference, [`ADHOC_DISH_ID`] for ad-hoc items
    pub dish_id: i64,
    pub dish_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: i32,
    pub special_instructions: Option<String>,
}

impl OrderItem {
    pub fn new(dish_id: i64, dish_name: impl Into<String>, unit_price: Decimal, quantity: i32) -> Self {
        Self {
            dish_id,
            dish_name: dish_name.into(),
            unit_price,
            quantity,
            special_instructions: None,
        }
    }

    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub table_id: i64,
    /// Creation time (Unix millis)
    pub created_at: i64,
    pub status: OrderStatus,
    pub notes: String,
    pub items: Vec<OrderItem>,
    /// Id of the remote document this order was ingested from
    pub remote_id: Option<String>,
}

impl Order {
    /// Sum of item subtotals, never stored
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Ingested from the remote order collection
    pub fn is_web_order(&self) -> bool {
        self.remote_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order #{} - Table {} - {:?} - {:.2}",
            self.id,
            self.table_id,
            self.status,
            self.total_amount()
        )
    }
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderCreate {
    pub table_id: i64,
    /// Creation time (Unix millis), defaults to now
    pub created_at: Option<i64>,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub remote_id: Option<String>,
}
