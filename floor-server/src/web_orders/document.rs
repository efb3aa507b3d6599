//! Web order document parsing
//!
//! Remote documents are loosely typed. Field access goes through `Option`
//! returning accessors; a bad optional field is treated as absent, a bad
//! item is skipped, and only a document with no usable item is rejected.
//!
//! Document shape:
//!
//! ```json
//! {
//!   "createdAt": "2024-05-01T18:30:00Z",
//!   "firstName": "Ana", "lastName": "Ruiz",
//!   "phoneNumber": "555-0100", "pickupTime": "19:00",
//!   "items": [{ "name": "Soup", "quantity": 2, "price": 5.00 }]
//! }
//! ```

use chrono::DateTime;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::models::{
    ADHOC_DISH_ID, Order, OrderItem, OrderStatus, UNASSIGNED_TABLE_ID, WebCustomer,
};
use shared::money::{MAX_QUANTITY, parse_price};
use shared::util::now_millis;
use thiserror::Error;

use crate::remote::RemoteDocument;

pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_FIRST_NAME: &str = "firstName";
pub const FIELD_LAST_NAME: &str = "lastName";
pub const FIELD_PHONE: &str = "phoneNumber";
pub const FIELD_PICKUP_TIME: &str = "pickupTime";
pub const FIELD_ITEMS: &str = "items";

/// Notes prefix of every order coming from the ordering app
pub const APP_ORDER_NOTE: &str = "App Order";

/// Document that cannot become an order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("document has no valid items")]
    NoValidItems,
}

/// One usable line of a web order
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// A web order document in domain terms, not yet committed
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWebOrder {
    pub remote_id: String,
    /// Unix millis; the parse time when the document carries none
    pub created_at: i64,
    pub customer: WebCustomer,
    pub items: Vec<ParsedItem>,
    /// Items dropped because a field was missing or invalid
    pub skipped_items: usize,
}

impl ParsedWebOrder {
    /// "App Order", plus " - {phone}" when a phone number is known
    pub fn notes(&self) -> String {
        match self.customer.phone.as_deref() {
            Some(phone) => format!("{APP_ORDER_NOTE} - {phone}"),
            None => APP_ORDER_NOTE.to_string(),
        }
    }

    /// Order items, linking names to catalog ids through `lookup`
    pub fn order_items(&self, lookup: impl Fn(&str) -> Option<i64>) -> Vec<OrderItem> {
        self.items
            .iter()
            .map(|item| {
                let dish_id = lookup(&item.name).unwrap_or(ADHOC_DISH_ID);
                OrderItem::new(dish_id, item.name.clone(), item.unit_price, item.quantity)
            })
            .collect()
    }

    /// Detached order for the history view: no local id, no table, no
    /// catalog links
    pub fn into_history_order(self) -> Order {
        let notes = self.notes();
        let items = self.order_items(|_| None);
        Order {
            id: 0,
            table_id: UNASSIGNED_TABLE_ID,
            created_at: self.created_at,
            status: OrderStatus::Pending,
            notes,
            items,
            remote_id: Some(self.remote_id),
        }
    }
}

/// Parse a remote order document
pub fn parse_web_order(doc: &RemoteDocument) -> Result<ParsedWebOrder, DocumentError> {
    let raw_items = match doc.field(FIELD_ITEMS) {
        None | Some(Value::Null) => return Err(DocumentError::MissingField(FIELD_ITEMS)),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(DocumentError::WrongType {
                field: FIELD_ITEMS,
                expected: "an array",
            });
        }
    };

    let mut items = Vec::with_capacity(raw_items.len());
    let mut skipped_items = 0;
    for (index, raw) in raw_items.iter().enumerate() {
        match parse_item(raw) {
            Some(item) => items.push(item),
            None => {
                skipped_items += 1;
                tracing::debug!(doc_id = %doc.id, index, "Skipping invalid item");
            }
        }
    }
    if items.is_empty() {
        return Err(DocumentError::NoValidItems);
    }

    let created_at = doc
        .field(FIELD_CREATED_AT)
        .and_then(get_timestamp)
        .unwrap_or_else(|| {
            tracing::debug!(doc_id = %doc.id, "No usable createdAt, using local time");
            now_millis()
        });

    Ok(ParsedWebOrder {
        remote_id: doc.id.clone(),
        created_at,
        customer: WebCustomer {
            first_name: doc.field(FIELD_FIRST_NAME).and_then(get_string),
            last_name: doc.field(FIELD_LAST_NAME).and_then(get_string),
            phone: doc.field(FIELD_PHONE).and_then(get_string),
            pickup_time: doc.field(FIELD_PICKUP_TIME).and_then(get_string),
        },
        items,
        skipped_items,
    })
}

fn parse_item(raw: &Value) -> Option<ParsedItem> {
    let item = raw.as_object()?;
    let name = item.get("name").and_then(get_string)?;
    let quantity = item.get("quantity").and_then(get_quantity)?;
    let unit_price = item.get("price").and_then(get_price)?;
    Some(ParsedItem {
        name,
        quantity,
        unit_price,
    })
}

// ========== Typed accessors ==========

/// Non-empty trimmed text; numbers are accepted (phone numbers often are)
pub fn get_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Unix millis from an RFC 3339 string, a millis number, or a
/// `{seconds, nanos}` timestamp object
pub fn get_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.timestamp_millis()),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanos")
                .or_else(|| map.get("nanoseconds"))
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            seconds
                .checked_mul(1000)
                .and_then(|ms| ms.checked_add(nanos / 1_000_000))
        }
        _ => None,
    }
}

/// Positive quantity from a number or numeric string, rounded
pub fn get_quantity(value: &Value) -> Option<i32> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    let rounded = raw.round();
    if rounded < 1.0 || rounded > f64::from(MAX_QUANTITY) {
        return None;
    }
    Some(rounded as i32)
}

/// Non-negative price from a number or numeric string
pub fn get_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_price(&n.to_string()),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}
