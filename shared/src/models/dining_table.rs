//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Table status (桌台状态)
///
/// `Occupied` and `Available` follow the open orders seated at the table.
/// `Reserved` and `Cleaning` are only ever set explicitly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
    Cleaning,
}

impl TableStatus {
    /// Status set by an operator, never derived from orders
    pub fn is_manual(&self) -> bool {
        matches!(self, TableStatus::Reserved | TableStatus::Cleaning)
    }
}

/// Customer details attached to a take-away table created for a web order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WebCustomer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// Pickup time as sent by the ordering app (free text)
    pub pickup_time: Option<String>,
}

impl WebCustomer {
    /// "First Last", or whichever part is present
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.pickup_time.is_none()
    }
}

/// Dining table entity (桌台)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiningTable {
    pub id: i64,
    pub name: String,
    pub capacity: i32,
    pub status: TableStatus,
    /// Free-text area or category ("Window", "Take Away (App)")
    pub location: String,
    /// Present only on take-away tables created for web orders
    pub web_customer: Option<WebCustomer>,
    pub is_bill_printed: bool,
}

impl DiningTable {
    pub fn is_takeaway(&self) -> bool {
        self.web_customer.is_some()
    }
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableCreate {
    pub name: String,
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub web_customer: Option<WebCustomer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_present_parts() {
        let customer = WebCustomer {
            first_name: Some("Ana".to_string()),
            last_name: None,
            ..Default::default()
        };
        assert_eq!(customer.display_name().as_deref(), Some("Ana"));

        let customer = WebCustomer {
            first_name: Some("Ana".to_string()),
            last_name: Some("Ruiz".to_string()),
            ..Default::default()
        };
        assert_eq!(customer.display_name().as_deref(), Some("Ana Ruiz"));
        assert!(WebCustomer::default().display_name().is_none());
    }

    #[test]
    fn manual_statuses() {
        assert!(TableStatus::Reserved.is_manual());
        assert!(TableStatus::Cleaning.is_manual());
        assert!(!TableStatus::Occupied.is_manual());
        assert!(!TableStatus::Available.is_manual());
    }
}
