//! Reservation Model

use serde::{Deserialize, Serialize};

/// Reservation entity (预订)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: i64,
    pub table_id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    /// Reserved time (Unix millis)
    pub reservation_time: i64,
    pub number_of_guests: i32,
    pub special_requests: String,
    pub is_confirmed: bool,
}

/// Create reservation payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReservationCreate {
    pub table_id: i64,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub reservation_time: i64,
    pub number_of_guests: i32,
    pub special_requests: Option<String>,
}
