//! 桌台与订单 - floor state owned by the owner thread
//!
//! - [`FloorService`] - canonical tables, orders, dishes, reservations, payments
//! - [`Bill`] - checkout bill for a table
//! - [`TakeAwayDraft`] - counter-side take-away cart

pub mod billing;
pub mod service;
pub mod takeaway;

pub use billing::{Bill, BillLine, TAX_RATE};
pub use service::{
    COUNTER_TAKEAWAY_LOCATION, COUNTER_TAKEAWAY_NAME_PREFIX, FloorService, TAKEAWAY_LOCATION,
    TAKEAWAY_NAME_PREFIX, TakeawayOrderCreate, TakeawaySource,
};
pub use takeaway::{DraftLine, TakeAwayDraft};
