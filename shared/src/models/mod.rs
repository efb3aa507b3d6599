//! Data models
//!
//! Floor entities owned by the floor service. All IDs are `i64` and are
//! assigned by the service on creation; `*Create` payloads carry no id.

pub mod dining_table;
pub mod dish;
pub mod order;
pub mod payment;
pub mod reservation;

// Re-exports
pub use dining_table::*;
pub use dish::*;
pub use order::*;
pub use payment::*;
pub use reservation::*;
