//! Shared types for the floor workspace
//!
//! Domain entities (tables, orders, dishes, reservations, payments), the
//! observable collection they are kept in, money rounding and small time
//! utilities.

pub mod models;
pub mod money;
pub mod observable;
pub mod util;

// Re-exports
pub use observable::{CollectionChange, ObservableVec, ObserverId};
pub use serde::{Deserialize, Serialize};
