//! Shared types for the food-ordering backend
//!
//! Common types used by the order server and its clients: order and cart
//! snapshot types, status enums, the unified API response envelope, and
//! id/time utilities.

pub mod order;
pub mod response;
pub mod util;

// Re-exports
pub use order::{
    AddonKind, DeliveryInfo, MealSelection, OrderStatus, PaymentMethod, PaymentStatus,
    PricedAddon, PricedLineItem,
};
pub use response::ApiResponse;
