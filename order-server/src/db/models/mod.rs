//! Database models
//!
//! Every row carries a string business id (`shared::util::next_id`) and is
//! queried by it; storage-engine record ids never leave the repository layer.

pub mod addon;
pub mod cart;
pub mod coupon;
pub mod location;
pub mod meal;
pub mod notification;
pub mod order;
pub mod wallet;

pub use addon::AddonOption;
pub use cart::{Cart, CartExtra};
pub use coupon::Coupon;
pub use location::Location;
pub use meal::Meal;
pub use notification::{NotificationKind, OutboxRecord, OutboxStatus};
pub use order::OrderRecord;
pub use wallet::{TransactionKind, Wallet, WalletTransaction};
