//! Order Server - food-ordering backend
//!
//! # Architecture overview
//!
//! - **Pricing** (`pricing`): pure price computation (combo bases,
//!   first-N-free addons, coupons, tax)
//! - **Carts** (`carts`): per-user pending selections
//! - **Checkout** (`checkout`): assembles Pending orders from carts or
//!   inline meal lists
//! - **Payments** (`payments`): wallet / hosted card / PayPal adapters
//!   normalized into lifecycle events
//! - **Orders** (`orders`): the status state machine and the idle sweep
//! - **Loyalty** (`loyalty`): points/balance ledger
//! - **Notifications** (`notify`): outbox + realtime location alerts
//!
//! # Module structure
//!
//! ```text
//! order-server/src/
//! ├── core/          # config, state, server, background tasks
//! ├── auth/          # identity extraction, capability checks
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # models and repositories (embedded SurrealDB)
//! ├── pricing/       # pure pricing engine
//! ├── carts/         # cart aggregator
//! ├── coupons/       # coupon validation and usage tracking
//! ├── checkout/      # order assembly
//! ├── payments/      # provider adapters and webhooks
//! ├── orders/        # lifecycle state machine, idle sweep
//! ├── loyalty/       # wallet/points ledger
//! ├── notify/        # outbox worker, realtime publisher
//! ├── invoice/       # collaborator seams (renderer, blobs, mail)
//! └── utils/         # errors, logging, keyed locks
//! ```

pub mod api;
pub mod auth;
pub mod carts;
pub mod checkout;
pub mod core;
pub mod coupons;
pub mod db;
pub mod invoice;
pub mod loyalty;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod utils;

// Re-export public types
pub use crate::core::{Config, Server, ServerState};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load environment and initialize logging.
pub fn setup_environment() {
    let _ = dotenv::dotenv();
    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
}
