//! Carts
//!
//! A user's pending selections and their priced view.

pub mod service;

pub use service::{CartError, CartExtraView, CartService, CartView};
