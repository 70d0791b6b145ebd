//! Coupons
//!
//! Checkout-time validation plus usage tracking. Administrative CRUD lives
//! in the API layer over the coupon repository.

pub mod validator;

pub use validator::{CouponError, CouponValidator};
