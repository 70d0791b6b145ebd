//! Utility modules

pub mod error;
pub mod locks;
pub mod logger;

pub use error::{AppError, AppResult, ok, ok_with_message};
pub use locks::KeyedMutex;
