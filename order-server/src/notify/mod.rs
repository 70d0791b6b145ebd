//! Notifications
//!
//! Typed outbox records with a delivery worker, plus the realtime
//! location-room publisher.

pub mod outbox;
pub mod realtime;

pub use outbox::{Notifier, OutboxWorker};
pub use realtime::RealtimeNotifier;
