//! Notification Module
//!
//! Tells external consumers which batches changed. Delivery is
//! fire-and-forget: nothing waits for an acknowledgement.

mod publisher;

pub use publisher::{BATCH_UPDATED_EVENT, BatchUpdated, BroadcastPublisher, Publisher};
