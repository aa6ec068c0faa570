//! Batch Validation Module
//!
//! This module validates submitted batches before the first transaction is
//! sent: shape, duplicate detection, common sender and payload encoding.

mod validator;
pub use validator::Validator;
