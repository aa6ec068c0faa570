//! API Module
//!
//! This module handles the HTTP endpoints through which clients submit
//! batches and poll their status.

mod server;
pub use server::{ApiError, Server};
