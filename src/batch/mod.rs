//! Batch Module
//!
//! Submission and reconciliation of client batches:
//! - BatchOrchestrator: validates, submits groups and applies observed outcomes
//! - BatchView: client-facing projection of a stored batch

pub mod orchestrator;
mod reconcile;
mod view;


pub use orchestrator::BatchOrchestrator;
pub use reconcile::Reconciled;
pub use view::{BatchView, TransactionView};
