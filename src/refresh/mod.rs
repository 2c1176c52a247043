//! Bulk refresh
//!
//! Concurrent, order-preserving, failure-isolated refresh of many accounts.

pub mod coordinator;

pub use coordinator::{BatchOutcome, RefreshCoordinator, backoff_delay};
