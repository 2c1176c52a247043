//! Market deduplication
//!
//! Pure functions over ingested market batches, independent of sessions.

pub mod dedup;

pub use dedup::{DedupPolicy, deduplicate};
