//! Token cache
//!
//! TTL key-value storage for credential artifacts and balance/profile
//! snapshots.

pub mod backend;
pub mod file;
pub mod token_cache;

pub use backend::{CacheBackend, MemoryBackend, PersistedEntry};
pub use file::{FileCache, get_cache_path};
pub use token_cache::{CacheSlot, TokenCache, account_scope, cache_key};
