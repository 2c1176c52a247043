//! Bookie Session - session and token lifecycle manager
//!
//! Keeps authenticated sessions alive for many betting-operator accounts and
//! reads their balances. Each platform family runs a multi-step login
//! (credentials → access token → user token → platform token); the resulting
//! tokens are cached with per-token expiry so that a warm account costs no
//! login at all.
//!
//! # Architecture
//!
//! - [`platform`]: one [`PlatformAdapter`](platform::PlatformAdapter) per
//!   platform family, chosen by an [`AdapterRegistry`](platform::AdapterRegistry)
//! - [`cache`]: [`TokenCache`](cache::TokenCache) over a pluggable
//!   [`CacheBackend`](cache::CacheBackend)
//! - [`session`]: [`SessionManager`] drives one account through its login
//!   state machine, with per-account single-flight
//! - [`refresh`]: [`RefreshCoordinator`] fans refreshes out over a batch
//! - [`market`]: order-preserving market deduplication
//!
//! # Usage
//!
//! ```bash
//! bookie-session refresh --accounts accounts.json
//! bookie-session dedup --input markets.json --ids 70472
//! ```
//!
//! # Examples
//!
//! ```rust
//! use bookie_session::{
//!     RefreshCoordinator, SessionManager, Settings,
//!     cache::{MemoryBackend, TokenCache},
//!     platform::AdapterRegistry,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> bookie_session::Result<()> {
//! let settings = Settings::default();
//! let cache = TokenCache::new(Arc::new(MemoryBackend::new(settings.cache.max_entries)));
//! let adapters = AdapterRegistry::from_settings(&settings)?;
//! let manager = SessionManager::new(&settings, cache, adapters);
//! let coordinator = RefreshCoordinator::new(manager, &settings.refresh);
//! assert_eq!(coordinator.concurrency(), settings.refresh.concurrency);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod market;
pub mod platform;
pub mod refresh;
pub mod session;
pub mod types;
pub mod utils;

pub use config::Settings;
pub use error::{Error, PlatformError, PlatformErrorKind, Result};
pub use market::{DedupPolicy, deduplicate};
pub use refresh::RefreshCoordinator;
pub use session::SessionManager;
pub use types::{Account, LifecycleResult, MarketRecord, TokenBundle};
