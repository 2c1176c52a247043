//! Session lifecycle management
//!
//! This module drives the per-account authentication handshake, keeps the
//! resulting tokens in the token cache, and guarantees a single refresh per
//! account at a time.

pub mod manager;
pub mod state;

pub use manager::SessionManager;
pub use state::SessionState;
