//! Type definitions for the session manager
//!
//! This module contains the main data structures: account inputs, token
//! artifacts, refresh results and market records.

pub mod account;
pub mod market;
pub mod result;
pub mod serde_helpers;
pub mod token;

pub use account::{Account, Credentials, IssuedTokens, PlatformFamily};
pub use market::MarketRecord;
pub use result::{FailureKind, LifecycleResult, RefreshSummary};
pub use token::{AccessGrant, IssuedToken, Profile, SessionGrant, SessionTokens, TokenBundle};
