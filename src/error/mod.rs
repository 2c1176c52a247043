//! Error handling for the session manager
//!
//! This module defines error types and handling patterns used throughout the crate.

pub mod types;

pub use types::{Error, PlatformError, PlatformErrorKind, Result};
