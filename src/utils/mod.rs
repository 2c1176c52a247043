//! Utility functions and helpers
//!
//! This module contains utility functions used throughout the crate.

pub mod log;
pub mod version;

pub use log::{mask_secret, truncate_for_log};
pub use version::get_version;
