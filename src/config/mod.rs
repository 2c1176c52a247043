//! Configuration management for the session manager
//!
//! This module handles loading and managing configuration settings
//! for the library and the operator binary.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    CacheSettings, DedupMode, DedupSettings, LoggingSettings, RefreshSettings, SessionSettings,
    Settings, parse_id_list,
};
