//! Configuration settings structure
//!
//! Defines the main settings structure, its defaults, and the file and
//! environment sources it can be loaded from.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Main configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Session lifecycle configuration
    pub session: SessionSettings,
    /// Bulk refresh and network configuration
    pub refresh: RefreshSettings,
    /// Token cache configuration
    pub cache: CacheSettings,
    /// Market deduplication configuration
    pub dedup: DedupSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Token lifetimes and lifecycle switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Access token TTL when the platform does not announce one
    pub access_token_ttl_secs: u64,
    /// User/platform token TTL when the platform does not announce one
    pub session_token_ttl_secs: u64,
    /// How long a fetched balance is served from cache
    pub balance_ttl_secs: u64,
    /// How long a fetched profile is served from cache
    pub profile_ttl_secs: u64,
    /// Degrade to a fresh login when the cache backend is unreachable
    pub cache_fallback: bool,
    /// Also retrieve the account profile on refresh
    pub fetch_profile: bool,
}

/// Bulk refresh and HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Maximum accounts refreshed at once
    pub concurrency: usize,
    /// Per network call timeout
    pub request_timeout_secs: u64,
    /// Batch-level retries for network failures
    pub max_retries: u32,
    /// First retry delay; doubles on each attempt
    pub retry_base_delay_ms: u64,
    /// User agent sent to platforms
    pub user_agent: String,
}

/// Token cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum cache entries held in memory
    pub max_entries: usize,
    /// Persist the cache between CLI runs
    pub persist: bool,
}

/// Which market ids are collapsed by deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Every id
    All,
    /// Only the ids listed in `ids`
    AllowList,
}

/// Market deduplication configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupSettings {
    /// Selection mode
    pub mode: DedupMode,
    /// Allow-listed ids
    pub ids: BTreeSet<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: 48 * 3600,
            session_token_ttl_secs: 3600,
            balance_ttl_secs: 60,
            profile_ttl_secs: 600,
            cache_fallback: true,
            fetch_profile: false,
        }
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            request_timeout_secs: 30,
            max_retries: 1,
            retry_base_delay_ms: 200,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            persist: true,
        }
    }
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            mode: DedupMode::All,
            ids: BTreeSet::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "error".to_string(),
            verbose: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            refresh: RefreshSettings::default(),
            cache: CacheSettings::default(),
            dedup: DedupSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl SessionSettings {
    /// Default access token TTL
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_ttl_secs)
    }

    /// Default user/platform token TTL
    pub fn session_token_ttl(&self) -> Duration {
        Duration::from_secs(self.session_token_ttl_secs)
    }

    /// Balance snapshot TTL
    pub fn balance_ttl(&self) -> Duration {
        Duration::from_secs(self.balance_ttl_secs)
    }

    /// Profile snapshot TTL
    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_ttl_secs)
    }
}

impl RefreshSettings {
    /// Per network call timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// First retry delay
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file; missing sections and keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        Self::default().merge_with_env()
    }

    /// Apply `BOOKIE_*` environment overrides
    pub fn merge_with_env(mut self) -> Result<Self> {
        if let Some(concurrency) = env_parse::<usize>("BOOKIE_REFRESH_CONCURRENCY")? {
            self.refresh.concurrency = concurrency;
        }

        if let Some(timeout) = env_parse::<u64>("BOOKIE_REQUEST_TIMEOUT_SECS")? {
            self.refresh.request_timeout_secs = timeout;
        }

        if let Some(retries) = env_parse::<u32>("BOOKIE_MAX_RETRIES")? {
            self.refresh.max_retries = retries;
        }

        if let Some(fallback) = env_parse::<bool>("BOOKIE_CACHE_FALLBACK")? {
            self.session.cache_fallback = fallback;
        }

        if let Some(fetch_profile) = env_parse::<bool>("BOOKIE_FETCH_PROFILE")? {
            self.session.fetch_profile = fetch_profile;
        }

        if let Ok(ids) = std::env::var("BOOKIE_DEDUP_IDS") {
            self.dedup.ids = parse_id_list(&ids)?;
            self.dedup.mode = DedupMode::AllowList;
        }

        if let Ok(level) = std::env::var("BOOKIE_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Reject settings the session manager cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.refresh.concurrency == 0 {
            return Err(Error::config("refresh.concurrency must be at least 1"));
        }
        if self.refresh.request_timeout_secs == 0 {
            return Err(Error::config("refresh.request_timeout_secs must be positive"));
        }
        if self.session.access_token_ttl_secs == 0 || self.session.session_token_ttl_secs == 0 {
            return Err(Error::config("session token TTLs must be positive"));
        }
        if self.session.balance_ttl_secs == 0 || self.session.profile_ttl_secs == 0 {
            return Err(Error::config("session snapshot TTLs must be positive"));
        }
        if self.cache.max_entries == 0 {
            return Err(Error::config("cache.max_entries must be at least 1"));
        }
        if self.dedup.mode == DedupMode::AllowList && self.dedup.ids.is_empty() {
            return Err(Error::config(
                "dedup.mode = \"allow_list\" requires at least one id",
            ));
        }
        Ok(())
    }
}

/// Parse a comma separated list of market ids
pub fn parse_id_list(raw: &str) -> Result<BTreeSet<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|e| Error::config(format!("Invalid market id '{}': {}", s, e)))
        })
        .collect()
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}
