//! Key-value cache backends with per-key expiry
//!
//! [`CacheBackend`] is the seam for any SETEX-style store. [`MemoryBackend`]
//! is the in-process implementation used by default.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Key-value store with per-key expiry and delete-by-prefix
///
/// Implementations must report an unreachable store as
/// [`Error::CacheUnavailable`](crate::Error::CacheUnavailable), never as a miss.
#[async_trait]
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Store `value` under `key`, replacing any prior entry and resetting its expiry
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Read `key`; expired entries read as `None`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove every entry whose key starts with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> Result<usize>;

    /// Number of live entries
    async fn len(&self) -> Result<usize>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache entry with an absolute wall-clock expiry, used for persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEntry {
    /// Cache key
    pub key: String,
    /// Cached value
    pub value: String,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

/// In-memory cache backend
///
/// Expiry uses the tokio clock, so tests running with a paused clock can
/// advance time deterministically.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl MemoryBackend {
    /// Create a backend holding at most `max_entries` entries
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Drop expired entries
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Export live entries with absolute expiries
    pub async fn snapshot(&self) -> Vec<PersistedEntry> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        let wall_now = Utc::now();

        entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .filter_map(|(key, entry)| {
                let remaining = chrono::Duration::from_std(entry.expires_at - now).ok()?;
                Some(PersistedEntry {
                    key: key.clone(),
                    value: entry.value.clone(),
                    expires_at: wall_now.checked_add_signed(remaining)?,
                })
            })
            .collect()
    }

    /// Import persisted entries, skipping those already expired
    pub async fn restore(&self, persisted: Vec<PersistedEntry>) -> usize {
        let wall_now = Utc::now();
        let mut restored = 0;

        for entry in persisted {
            let Ok(remaining) = (entry.expires_at - wall_now).to_std() else {
                continue;
            };
            if remaining.is_zero() {
                continue;
            }
            self.insert(entry.key, entry.value, remaining).await;
            restored += 1;
        }

        tracing::debug!("Restored {} cache entries", restored);
        restored
    }

    async fn insert(&self, key: String, value: String, ttl: Duration) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        if ttl.is_zero() {
            entries.remove(&key);
            return;
        }

        entries.insert(
            key.clone(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );

        if entries.len() > self.max_entries {
            entries.retain(|_, entry| !entry.is_expired(now));
        }

        while entries.len() > self.max_entries {
            let victim = entries
                .iter()
                .filter(|(k, _)| **k != key)
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone());

            match victim {
                Some(victim) => {
                    tracing::debug!("Cache full, evicting {}", victim);
                    entries.remove(&victim);
                }
                None => break,
            }
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.insert(key.to_string(), value, ttl).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }

    async fn len(&self) -> Result<usize> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries.values().filter(|e| !e.is_expired(now)).count())
    }
}
