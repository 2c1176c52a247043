//! Typed token cache
//!
//! Wraps a [`CacheBackend`] with the key scheme and value encoding used for
//! session artifacts. Every key of an account lives under the
//! `session:{account_id}:` scope so the whole session can be dropped with a
//! single prefix delete.

use super::backend::CacheBackend;
use crate::Result;
use crate::types::{IssuedToken, Profile, TokenBundle};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const KEY_PREFIX: &str = "session";

/// Slots stored per account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSlot {
    AccessToken,
    UserToken,
    PlatformToken,
    Balance,
    Profile,
}

impl CacheSlot {
    fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::UserToken => "user_token",
            Self::PlatformToken => "platform_token",
            Self::Balance => "balance",
            Self::Profile => "profile",
        }
    }
}

/// Invalidation scope of one account
pub fn account_scope(account_id: &str) -> String {
    format!("{}:{}:", KEY_PREFIX, account_id)
}

/// Full cache key of one slot
pub fn cache_key(account_id: &str, slot: CacheSlot) -> String {
    format!("{}{}", account_scope(account_id), slot.as_str())
}

/// Session artifact cache over a shared backend
#[derive(Debug, Clone)]
pub struct TokenCache {
    backend: Arc<dyn CacheBackend>,
}

impl TokenCache {
    /// Create a token cache over `backend`
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Underlying backend
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Store the access token for its remaining lifetime
    pub async fn store_access_token(&self, account_id: &str, token: &IssuedToken) -> Result<()> {
        self.put_token(account_id, CacheSlot::AccessToken, token).await
    }

    /// Store the user and platform tokens
    pub async fn store_session_tokens(
        &self,
        account_id: &str,
        user_token: &IssuedToken,
        platform_token: &IssuedToken,
    ) -> Result<()> {
        self.put_token(account_id, CacheSlot::UserToken, user_token)
            .await?;
        self.put_token(account_id, CacheSlot::PlatformToken, platform_token)
            .await
    }

    /// Read whatever tokens of the account are still cached
    pub async fn load_bundle(&self, account_id: &str) -> Result<TokenBundle> {
        Ok(TokenBundle {
            access_token: self.get_json(account_id, CacheSlot::AccessToken).await?,
            user_token: self.get_json(account_id, CacheSlot::UserToken).await?,
            platform_token: self.get_json(account_id, CacheSlot::PlatformToken).await?,
        })
    }

    /// Store a balance snapshot
    pub async fn store_balance(&self, account_id: &str, balance: Decimal, ttl: Duration) -> Result<()> {
        self.put_json(account_id, CacheSlot::Balance, &balance, ttl)
            .await
    }

    /// Read the balance snapshot
    pub async fn load_balance(&self, account_id: &str) -> Result<Option<Decimal>> {
        self.get_json(account_id, CacheSlot::Balance).await
    }

    /// Store a profile snapshot
    pub async fn store_profile(&self, account_id: &str, profile: &Profile, ttl: Duration) -> Result<()> {
        self.put_json(account_id, CacheSlot::Profile, profile, ttl)
            .await
    }

    /// Read the profile snapshot
    pub async fn load_profile(&self, account_id: &str) -> Result<Option<Profile>> {
        self.get_json(account_id, CacheSlot::Profile).await
    }

    /// Drop every cached artifact of the account
    pub async fn invalidate_account(&self, account_id: &str) -> Result<usize> {
        self.invalidate(&account_scope(account_id)).await
    }

    /// Drop every entry under `prefix`
    pub async fn invalidate(&self, prefix: &str) -> Result<usize> {
        let removed = self.backend.delete_prefix(prefix).await?;
        tracing::debug!(prefix, removed, "Invalidated cache scope");
        Ok(removed)
    }

    async fn put_token(&self, account_id: &str, slot: CacheSlot, token: &IssuedToken) -> Result<()> {
        let ttl = token.remaining();
        if ttl.is_zero() {
            tracing::debug!(account_id, slot = slot.as_str(), "Skipping expired token");
            return Ok(());
        }
        self.put_json(account_id, slot, token, ttl).await
    }

    async fn put_json<T: Serialize + ?Sized>(
        &self,
        account_id: &str,
        slot: CacheSlot,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.backend
            .set(&cache_key(account_id, slot), encoded, ttl)
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, account_id: &str, slot: CacheSlot) -> Result<Option<T>> {
        let key = cache_key(account_id, slot);
        let Some(raw) = self.backend.get(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key = %key, "Discarding undecodable cache entry: {}", e);
                Ok(None)
            }
        }
    }
}
