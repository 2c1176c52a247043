//! Credential artifacts produced by the authentication handshake
//!
//! Defines the token types that flow between platform adapters, the token
//! cache and the session manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single token together with when it was issued and how long it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    /// Raw token value
    pub value: String,
    /// Issuance timestamp
    pub issued_at: DateTime<Utc>,
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
}

impl IssuedToken {
    /// Create a token issued now
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        Self::issued_at(value, Utc::now(), ttl)
    }

    /// Create a token with an explicit issuance time
    pub fn issued_at(value: impl Into<String>, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            issued_at,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Time-to-live as a [`Duration`]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Expiration timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl())
            .ok()
            .and_then(|ttl| self.issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self) -> Duration {
        (self.expires_at() - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// The three-tier credential set of one account session
///
/// A bundle is only ready for use when [`TokenBundle::is_complete`] holds;
/// partial bundles are a normal intermediate state during login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBundle {
    /// First-tier token from the primary login
    pub access_token: Option<IssuedToken>,
    /// Second-tier user token
    pub user_token: Option<IssuedToken>,
    /// Second-tier platform/session token
    pub platform_token: Option<IssuedToken>,
}

impl TokenBundle {
    /// All three tokens present and unexpired
    pub fn is_complete(&self) -> bool {
        [&self.access_token, &self.user_token, &self.platform_token]
            .iter()
            .all(|token| token.as_ref().is_some_and(|t| !t.is_expired()))
    }

    /// No token present at all
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.user_token.is_none() && self.platform_token.is_none()
    }

    /// Unexpired access token, if any
    pub fn valid_access_token(&self) -> Option<&IssuedToken> {
        self.access_token.as_ref().filter(|t| !t.is_expired())
    }

    /// Session tokens for authenticated reads, only when the bundle is complete
    pub fn session(&self) -> Option<SessionTokens> {
        if !self.is_complete() {
            return None;
        }
        match (&self.user_token, &self.platform_token) {
            (Some(user), Some(platform)) => Some(SessionTokens::new(&user.value, &platform.value)),
            _ => None,
        }
    }
}

/// Result of a primary login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    /// Access token
    pub access_token: String,
    /// Lifetime announced by the platform (or the configured default)
    pub ttl: Duration,
}

impl AccessGrant {
    /// Create a new access grant
    pub fn new(access_token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            access_token: access_token.into(),
            ttl,
        }
    }
}

/// Result of the token exchange hop(s)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// User token
    pub user_token: String,
    /// Platform/session token
    pub platform_token: String,
    /// Lifetime shared by both tokens
    pub ttl: Duration,
}

impl SessionGrant {
    /// Create a new session grant
    pub fn new(user_token: impl Into<String>, platform_token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            user_token: user_token.into(),
            platform_token: platform_token.into(),
            ttl,
        }
    }

    /// Session tokens carried by this grant
    pub fn tokens(&self) -> SessionTokens {
        SessionTokens::new(&self.user_token, &self.platform_token)
    }
}

/// Tokens required by authenticated read operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    /// User token
    pub user_token: String,
    /// Platform/session token
    pub platform_token: String,
}

impl SessionTokens {
    /// Create session tokens
    pub fn new(user_token: impl Into<String>, platform_token: impl Into<String>) -> Self {
        Self {
            user_token: user_token.into(),
            platform_token: platform_token.into(),
        }
    }
}

/// Account holder profile as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Identifier on the platform side
    pub external_id: String,
    /// Login name
    pub login: String,
    /// Account currency code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(ttl_secs: u64) -> IssuedToken {
        IssuedToken::new("value", Duration::from_secs(ttl_secs))
    }

    fn expired() -> IssuedToken {
        IssuedToken::issued_at(
            "stale",
            Utc::now() - chrono::Duration::hours(2),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_issued_token_expiry() {
        let fresh = token(3600);
        assert!(!fresh.is_expired());
        assert!(fresh.remaining() > Duration::from_secs(3500));

        let stale = expired();
        assert!(stale.is_expired());
        assert_eq!(stale.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_sub_second_ttl_is_kept() {
        let short = IssuedToken::new("value", Duration::from_millis(1500));
        assert_eq!(short.ttl(), Duration::from_millis(1500));
        assert!(short.remaining() > Duration::from_secs(1));

        let brief = IssuedToken::new("value", Duration::from_millis(500));
        assert!(!brief.is_expired());
        assert!(!brief.remaining().is_zero());
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        assert!(token(0).is_expired());
    }

    #[test]
    fn test_bundle_complete() {
        let bundle = TokenBundle {
            access_token: Some(token(3600)),
            user_token: Some(token(600)),
            platform_token: Some(token(600)),
        };
        assert!(bundle.is_complete());
        assert!(bundle.session().is_some());
    }

    #[test]
    fn test_partial_bundle_is_not_ready() {
        let bundle = TokenBundle {
            access_token: Some(token(3600)),
            user_token: None,
            platform_token: None,
        };
        assert!(!bundle.is_complete());
        assert!(!bundle.is_empty());
        assert!(bundle.session().is_none());
        assert!(bundle.valid_access_token().is_some());
    }

    #[test]
    fn test_bundle_with_expired_component_is_not_complete() {
        let bundle = TokenBundle {
            access_token: Some(token(3600)),
            user_token: Some(expired()),
            platform_token: Some(token(600)),
        };
        assert!(!bundle.is_complete());
        assert!(bundle.session().is_none());
    }

    #[test]
    fn test_empty_bundle() {
        let bundle = TokenBundle::default();
        assert!(bundle.is_empty());
        assert!(!bundle.is_complete());
        assert!(bundle.valid_access_token().is_none());
    }

    #[test]
    fn test_session_grant_tokens() {
        let grant = SessionGrant::new("u", "p", Duration::from_secs(60));
        assert_eq!(grant.tokens(), SessionTokens::new("u", "p"));
    }

    #[test]
    fn test_profile_serialization_skips_missing() {
        let profile = Profile {
            external_id: "77".to_string(),
            login: "punter".to_string(),
            currency: None,
            display_name: None,
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("externalId"));
        assert!(!json.contains("currency"));
    }
}
