//! Account type definitions
//!
//! An [`Account`] is one external credential set on one betting operator.
//! Accounts are owned by the persistence layer; the session manager only
//! borrows them for the duration of a refresh.

use super::serde_helpers::deserialize_flexible_bool;
use crate::Error;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of supported platform families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformFamily {
    /// Family A: access token exchanged for a session cookie
    SessionCookie,
    /// Family B: chain of bearer tokens ending in a platform JWT
    BearerToken,
}

impl PlatformFamily {
    /// Every supported family
    pub const ALL: [Self; 2] = [Self::SessionCookie, Self::BearerToken];

    /// Stable tag, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionCookie => "session_cookie",
            Self::BearerToken => "bearer_token",
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "session_cookie" => Ok(Self::SessionCookie),
            "bearer_token" => Ok(Self::BearerToken),
            other => Err(Error::config(format!(
                "Unsupported platform family: {}",
                other
            ))),
        }
    }
}

/// Login credential pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Email or login name
    pub login: String,
    /// Plain password as stored by the persistence layer
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tokens a previous run issued and the persistence layer stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedTokens {
    /// Last known access token
    #[serde(default)]
    pub access_token: Option<String>,
    /// Last known user token
    #[serde(default)]
    pub user_token: Option<String>,
    /// Last known platform token
    #[serde(default)]
    pub platform_token: Option<String>,
}

impl IssuedTokens {
    /// Whether nothing was ever issued
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.user_token.is_none() && self.platform_token.is_none()
    }
}

/// One external platform credential set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Stable identifier assigned by the persistence layer
    pub id: String,
    /// Platform family tag
    pub platform: PlatformFamily,
    /// Site identifier (operator brand)
    #[serde(default)]
    pub site_id: String,
    /// Site base URL
    pub site_url: String,
    /// Login credentials
    pub credentials: Credentials,
    /// Previously issued tokens
    #[serde(default)]
    pub tokens: IssuedTokens,
    /// Stored session cookies, forwarded on login by cookie-based families
    #[serde(default)]
    pub cookies: Option<String>,
    /// Whether the account should be refreshed at all
    #[serde(default = "default_active", deserialize_with = "deserialize_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn deserialize_active<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_flexible_bool(deserializer)?.unwrap_or(true))
}

impl Account {
    /// Create an active account with no previously issued tokens
    pub fn new(
        id: impl Into<String>,
        platform: PlatformFamily,
        site_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            id: id.into(),
            platform,
            site_id: String::new(),
            site_url: site_url.into(),
            credentials,
            tokens: IssuedTokens::default(),
            cookies: None,
            active: true,
        }
    }

    /// Set site identifier
    pub fn with_site_id(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = site_id.into();
        self
    }

    /// Set stored session cookies
    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    /// Set previously issued tokens
    pub fn with_tokens(mut self, tokens: IssuedTokens) -> Self {
        self.tokens = tokens;
        self
    }

    /// Set active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}
