//! Error type definitions
//!
//! Defines the main error types used throughout the session manager.

use crate::types::PlatformFamily;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Main error type for the session manager
///
/// `Clone` so that every caller attached to a single in-flight refresh can
/// receive the same escalated error.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Configuration-related errors (unsupported platform family, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The cache backend could not be reached
    #[error("Cache unavailable: {reason}")]
    CacheUnavailable { reason: String },

    /// A platform adapter call failed
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A batch refresh was cancelled by its caller
    #[error("Refresh cancelled")]
    Cancelled,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[source] Arc<serde_json::Error>),

    /// TOML configuration parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[source] Arc<toml::de::Error>),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a cache unavailable error
    pub fn cache_unavailable(reason: impl Into<String>) -> Self {
        Self::CacheUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is the cache backend being unreachable
    pub fn is_cache_unavailable(&self) -> bool {
        matches!(self, Self::CacheUnavailable { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParse(Arc::new(err))
    }
}

/// Classification of a failed platform call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlatformErrorKind {
    /// Transport failure, timeout, or upstream server error
    Network,
    /// The upstream rejected the credentials or token (401/403)
    AuthRejected,
    /// The upstream answered, but not with the payload we expected
    MalformedResponse,
}

impl PlatformErrorKind {
    /// Stable wire name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::AuthRejected => "authRejected",
            Self::MalformedResponse => "malformedResponse",
        }
    }
}

impl std::fmt::Display for PlatformErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a [`PlatformAdapter`](crate::platform::PlatformAdapter)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{family}] {kind}: {message}")]
pub struct PlatformError {
    /// What went wrong
    pub kind: PlatformErrorKind,
    /// Which adapter family raised it
    pub family: PlatformFamily,
    /// Human-readable detail
    pub message: String,
}

impl PlatformError {
    /// Create a platform error of the given kind
    pub fn new(kind: PlatformErrorKind, family: PlatformFamily, message: impl Into<String>) -> Self {
        Self {
            kind,
            family,
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(family: PlatformFamily, message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::Network, family, message)
    }

    /// Create an auth rejected error
    pub fn auth_rejected(family: PlatformFamily, message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::AuthRejected, family, message)
    }

    /// Create a malformed response error
    pub fn malformed(family: PlatformFamily, message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::MalformedResponse, family, message)
    }

    /// Whether the failure is transient and worth retrying at batch level
    pub fn is_transient(&self) -> bool {
        self.kind == PlatformErrorKind::Network
    }
}
