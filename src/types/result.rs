//! Refresh outcome type definitions
//!
//! Defines the per-account result returned by a refresh and the summary
//! derived from a batch of them.

use super::token::{Profile, TokenBundle};
use crate::error::PlatformErrorKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why a refresh did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Transport failure, timeout, or upstream server error
    Network,
    /// Credentials or token rejected upstream
    AuthRejected,
    /// Unexpected upstream payload
    MalformedResponse,
    /// Cache backend unreachable and no fallback configured
    CacheUnavailable,
    /// Account is flagged inactive
    Inactive,
    /// Unexpected local failure
    Internal,
}

impl FailureKind {
    /// Stable wire name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::AuthRejected => "authRejected",
            Self::MalformedResponse => "malformedResponse",
            Self::CacheUnavailable => "cacheUnavailable",
            Self::Inactive => "inactive",
            Self::Internal => "internal",
        }
    }

    /// Whether a batch-level retry may help
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }
}

impl From<PlatformErrorKind> for FailureKind {
    fn from(kind: PlatformErrorKind) -> Self {
        match kind {
            PlatformErrorKind::Network => Self::Network,
            PlatformErrorKind::AuthRejected => Self::AuthRejected,
            PlatformErrorKind::MalformedResponse => Self::MalformedResponse,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one account refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleResult {
    /// Account the result belongs to
    pub account_id: String,
    /// Whether the account ended in a ready session
    pub success: bool,
    /// Current balance, when retrieved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
    /// Account profile, when profile fetching is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    /// Failure classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureKind>,
    /// Human-readable summary
    pub message: String,
    /// Served entirely from cache without network calls
    #[serde(default)]
    pub from_cache: bool,
    /// Session tokens for the caller to persist; never serialized
    #[serde(skip)]
    pub tokens: Option<TokenBundle>,
}

impl LifecycleResult {
    /// Create a successful result
    pub fn success(
        account_id: impl Into<String>,
        balance: Decimal,
        tokens: TokenBundle,
        message: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            success: true,
            balance: Some(balance),
            profile: None,
            error: None,
            message: message.into(),
            from_cache: false,
            tokens: Some(tokens),
        }
    }

    /// Create a failed result
    pub fn failure(
        account_id: impl Into<String>,
        error: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            success: false,
            balance: None,
            profile: None,
            error: Some(error),
            message: message.into(),
            from_cache: false,
            tokens: None,
        }
    }

    /// Attach a profile
    pub fn with_profile(mut self, profile: Option<Profile>) -> Self {
        self.profile = profile;
        self
    }

    /// Mark as served from cache
    pub fn with_from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }
}

/// Counts of succeeded and failed refreshes in a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    /// Number of results
    pub total: usize,
    /// Results with `success == true`
    pub succeeded: usize,
    /// Results with `success == false`
    pub failed: usize,
}

impl RefreshSummary {
    /// Reduce a result list to counts
    pub fn from_results(results: &[LifecycleResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }

    /// Every result succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for RefreshSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} accounts: {} succeeded, {} failed",
            self.total, self.succeeded, self.failed
        )
    }
}
