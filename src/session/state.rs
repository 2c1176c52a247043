//! Per-account authentication state machine

use crate::{Error, Result};
use std::fmt;

/// Where one account's refresh currently stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing known, or a stale session was discarded
    #[default]
    Idle,
    /// Primary login in flight
    LoggingIn,
    /// Access token held, exchange not yet started
    AccessTokenObtained,
    /// Token exchange in flight
    ExchangingToken,
    /// Complete bundle available
    SessionReady,
    /// Upstream declared the session invalid
    Expired,
    /// A network step failed
    Failed,
}

impl SessionState {
    /// Stable name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LoggingIn => "logging_in",
            Self::AccessTokenObtained => "access_token_obtained",
            Self::ExchangingToken => "exchanging_token",
            Self::SessionReady => "session_ready",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    /// No further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Whether moving to `next` is a legal step
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, LoggingIn)
                | (Idle, AccessTokenObtained)
                | (Idle, SessionReady)
                | (LoggingIn, AccessTokenObtained)
                | (LoggingIn, Failed)
                | (AccessTokenObtained, ExchangingToken)
                | (ExchangingToken, SessionReady)
                | (ExchangingToken, Expired)
                | (ExchangingToken, Failed)
                | (SessionReady, Expired)
                | (SessionReady, Failed)
                | (Expired, Idle)
        )
    }

    /// Checked transition
    pub fn transition(self, next: SessionState) -> Result<SessionState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::internal(format!(
                "illegal session transition {} -> {}",
                self, next
            )))
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
