//! Bulk refresh coordination
//!
//! Fans session refreshes out over many accounts with a concurrency bound.
//! Every account ends as exactly one [`LifecycleResult`], in input order, and
//! no account's failure reaches its siblings.

use crate::config::RefreshSettings;
use crate::session::SessionManager;
use crate::types::{Account, FailureKind, LifecycleResult, RefreshSummary};
use crate::{Error, Result};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound of a single retry delay
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Delay before retry number `attempt` (zero-based): `base * 2^attempt`, capped
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Results of a batch that may have been cancelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Completed results, in input order
    pub results: Vec<LifecycleResult>,
    /// The batch was cancelled before every account completed
    pub cancelled: bool,
}

impl BatchOutcome {
    /// Counts over the completed results
    pub fn summary(&self) -> RefreshSummary {
        RefreshSummary::from_results(&self.results)
    }

    /// Results of a batch that ran to completion
    pub fn into_results(self) -> Result<Vec<LifecycleResult>> {
        if self.cancelled {
            Err(Error::Cancelled)
        } else {
            Ok(self.results)
        }
    }
}

/// Bulk refresh coordinator
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    manager: SessionManager,
    concurrency: usize,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl RefreshCoordinator {
    /// Create a coordinator over `manager`
    pub fn new(manager: SessionManager, settings: &RefreshSettings) -> Self {
        Self {
            manager,
            concurrency: settings.concurrency.max(1),
            max_retries: settings.max_retries,
            retry_base_delay: settings.retry_base_delay(),
        }
    }

    /// Override the concurrency bound
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Override the retry budget for network failures
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Session manager used per account
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Concurrency bound
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Refresh every account; one result per account, in input order
    ///
    /// Fails as a whole only when an account's platform family has no adapter.
    pub async fn refresh_all(&self, accounts: &[Account]) -> Result<Vec<LifecycleResult>> {
        self.refresh_all_with_cancel(accounts, CancellationToken::new())
            .await?
            .into_results()
    }

    /// Cancellable variant of [`RefreshCoordinator::refresh_all`]
    ///
    /// On cancellation, results already completed are kept and in-flight
    /// refreshes are dropped.
    pub async fn refresh_all_with_cancel(
        &self,
        accounts: &[Account],
        cancel: CancellationToken,
    ) -> Result<BatchOutcome> {
        self.validate(accounts)?;

        info!(
            accounts = accounts.len(),
            concurrency = self.concurrency,
            "Starting bulk refresh"
        );

        let mut pending = std::pin::pin!(
            stream::iter(accounts.iter().enumerate())
                .map(|(index, account)| async move { (index, self.refresh_one(account).await) })
                .buffer_unordered(self.concurrency)
        );

        let mut completed = Vec::with_capacity(accounts.len());
        let mut cancelled = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = pending.next() => match next {
                    Some(item) => completed.push(item),
                    None => break,
                },
            }
        }

        completed.sort_by_key(|(index, _)| *index);
        let outcome = BatchOutcome {
            results: completed.into_iter().map(|(_, result)| result).collect(),
            cancelled,
        };

        if cancelled {
            warn!(
                completed = outcome.results.len(),
                total = accounts.len(),
                "Bulk refresh cancelled"
            );
        } else {
            info!("Bulk refresh finished: {}", outcome.summary());
        }

        Ok(outcome)
    }

    /// Reject the batch before any network call when a family has no adapter
    fn validate(&self, accounts: &[Account]) -> Result<()> {
        let families: BTreeSet<_> = accounts.iter().map(|a| a.platform).collect();
        for family in families {
            self.manager.adapters().get(family)?;
        }
        Ok(())
    }

    async fn refresh_one(&self, account: &Account) -> LifecycleResult {
        let mut attempt = 0;
        loop {
            let result = match self.manager.refresh(account).await {
                Ok(result) => result,
                Err(e) => escalated_failure(account, e),
            };

            let retryable = result.error.is_some_and(|kind| kind.is_retryable());
            if result.success || !retryable || attempt >= self.max_retries {
                return result;
            }

            let delay = backoff_delay(self.retry_base_delay, attempt);
            attempt += 1;
            debug!(
                account_id = %account.id,
                attempt,
                max_retries = self.max_retries,
                "Retrying after network failure in {:?}: {}",
                delay,
                result.message
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Turn an error escalated by the session manager into this account's result
fn escalated_failure(account: &Account, err: Error) -> LifecycleResult {
    let kind = match &err {
        Error::CacheUnavailable { .. } => FailureKind::CacheUnavailable,
        Error::Platform(p) => p.kind.into(),
        _ => FailureKind::Internal,
    };
    warn!(account_id = %account.id, "Refresh escalated: {}", err);
    LifecycleResult::failure(&account.id, kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 200)]
    #[case(1, 400)]
    #[case(3, 1600)]
    #[case(6, 10_000)]
    #[case(40, 10_000)]
    fn test_backoff_delay(#[case] attempt: u32, #[case] expected_ms: u64) {
        assert_eq!(
            backoff_delay(Duration::from_millis(200), attempt),
            Duration::from_millis(expected_ms)
        );
    }

    #[test]
    fn test_batch_outcome_into_results() {
        let done = BatchOutcome {
            results: vec![LifecycleResult::failure("a", FailureKind::Network, "x")],
            cancelled: false,
        };
        assert_eq!(done.summary().failed, 1);
        assert_eq!(done.into_results().unwrap().len(), 1);

        let cut = BatchOutcome {
            results: Vec::new(),
            cancelled: true,
        };
        assert!(matches!(cut.into_results(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_escalated_cache_error_becomes_result() {
        let account = crate::types::Account::new(
            "acc-9",
            crate::types::PlatformFamily::SessionCookie,
            "https://book.example",
            crate::types::Credentials::new("a", "b"),
        );
        let result = escalated_failure(&account, Error::cache_unavailable("refused"));
        assert_eq!(result.error, Some(FailureKind::CacheUnavailable));
        assert_eq!(result.account_id, "acc-9");

        let result = escalated_failure(&account, Error::internal("boom"));
        assert_eq!(result.error, Some(FailureKind::Internal));
    }
}
