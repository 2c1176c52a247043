//! # Session Lifecycle Module
//!
//! The [`SessionManager`] drives one account at a time through the
//! authentication handshake of its platform family and reports the outcome as
//! a [`LifecycleResult`].
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> LoggingIn -> AccessTokenObtained -> ExchangingToken -> SessionReady
//!                                                             \-> Expired -> Idle
//! any network step -> Failed
//! ```
//!
//! ## Caching Strategy
//!
//! - Complete bundle plus cached balance: served with zero network calls
//! - Complete bundle without balance: only the reads are performed
//! - Cached access token only: login is skipped, exchange resumes
//! - Cache unreachable: fresh login when `cache_fallback` is on, error otherwise
//!
//! ## Concurrency
//!
//! At most one refresh per account runs at a time; concurrent callers for the
//! same account attach to the running refresh and receive its outcome.
//!
//! ## Examples
//!
//! ```rust
//! use bookie_session::cache::{MemoryBackend, TokenCache};
//! use bookie_session::platform::AdapterRegistry;
//! use bookie_session::session::SessionManager;
//! use bookie_session::types::{Account, Credentials, FailureKind, PlatformFamily};
//! use bookie_session::Settings;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::default();
//! let cache = TokenCache::new(Arc::new(MemoryBackend::new(settings.cache.max_entries)));
//! let adapters = AdapterRegistry::from_settings(&settings)?;
//! let manager = SessionManager::new(&settings, cache, adapters);
//!
//! let account = Account::new(
//!     "acc-1",
//!     PlatformFamily::BearerToken,
//!     "https://bets.example",
//!     Credentials::new("punter@example.com", "secret"),
//! )
//! .with_active(false);
//!
//! let result = manager.refresh(&account).await?;
//! assert!(!result.success);
//! assert_eq!(result.error, Some(FailureKind::Inactive));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use super::state::SessionState;
use crate::cache::TokenCache;
use crate::config::{SessionSettings, Settings};
use crate::error::{PlatformError, PlatformErrorKind};
use crate::platform::{AdapterRegistry, PlatformAdapter, PlatformResult};
use crate::types::{Account, FailureKind, IssuedToken, LifecycleResult, Profile, SessionTokens, TokenBundle};
use crate::utils::mask_secret;
use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type RefreshFuture = BoxFuture<'static, Result<LifecycleResult>>;
type SharedRefresh = Shared<RefreshFuture>;

/// Running refresh of one account, tagged with the generation that started it
///
/// Held weakly: once every caller awaiting a run is dropped, the run itself
/// is dropped and the entry can no longer be joined.
type InFlight = HashMap<String, (u64, WeakShared<RefreshFuture>)>;

/// Everything a refresh needs, shared with detached single-flight futures
#[derive(Debug, Clone)]
struct SessionCore {
    settings: SessionSettings,
    request_timeout: Duration,
    bypass_cache: bool,
    cache: TokenCache,
    adapters: AdapterRegistry,
}

/// Session lifecycle orchestrator
///
/// Cheap to clone; clones share the cache, the adapters and the in-flight map.
#[derive(Clone)]
pub struct SessionManager {
    core: Arc<SessionCore>,
    in_flight: Arc<Mutex<InFlight>>,
    generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a session manager over an injected cache and adapter set.
    ///
    /// # Arguments
    ///
    /// * `settings` - TTL defaults, fallback switches and the network timeout
    /// * `cache` - Token cache shared with every other component using the backend
    /// * `adapters` - One adapter per platform family that may be refreshed
    pub fn new(settings: &Settings, cache: TokenCache, adapters: AdapterRegistry) -> Self {
        Self {
            core: Arc::new(SessionCore {
                settings: settings.session.clone(),
                request_timeout: settings.refresh.request_timeout(),
                bypass_cache: false,
                cache,
                adapters,
            }),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Skip every cache read and always run the full login sequence
    ///
    /// Results are still written to the cache.
    pub fn with_bypass_cache(mut self, bypass_cache: bool) -> Self {
        let mut core = (*self.core).clone();
        core.bypass_cache = bypass_cache;
        self.core = Arc::new(core);
        self
    }

    /// Token cache used by this manager
    pub fn cache(&self) -> &TokenCache {
        &self.core.cache
    }

    /// Registered adapters
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.core.adapters
    }

    /// Refreshes one account.
    ///
    /// Platform failures never surface as `Err`: they become a failed
    /// [`LifecycleResult`]. `Err` is reserved for:
    /// - [`Error::Config`] when the account's family has no adapter
    /// - [`Error::CacheUnavailable`] when the cache is down and fallback is off
    ///
    /// A second caller for an account that is already refreshing waits for
    /// and receives the same outcome.
    pub async fn refresh(&self, account: &Account) -> Result<LifecycleResult> {
        if !account.active {
            debug!(account_id = %account.id, "Skipping inactive account");
            return Ok(LifecycleResult::failure(
                &account.id,
                FailureKind::Inactive,
                "account is inactive",
            ));
        }

        let adapter = self.core.adapters.get(account.platform)?;
        let (generation, refresh) = self.join_or_start(account, adapter).await;
        let outcome = refresh.await;
        self.release(&account.id, generation).await;
        outcome
    }

    /// Drops every cached artifact of the account (logout)
    pub async fn invalidate(&self, account_id: &str) -> Result<usize> {
        info!(account_id, "Invalidating cached session");
        self.core.cache.invalidate_account(account_id).await
    }

    /// Number of accounts currently refreshing
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .await
            .values()
            .filter(|(_, refresh)| refresh.upgrade().is_some_and(|r| r.peek().is_none()))
            .count()
    }

    async fn join_or_start(
        &self,
        account: &Account,
        adapter: Arc<dyn PlatformAdapter>,
    ) -> (u64, SharedRefresh) {
        let mut in_flight = self.in_flight.lock().await;

        // Abandoned runs fail to upgrade; finished ones are left over from a
        // caller dropped before releasing
        if let Some((generation, weak)) = in_flight.get(&account.id)
            && let Some(refresh) = weak.upgrade()
            && refresh.peek().is_none()
        {
            debug!(account_id = %account.id, generation, "Joining in-flight refresh");
            return (*generation, refresh);
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let core = Arc::clone(&self.core);
        let owned = account.clone();
        let refresh = async move { core.run(&owned, adapter).await }
            .boxed()
            .shared();

        match refresh.downgrade() {
            Some(weak) => {
                in_flight.insert(account.id.clone(), (generation, weak));
            }
            None => {
                in_flight.remove(&account.id);
            }
        }
        (generation, refresh)
    }

    async fn release(&self, account_id: &str, generation: u64) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(account_id)
            .is_some_and(|(current, _)| *current == generation)
        {
            in_flight.remove(account_id);
        }
    }
}

impl SessionCore {
    async fn run(&self, account: &Account, adapter: Arc<dyn PlatformAdapter>) -> Result<LifecycleResult> {
        RefreshRun {
            core: self,
            account,
            adapter,
            state: SessionState::Idle,
            store: CacheAccess {
                account_id: &account.id,
                fallback: self.settings.cache_fallback,
                online: true,
            },
        }
        .execute()
        .await
    }
}

/// Cache access of one run, degrading to offline when the backend is down
struct CacheAccess<'a> {
    account_id: &'a str,
    fallback: bool,
    online: bool,
}

impl CacheAccess<'_> {
    async fn read<T>(&mut self, op: impl Future<Output = Result<T>>) -> Result<Option<T>> {
        if !self.online {
            return Ok(None);
        }
        match op.await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_cache_unavailable() => self.degrade(e).map(|_| None),
            Err(e) => Err(e),
        }
    }

    async fn write<T>(&mut self, op: impl Future<Output = Result<T>>) -> Result<()> {
        if !self.online {
            return Ok(());
        }
        match op.await {
            Ok(_) => Ok(()),
            Err(e) if e.is_cache_unavailable() => self.degrade(e),
            Err(e) => Err(e),
        }
    }

    fn degrade(&mut self, err: Error) -> Result<()> {
        if !self.fallback {
            return Err(err);
        }
        warn!(
            account_id = self.account_id,
            "Cache unavailable, continuing without it: {}", err
        );
        self.online = false;
        Ok(())
    }
}

/// One execution of the state machine
struct RefreshRun<'a> {
    core: &'a SessionCore,
    account: &'a Account,
    adapter: Arc<dyn PlatformAdapter>,
    state: SessionState,
    store: CacheAccess<'a>,
}

impl RefreshRun<'_> {
    async fn execute(mut self) -> Result<LifecycleResult> {
        let cached = if self.core.bypass_cache {
            TokenBundle::default()
        } else {
            self.store
                .read(self.core.cache.load_bundle(&self.account.id))
                .await?
                .unwrap_or_default()
        };

        let Some(session) = cached.session() else {
            return self.login_sequence(cached, false).await;
        };

        if let Some(result) = self.try_fast_path(&cached).await? {
            return Ok(result);
        }

        self.advance(SessionState::SessionReady)?;
        match self.read_account(&session).await {
            Ok((balance, profile)) => self.finish(cached, balance, profile).await,
            Err(e) if e.kind == PlatformErrorKind::AuthRejected => {
                warn!(
                    account_id = %self.account.id,
                    "Cached session rejected upstream, logging in again: {}", e
                );
                self.discard_session().await?;
                self.login_sequence(cached, true).await
            }
            Err(e) => Ok(self.fail(e)),
        }
    }

    async fn try_fast_path(&mut self, bundle: &TokenBundle) -> Result<Option<LifecycleResult>> {
        let Some(balance) = self
            .store
            .read(self.core.cache.load_balance(&self.account.id))
            .await?
            .flatten()
        else {
            return Ok(None);
        };

        let profile = if self.core.settings.fetch_profile {
            let cached = self
                .store
                .read(self.core.cache.load_profile(&self.account.id))
                .await?
                .flatten();
            if cached.is_none() {
                return Ok(None);
            }
            cached
        } else {
            None
        };

        self.advance(SessionState::SessionReady)?;
        info!(account_id = %self.account.id, "Session served from cache");
        Ok(Some(
            LifecycleResult::success(&self.account.id, balance, bundle.clone(), "session ready (cached)")
                .with_profile(profile)
                .with_from_cache(true),
        ))
    }

    /// Login (unless a cached access token can be reused), exchange, then read
    async fn login_sequence(mut self, cached: TokenBundle, mut reauthenticated: bool) -> Result<LifecycleResult> {
        let previous_user_token = cached
            .user_token
            .as_ref()
            .map(|t| t.value.clone())
            .or_else(|| self.account.tokens.user_token.clone());

        loop {
            let reused = if reauthenticated {
                None
            } else {
                cached.valid_access_token().cloned()
            };
            let access_reused = reused.is_some();

            let access = match reused {
                Some(token) => {
                    debug!(
                        account_id = %self.account.id,
                        access_token = %mask_secret(&token.value),
                        "Reusing cached access token"
                    );
                    self.advance(SessionState::AccessTokenObtained)?;
                    token
                }
                None => {
                    self.advance(SessionState::LoggingIn)?;
                    let grant = match self.call("login", self.adapter.login(self.account)).await {
                        Ok(grant) => grant,
                        Err(e) => return Ok(self.fail(e)),
                    };
                    let token = IssuedToken::new(grant.access_token, grant.ttl);
                    self.store
                        .write(self.core.cache.store_access_token(&self.account.id, &token))
                        .await?;
                    self.advance(SessionState::AccessTokenObtained)?;
                    token
                }
            };

            self.advance(SessionState::ExchangingToken)?;
            let exchange = self.adapter.exchange_token(
                self.account,
                &access.value,
                previous_user_token.as_deref(),
            );
            let grant = match self.call("exchange_token", exchange).await {
                Ok(grant) => grant,
                Err(e) if access_reused && e.kind == PlatformErrorKind::AuthRejected => {
                    warn!(
                        account_id = %self.account.id,
                        "Cached access token rejected upstream, logging in again: {}", e
                    );
                    self.discard_session().await?;
                    reauthenticated = true;
                    continue;
                }
                Err(e) => return Ok(self.fail(e)),
            };

            let session = grant.tokens();
            let user_token = IssuedToken::new(grant.user_token, grant.ttl);
            let platform_token = IssuedToken::new(grant.platform_token, grant.ttl);
            self.store
                .write(self.core.cache.store_session_tokens(
                    &self.account.id,
                    &user_token,
                    &platform_token,
                ))
                .await?;
            self.advance(SessionState::SessionReady)?;

            let bundle = TokenBundle {
                access_token: Some(access),
                user_token: Some(user_token),
                platform_token: Some(platform_token),
            };

            return match self.read_account(&session).await {
                Ok((balance, profile)) => self.finish(bundle, balance, profile).await,
                Err(e) => Ok(self.fail(e)),
            };
        }
    }

    async fn read_account(&self, session: &SessionTokens) -> PlatformResult<(Decimal, Option<Profile>)> {
        let balance = self
            .call("get_balance", self.adapter.get_balance(self.account, session))
            .await?;

        let profile = if self.core.settings.fetch_profile {
            Some(
                self.call("get_profile", self.adapter.get_profile(self.account, session))
                    .await?,
            )
        } else {
            None
        };

        Ok((balance, profile))
    }

    async fn finish(
        &mut self,
        bundle: TokenBundle,
        balance: Decimal,
        profile: Option<Profile>,
    ) -> Result<LifecycleResult> {
        let settings = &self.core.settings;
        self.store
            .write(self.core.cache.store_balance(&self.account.id, balance, settings.balance_ttl()))
            .await?;
        if let Some(profile) = &profile {
            self.store
                .write(self.core.cache.store_profile(&self.account.id, profile, settings.profile_ttl()))
                .await?;
        }

        info!(account_id = %self.account.id, family = %self.account.platform, "Session ready");
        Ok(LifecycleResult::success(&self.account.id, balance, bundle, "session ready").with_profile(profile))
    }

    /// Upstream rejected a session we considered valid: drop it and start over
    async fn discard_session(&mut self) -> Result<()> {
        self.advance(SessionState::Expired)?;
        self.store
            .write(self.core.cache.invalidate_account(&self.account.id))
            .await?;
        self.advance(SessionState::Idle)
    }

    async fn call<T>(&self, step: &'static str, op: impl Future<Output = PlatformResult<T>>) -> PlatformResult<T> {
        debug!(
            account_id = %self.account.id,
            family = %self.account.platform,
            step,
            "Calling platform"
        );
        let timeout = self.core.request_timeout;
        match tokio::time::timeout(timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(PlatformError::network(
                self.account.platform,
                format!("{} timed out after {:?}", step, timeout),
            )),
        }
    }

    fn advance(&mut self, next: SessionState) -> Result<()> {
        let previous = self.state;
        self.state = previous.transition(next)?;
        debug!(
            account_id = %self.account.id,
            from = %previous,
            to = %next,
            "Session state transition"
        );
        Ok(())
    }

    fn fail(&mut self, err: PlatformError) -> LifecycleResult {
        warn!(
            account_id = %self.account.id,
            family = %err.family,
            state = %self.state,
            "Refresh failed: {}", err
        );
        self.state = SessionState::Failed;
        LifecycleResult::failure(&self.account.id, err.kind.into(), err.to_string())
    }
}
