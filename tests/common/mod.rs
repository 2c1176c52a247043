//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

/// Test helper functions
pub mod helpers {
    use async_trait::async_trait;
    use bookie_session::{
        PlatformError, PlatformErrorKind, SessionManager, Settings,
        cache::{CacheBackend, MemoryBackend, TokenCache},
        platform::{AdapterRegistry, PlatformAdapter, PlatformResult},
        types::{
            AccessGrant, Account, Credentials, PlatformFamily, Profile, SessionGrant,
            SessionTokens,
        },
    };
    use fake::{
        Fake,
        faker::internet::en::{Password, SafeEmail},
    };
    use rust_decimal::Decimal;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Adapter with scripted per-account outcomes and call counters
    #[derive(Debug)]
    pub struct MockAdapter {
        family: PlatformFamily,
        pub logins: AtomicUsize,
        pub exchanges: AtomicUsize,
        pub balances: AtomicUsize,
        active: AtomicUsize,
        pub peak_active: AtomicUsize,
        login_failures: HashMap<String, PlatformErrorKind>,
        transient_failures: Mutex<HashMap<String, usize>>,
        delay: Option<Duration>,
        token_ttl: Duration,
        balance: Decimal,
    }

    impl MockAdapter {
        pub fn new(family: PlatformFamily) -> Self {
            Self {
                family,
                logins: AtomicUsize::new(0),
                exchanges: AtomicUsize::new(0),
                balances: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                peak_active: AtomicUsize::new(0),
                login_failures: HashMap::new(),
                transient_failures: Mutex::new(HashMap::new()),
                delay: None,
                token_ttl: Duration::from_secs(3600),
                balance: Decimal::new(12_550, 2),
            }
        }

        /// Every login of `account_id` fails with `kind`
        pub fn with_login_failure(mut self, account_id: &str, kind: PlatformErrorKind) -> Self {
            self.login_failures.insert(account_id.to_string(), kind);
            self
        }

        /// The first `times` logins of `account_id` fail with a network error
        pub fn with_transient_failures(self, account_id: &str, times: usize) -> Self {
            if let Ok(mut failures) = self.transient_failures.lock() {
                failures.insert(account_id.to_string(), times);
            }
            self
        }

        /// Every login takes `delay`
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// TTL of every issued token
        pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
            self.token_ttl = ttl;
            self
        }

        pub fn balance(&self) -> Decimal {
            self.balance
        }

        pub fn login_count(&self) -> usize {
            self.logins.load(Ordering::SeqCst)
        }

        pub fn network_calls(&self) -> usize {
            self.logins.load(Ordering::SeqCst)
                + self.exchanges.load(Ordering::SeqCst)
                + self.balances.load(Ordering::SeqCst)
        }

        fn take_transient_failure(&self, account_id: &str) -> bool {
            let Ok(mut failures) = self.transient_failures.lock() else {
                return false;
            };
            match failures.get_mut(account_id) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        }
    }

    #[async_trait]
    impl PlatformAdapter for MockAdapter {
        fn family(&self) -> PlatformFamily {
            self.family
        }

        async fn login(&self, account: &Account) -> PlatformResult<AccessGrant> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_active.fetch_max(now_active, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            if let Some(kind) = self.login_failures.get(&account.id) {
                return Err(PlatformError::new(*kind, self.family, "scripted login failure"));
            }
            if self.take_transient_failure(&account.id) {
                return Err(PlatformError::network(self.family, "connection reset"));
            }
            Ok(AccessGrant::new(format!("access-{}", account.id), self.token_ttl))
        }

        async fn exchange_token(
            &self,
            account: &Account,
            _access_token: &str,
            _previous_user_token: Option<&str>,
        ) -> PlatformResult<SessionGrant> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            Ok(SessionGrant::new(
                format!("user-{}", account.id),
                format!("platform-{}", account.id),
                self.token_ttl,
            ))
        }

        async fn get_balance(&self, _account: &Account, _session: &SessionTokens) -> PlatformResult<Decimal> {
            self.balances.fetch_add(1, Ordering::SeqCst);
            Ok(self.balance)
        }

        async fn get_profile(&self, account: &Account, _session: &SessionTokens) -> PlatformResult<Profile> {
            Ok(Profile {
                external_id: account.id.clone(),
                login: account.credentials.login.clone(),
                currency: Some("EUR".to_string()),
                display_name: None,
            })
        }
    }

    /// Active account with generated credentials
    pub fn fake_account(id: &str, family: PlatformFamily) -> Account {
        let login: String = SafeEmail().fake();
        let password: String = Password(10..20).fake();
        Account::new(
            id,
            family,
            format!("https://{}.example", id),
            Credentials::new(login, password),
        )
    }

    /// `count` accounts named `acc-0`, `acc-1`, ...
    pub fn fake_accounts(count: usize, family: PlatformFamily) -> Vec<Account> {
        (0..count)
            .map(|i| fake_account(&format!("acc-{}", i), family))
            .collect()
    }

    /// Settings with fast retries for tests
    pub fn create_test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.refresh.retry_base_delay_ms = 1;
        settings
    }

    /// Session manager over a fresh in-memory cache
    pub fn create_test_manager(
        adapter: Arc<MockAdapter>,
        settings: &Settings,
    ) -> (SessionManager, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new(settings.cache.max_entries));
        let manager = create_manager_with_backend(adapter, settings, backend.clone());
        (manager, backend)
    }

    /// Session manager over the given cache backend
    pub fn create_manager_with_backend(
        adapter: Arc<MockAdapter>,
        settings: &Settings,
        backend: Arc<dyn CacheBackend>,
    ) -> SessionManager {
        let registry = AdapterRegistry::new().with_adapter(adapter);
        SessionManager::new(settings, TokenCache::new(backend), registry)
    }

    /// Account ids of a result list, in order
    pub fn ids_of(results: &[bookie_session::LifecycleResult]) -> Vec<String> {
        results.iter().map(|r| r.account_id.clone()).collect()
    }

    /// Ids of the accounts that failed
    pub fn failed_ids(results: &[bookie_session::LifecycleResult]) -> HashSet<String> {
        results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.account_id.clone())
            .collect()
    }
}
