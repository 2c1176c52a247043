//! Platform adapter trait
//!
//! One implementation per platform family. The session manager drives the
//! handshake through this trait and never sees wire payloads.

use crate::error::PlatformError;
use crate::types::{AccessGrant, Account, PlatformFamily, Profile, SessionGrant, SessionTokens};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Result type of adapter operations
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Network capability over one platform family
#[async_trait]
pub trait PlatformAdapter: Send + Sync + std::fmt::Debug {
    /// Family this adapter speaks
    fn family(&self) -> PlatformFamily;

    /// Primary credential login
    async fn login(&self, account: &Account) -> PlatformResult<AccessGrant>;

    /// Exchange an access token for the user and platform tokens
    ///
    /// Families needing several hops perform them all here; callers see one
    /// compound result.
    async fn exchange_token(
        &self,
        account: &Account,
        access_token: &str,
        previous_user_token: Option<&str>,
    ) -> PlatformResult<SessionGrant>;

    /// Current account balance
    async fn get_balance(&self, account: &Account, session: &SessionTokens) -> PlatformResult<Decimal>;

    /// Account holder profile
    async fn get_profile(&self, account: &Account, session: &SessionTokens) -> PlatformResult<Profile>;
}
