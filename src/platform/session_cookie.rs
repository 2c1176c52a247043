//! Session-cookie platform family
//!
//! Handshake: credential login returns an access token; one session call
//! trades it for a user token plus a `Set-Cookie` session cookie. Reads are
//! authorized by that cookie and the user token.

use super::adapter::{PlatformAdapter, PlatformResult};
use super::http::HttpUtils;
use crate::error::PlatformError;
use crate::types::serde_helpers::{deserialize_flexible_decimal, deserialize_string_or_number};
use crate::types::{AccessGrant, Account, PlatformFamily, Profile, SessionGrant, SessionTokens};
use crate::utils::mask_secret;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, COOKIE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const FAMILY: PlatformFamily = PlatformFamily::SessionCookie;
const USER_TOKEN_HEADER: &str = "X-User-Token";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_user_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(deserialize_with = "deserialize_flexible_decimal")]
    balance: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    id: String,
    login: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// Adapter for the session-cookie family
#[derive(Debug, Clone)]
pub struct SessionCookieAdapter {
    client: Client,
    default_access_ttl: Duration,
    default_session_ttl: Duration,
}

impl SessionCookieAdapter {
    /// Create an adapter sharing `client`
    pub fn new(client: Client, default_access_ttl: Duration, default_session_ttl: Duration) -> Self {
        Self {
            client,
            default_access_ttl,
            default_session_ttl,
        }
    }

    fn read_request(
        &self,
        account: &Account,
        path: &str,
        session: &SessionTokens,
    ) -> PlatformResult<reqwest::RequestBuilder> {
        let url = HttpUtils::endpoint(account, FAMILY, path)?;
        Ok(self
            .client
            .get(url)
            .header(COOKIE, &session.platform_token)
            .header(USER_TOKEN_HEADER, &session.user_token))
    }
}

#[async_trait]
impl PlatformAdapter for SessionCookieAdapter {
    fn family(&self) -> PlatformFamily {
        FAMILY
    }

    async fn login(&self, account: &Account) -> PlatformResult<AccessGrant> {
        let url = HttpUtils::endpoint(account, FAMILY, "/api/auth/login")?;
        let mut request = self.client.post(url).json(&LoginRequest {
            login: &account.credentials.login,
            password: &account.credentials.password,
        });
        if let Some(cookies) = account.cookies.as_deref().filter(|c| !c.is_empty()) {
            request = request.header(COOKIE, cookies);
        }

        let reply = HttpUtils::execute(request, FAMILY, "login").await?;
        let body: LoginResponse = HttpUtils::parse_json(&reply.body, FAMILY, "login")?;
        if body.access_token.is_empty() {
            return Err(PlatformError::malformed(FAMILY, "login: empty accessToken"));
        }

        tracing::debug!(
            account_id = %account.id,
            access_token = %mask_secret(&body.access_token),
            "Login accepted"
        );

        let ttl = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(self.default_access_ttl);
        Ok(AccessGrant::new(body.access_token, ttl))
    }

    async fn exchange_token(
        &self,
        account: &Account,
        access_token: &str,
        previous_user_token: Option<&str>,
    ) -> PlatformResult<SessionGrant> {
        let url = HttpUtils::endpoint(account, FAMILY, "/api/auth/session")?;
        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .json(&SessionRequest {
                previous_user_token,
            });

        let reply = HttpUtils::execute(request, FAMILY, "exchange_token").await?;
        let body: SessionResponse = HttpUtils::parse_json(&reply.body, FAMILY, "exchange_token")?;
        let cookie = reply.session_cookie().ok_or_else(|| {
            PlatformError::malformed(FAMILY, "exchange_token: response set no session cookie")
        })?;

        let ttl = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(self.default_session_ttl);
        Ok(SessionGrant::new(body.user_token, cookie, ttl))
    }

    async fn get_balance(&self, account: &Account, session: &SessionTokens) -> PlatformResult<Decimal> {
        let request = self.read_request(account, "/api/account/balance", session)?;
        let reply = HttpUtils::execute(request, FAMILY, "get_balance").await?;
        let body: BalanceResponse = HttpUtils::parse_json(&reply.body, FAMILY, "get_balance")?;
        Ok(body.balance)
    }

    async fn get_profile(&self, account: &Account, session: &SessionTokens) -> PlatformResult<Profile> {
        let request = self.read_request(account, "/api/account/profile", session)?;
        let reply = HttpUtils::execute(request, FAMILY, "get_profile").await?;
        let body: ProfileResponse = HttpUtils::parse_json(&reply.body, FAMILY, "get_profile")?;
        Ok(Profile {
            external_id: body.id,
            login: body.login,
            currency: body.currency,
            display_name: body.display_name,
        })
    }
}
