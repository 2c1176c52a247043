//! Bearer-token platform family
//!
//! Handshake: credential login returns an access token, which buys a user
//! token, which in turn buys a short-lived platform JWT. Reads carry the
//! platform JWT as bearer plus the user token.

use super::adapter::{PlatformAdapter, PlatformResult};
use super::http::HttpUtils;
use crate::error::PlatformError;
use crate::types::serde_helpers::{deserialize_flexible_decimal, deserialize_string_or_number};
use crate::types::{AccessGrant, Account, PlatformFamily, Profile, SessionGrant, SessionTokens};
use crate::utils::mask_secret;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const FAMILY: PlatformFamily = PlatformFamily::BearerToken;
const USER_TOKEN_HEADER: &str = "X-User-Token";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
struct UserTokenRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_user_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UserTokenResponse {
    user_token: String,
}

#[derive(Debug, Deserialize)]
struct PlatformTokenResponse {
    platform_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WalletResponse {
    wallet: Wallet,
}

#[derive(Debug, Deserialize)]
struct Wallet {
    #[serde(deserialize_with = "deserialize_flexible_decimal")]
    available: Decimal,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    user_id: String,
    email: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

/// Remaining lifetime announced by a JWT's `exp` claim
///
/// Returns `None` when the token is not a JWT or carries no `exp`; an `exp`
/// in the past yields a zero lifetime.
pub fn jwt_remaining_lifetime(token: &str) -> Option<Duration> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: JwtClaims = serde_json::from_slice(&decoded).ok()?;
    let remaining = claims.exp? - Utc::now().timestamp();
    Some(Duration::from_secs(u64::try_from(remaining).unwrap_or(0)))
}

/// Adapter for the bearer-token family
#[derive(Debug, Clone)]
pub struct BearerTokenAdapter {
    client: Client,
    default_access_ttl: Duration,
    default_session_ttl: Duration,
}

impl BearerTokenAdapter {
    /// Create an adapter sharing `client`
    pub fn new(client: Client, default_access_ttl: Duration, default_session_ttl: Duration) -> Self {
        Self {
            client,
            default_access_ttl,
            default_session_ttl,
        }
    }

    async fn fetch_user_token(
        &self,
        account: &Account,
        access_token: &str,
        previous_user_token: Option<&str>,
    ) -> PlatformResult<String> {
        let url = HttpUtils::endpoint(account, FAMILY, "/api/v2/auth/user-token")?;
        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .json(&UserTokenRequest {
                previous_user_token,
            });

        let reply = HttpUtils::execute(request, FAMILY, "exchange_token.user").await?;
        let body: UserTokenResponse =
            HttpUtils::parse_json(&reply.body, FAMILY, "exchange_token.user")?;
        Ok(body.user_token)
    }

    async fn fetch_platform_token(
        &self,
        account: &Account,
        user_token: &str,
    ) -> PlatformResult<PlatformTokenResponse> {
        let url = HttpUtils::endpoint(account, FAMILY, "/api/v2/platform/token")?;
        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", user_token));

        let reply = HttpUtils::execute(request, FAMILY, "exchange_token.platform").await?;
        HttpUtils::parse_json(&reply.body, FAMILY, "exchange_token.platform")
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
            .header(AUTHORIZATION, format!("Bearer {}", session.platform_token))
            .header(USER_TOKEN_HEADER, &session.user_token))
    }
}

#[async_trait]
impl PlatformAdapter for BearerTokenAdapter {
    fn family(&self) -> PlatformFamily {
        FAMILY
    }

    async fn login(&self, account: &Account) -> PlatformResult<AccessGrant> {
        let url = HttpUtils::endpoint(account, FAMILY, "/api/v2/auth/token")?;
        let request = self.client.post(url).json(&TokenRequest {
            email: &account.credentials.login,
            password: &account.credentials.password,
        });

        let reply = HttpUtils::execute(request, FAMILY, "login").await?;
        let body: TokenResponse = HttpUtils::parse_json(&reply.body, FAMILY, "login")?;
        if body.access_token.is_empty() {
            return Err(PlatformError::malformed(FAMILY, "login: empty access_token"));
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
        let user_token = self
            .fetch_user_token(account, access_token, previous_user_token)
            .await?;
        let platform = self.fetch_platform_token(account, &user_token).await?;

        let ttl = platform
            .expires_in
            .map(Duration::from_secs)
            .or_else(|| jwt_remaining_lifetime(&platform.platform_token))
            .unwrap_or(self.default_session_ttl);

        tracing::debug!(
            account_id = %account.id,
            platform_token = %mask_secret(&platform.platform_token),
            ttl_secs = ttl.as_secs(),
            "Platform token issued"
        );

        Ok(SessionGrant::new(user_token, platform.platform_token, ttl))
    }

    async fn get_balance(&self, account: &Account, session: &SessionTokens) -> PlatformResult<Decimal> {
        let request = self.read_request(account, "/api/v2/wallet/balance", session)?;
        let reply = HttpUtils::execute(request, FAMILY, "get_balance").await?;
        let body: WalletResponse = HttpUtils::parse_json(&reply.body, FAMILY, "get_balance")?;
        Ok(body.wallet.available)
    }

    async fn get_profile(&self, account: &Account, session: &SessionTokens) -> PlatformResult<Profile> {
        let request = self.read_request(account, "/api/v2/user/me", session)?;
        let reply = HttpUtils::execute(request, FAMILY, "get_profile").await?;
        let body: UserResponse = HttpUtils::parse_json(&reply.body, FAMILY, "get_profile")?;
        Ok(Profile {
            external_id: body.user_id,
            login: body.email,
            currency: body.currency,
            display_name: body.nickname,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformErrorKind;
    use crate::types::Credentials;
    use serde_json::json;
    use std::str::FromStr;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter() -> BearerTokenAdapter {
        BearerTokenAdapter::new(
            Client::new(),
            Duration::from_secs(7200),
            Duration::from_secs(900),
        )
    }

    fn account(server: &MockServer) -> Account {
        Account::new(
            "acc-b",
            FAMILY,
            server.uri(),
            Credentials::new("punter@example.com", "s3cret"),
        )
    }

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"1","exp":{}}}"#, exp));
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_jwt_remaining_lifetime() {
        let token = jwt_with_exp(Utc::now().timestamp() + 600);
        let remaining = jwt_remaining_lifetime(&token).unwrap();
        assert!(remaining <= Duration::from_secs(600));
        assert!(remaining >= Duration::from_secs(590));
    }

    #[test]
    fn test_jwt_in_the_past_is_zero() {
        let token = jwt_with_exp(Utc::now().timestamp() - 60);
        assert_eq!(jwt_remaining_lifetime(&token), Some(Duration::ZERO));
    }

    #[test]
    fn test_opaque_token_has_no_lifetime() {
        assert_eq!(jwt_remaining_lifetime("opaque-token"), None);
        assert_eq!(jwt_remaining_lifetime("a.!!!.c"), None);
    }

    #[tokio::test]
    async fn test_login_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/auth/token"))
            .and(body_json(json!({ "email": "punter@example.com", "password": "s3cret" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "acc", "expires_in": 172800 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let grant = adapter().login(&account(&server)).await.unwrap();
        assert_eq!(grant.access_token, "acc");
        assert_eq!(grant.ttl, Duration::from_secs(172_800));
    }

    #[tokio::test]
    async fn test_exchange_chains_two_calls() {
        let server = MockServer::start().await;
        let platform_token = jwt_with_exp(Utc::now().timestamp() + 1200);

        Mock::given(method("POST"))
            .and(path("/api/v2/auth/user-token"))
            .and(header("authorization", "Bearer acc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user_token": "usr" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/platform/token"))
            .and(header("authorization", "Bearer usr"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "platform_token": platform_token })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let grant = adapter()
            .exchange_token(&account(&server), "acc", None)
            .await
            .unwrap();
        assert_eq!(grant.user_token, "usr");
        assert_eq!(grant.platform_token, platform_token);
        assert!(grant.ttl > Duration::from_secs(1100));
        assert!(grant.ttl <= Duration::from_secs(1200));
    }

    #[tokio::test]
    async fn test_exchange_prefers_announced_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/auth/user-token"))
            .and(body_json(json!({ "previous_user_token": "old" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user_token": "usr" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/platform/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "platform_token": "opaque", "expires_in": 300 })),
            )
            .mount(&server)
            .await;

        let grant = adapter()
            .exchange_token(&account(&server), "acc", Some("old"))
            .await
            .unwrap();
        assert_eq!(grant.ttl, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_exchange_falls_back_to_default_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/auth/user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user_token": "usr" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/platform/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "platform_token": "opaque" })))
            .mount(&server)
            .await;

        let grant = adapter()
            .exchange_token(&account(&server), "acc", None)
            .await
            .unwrap();
        assert_eq!(grant.ttl, Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_second_hop_failure_stops_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/auth/user-token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/platform/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = adapter()
            .exchange_token(&account(&server), "acc", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::AuthRejected);
    }

    #[tokio::test]
    async fn test_wallet_balance_and_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/wallet/balance"))
            .and(header("authorization", "Bearer plt"))
            .and(header("x-user-token", "usr"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "wallet": { "available": 42.5 } })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/user/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_id": "u-7",
                "email": "punter@example.com",
                "nickname": "punter"
            })))
            .mount(&server)
            .await;

        let session = SessionTokens::new("usr", "plt");
        let account = account(&server);
        let balance = adapter().get_balance(&account, &session).await.unwrap();
        assert_eq!(balance, Decimal::from_str("42.5").unwrap());

        let profile = adapter().get_profile(&account, &session).await.unwrap();
        assert_eq!(profile.external_id, "u-7");
        assert_eq!(profile.currency, None);
    }

    #[tokio::test]
    async fn test_wallet_shape_change_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/wallet/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "wallet": { "amount": 1 } })))
            .mount(&server)
            .await;

        let err = adapter()
            .get_balance(&account(&server), &SessionTokens::new("u", "p"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::MalformedResponse);
        assert!(err.message.contains("wallet"));
    }
}
