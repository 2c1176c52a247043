//! Shared HTTP handling for platform adapters
//!
//! Adapters build their own requests; sending, status classification,
//! logging and JSON decoding are shared here.

use super::adapter::PlatformResult;
use crate::error::PlatformError;
use crate::types::{Account, PlatformFamily};
use crate::utils::truncate_for_log;
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Successful upstream reply
#[derive(Debug, Clone)]
pub struct HttpReply {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: String,
}

impl HttpReply {
    /// First `Set-Cookie` pair (`name=value`), without attributes
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .map(str::trim)
            .find(|pair| pair.contains('=') && !pair.ends_with('='))
            .map(str::to_string)
    }
}

/// HTTP tool function set
pub struct HttpUtils;

impl HttpUtils {
    /// Send a request and classify the outcome
    ///
    /// * 2xx: returned as [`HttpReply`]
    /// * 401/403: `authRejected`
    /// * 429, 5xx, timeouts, connect failures: `network`
    /// * anything else: `malformedResponse`
    pub async fn execute(
        request: RequestBuilder,
        family: PlatformFamily,
        step: &str,
    ) -> PlatformResult<HttpReply> {
        tracing::debug!(%family, step, "Sending platform request");

        let response = request.send().await.map_err(|e| {
            let detail = if e.is_timeout() {
                format!("{} timed out: {}", step, e)
            } else if e.is_connect() {
                format!("{} could not connect: {}", step, e)
            } else {
                format!("{} failed: {}", step, e)
            };
            PlatformError::network(family, detail)
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| {
            PlatformError::network(family, format!("{}: failed to read response body: {}", step, e))
        })?;

        tracing::debug!(
            %family,
            step,
            status = status.as_u16(),
            "Platform response: {}",
            truncate_for_log(&body)
        );

        classify_status(status, family, step, &body)?;

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }

    /// Decode a JSON body, naming the offending path on failure
    pub fn parse_json<T>(body: &str, family: PlatformFamily, step: &str) -> PlatformResult<T>
    where
        T: DeserializeOwned,
    {
        let deserializer = &mut serde_json::Deserializer::from_str(body);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            tracing::warn!(%family, step, "Undecodable response: {}", truncate_for_log(body));
            let path = e.path().to_string();
            PlatformError::malformed(
                family,
                format!("{}: invalid response at '{}': {}", step, path, e.inner()),
            )
        })
    }

    /// Resolve an endpoint path against the account's site URL
    pub fn endpoint(account: &Account, family: PlatformFamily, path: &str) -> PlatformResult<Url> {
        let base = Url::parse(&account.site_url).map_err(|e| {
            PlatformError::malformed(family, format!("invalid site url '{}': {}", account.site_url, e))
        })?;
        base.join(path).map_err(|e| {
            PlatformError::malformed(family, format!("invalid endpoint '{}': {}", path, e))
        })
    }
}

fn classify_status(
    status: StatusCode,
    family: PlatformFamily,
    step: &str,
    body: &str,
) -> PlatformResult<()> {
    if status.is_success() {
        return Ok(());
    }

    let detail = format!("{}: HTTP {}: {}", step, status.as_u16(), truncate_for_log(body));
    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PlatformError::auth_rejected(family, detail),
        StatusCode::TOO_MANY_REQUESTS => PlatformError::network(family, detail),
        s if s.is_server_error() => PlatformError::network(family, detail),
        _ => PlatformError::malformed(family, detail),
    };
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformErrorKind;
    use crate::types::Credentials;
    use reqwest::header::HeaderValue;
    use rstest::rstest;
    use serde::Deserialize;

    const FAMILY: PlatformFamily = PlatformFamily::SessionCookie;

    #[rstest]
    #[case(200, None)]
    #[case(204, None)]
    #[case(401, Some(PlatformErrorKind::AuthRejected))]
    #[case(403, Some(PlatformErrorKind::AuthRejected))]
    #[case(429, Some(PlatformErrorKind::Network))]
    #[case(500, Some(PlatformErrorKind::Network))]
    #[case(503, Some(PlatformErrorKind::Network))]
    #[case(404, Some(PlatformErrorKind::MalformedResponse))]
    #[case(302, Some(PlatformErrorKind::MalformedResponse))]
    fn test_classify_status(#[case] status: u16, #[case] expected: Option<PlatformErrorKind>) {
        let status = StatusCode::from_u16(status).unwrap();
        let result = classify_status(status, FAMILY, "login", "body");
        assert_eq!(result.err().map(|e| e.kind), expected);
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct LoginBody {
        data: LoginData,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct LoginData {
        token: String,
    }

    #[test]
    fn test_parse_json_names_path() {
        let err = HttpUtils::parse_json::<LoginBody>(r#"{"data":{"tok":"x"}}"#, FAMILY, "login")
            .unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::MalformedResponse);
        assert!(err.message.contains("data"), "message: {}", err.message);
        assert!(err.message.contains("token"));
    }

    #[test]
    fn test_parse_json_rejects_non_json() {
        let err = HttpUtils::parse_json::<LoginBody>("<html>", FAMILY, "login").unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::MalformedResponse);
    }

    #[test]
    fn test_endpoint_join() {
        let account = Account::new(
            "1",
            FAMILY,
            "https://book.example/",
            Credentials::new("a", "b"),
        );
        let url = HttpUtils::endpoint(&account, FAMILY, "/api/auth/login").unwrap();
        assert_eq!(url.as_str(), "https://book.example/api/auth/login");

        let broken = Account::new("2", FAMILY, "not a url", Credentials::new("a", "b"));
        assert!(HttpUtils::endpoint(&broken, FAMILY, "/x").is_err());
    }

    #[test]
    fn test_session_cookie_extraction() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("tracking=; Path=/"));
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("sid=abc123; Path=/; HttpOnly; Secure"),
        );

        let reply = HttpReply {
            status: StatusCode::OK,
            headers,
            body: String::new(),
        };
        assert_eq!(reply.session_cookie().as_deref(), Some("sid=abc123"));
    }

    #[test]
    fn test_missing_session_cookie() {
        let reply = HttpReply {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: String::new(),
        };
        assert_eq!(reply.session_cookie(), None);
    }
}
