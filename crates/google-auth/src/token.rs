//! Authorization code exchange
//!
//! POSTs the code Google returned on the callback to the token endpoint and
//! decodes the resulting tokens. Refresh is not performed here; an expired
//! credential sends the user back through consent.

use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::consent::OAuthConfig;
use crate::error::{Error, Result};

/// Token endpoint response.
///
/// `expires_in` is a delta in seconds from the response time; the caller
/// turns it into an absolute expiry. Absent or zero means the token carries
/// no expiry.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Only issued on the first consent for a given client + user
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Exchange an authorization code for tokens.
///
/// No deadline is applied here beyond the client's own; callers bound the
/// call with `tokio::time::timeout`.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(&config.token_endpoint)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
            ("redirect_uri", config.redirect_url.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let token = response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;

    if token.access_token.is_empty() {
        return Err(Error::TokenExchange(
            "token endpoint returned an empty access token".into(),
        ));
    }

    debug!(token_type = %token.token_type, expires_in = ?token.expires_in, "exchanged authorization code");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Form;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use common::Secret;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    /// Token endpoint that accepts only `code=good-code` with the expected client.
    async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> axum::response::Response {
        let expected = [
            ("grant_type", "authorization_code"),
            ("client_id", "client-1"),
            ("client_secret", "secret-1"),
            ("redirect_uri", "http://localhost:9090/oauth-callback"),
        ];
        let client_ok = expected
            .iter()
            .all(|(k, v)| form.get(*k).map(String::as_str) == Some(*v));

        if !client_ok || form.get("code").map(String::as_str) != Some("good-code") {
            return (
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Bad Request"}"#,
            )
                .into_response();
        }

        axum::Json(serde_json::json!({
            "access_token": "ya29.fresh",
            "refresh_token": "1//refresh",
            "token_type": "Bearer",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/photoslibrary.readonly",
        }))
        .into_response()
    }

    async fn start_token_endpoint() -> OAuthConfig {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route("/token", post(token_endpoint));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut config = OAuthConfig::google("client-1", Secret::new("secret-1".to_string()));
        config.token_endpoint = format!("http://{addr}/token");
        config
    }

    #[test]
    fn token_response_deserializes() {
        let json = r#"{"access_token":"ya29.abc","refresh_token":"1//def","token_type":"Bearer","expires_in":3600}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "ya29.abc");
        assert_eq!(token.refresh_token, "1//def");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, Some(3600));
    }

    #[test]
    fn token_response_defaults_optional_fields() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"ya29.abc"}"#).unwrap();
        assert_eq!(token.refresh_token, "");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, None);
    }

    #[test]
    fn token_response_debug_redacts_tokens() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"ya29.abc","refresh_token":"1//def"}"#).unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("ya29.abc"));
        assert!(!debug.contains("1//def"));
    }

    #[tokio::test]
    async fn exchange_code_returns_tokens() {
        let config = start_token_endpoint().await;
        let token = exchange_code(&reqwest::Client::new(), &config, "good-code")
            .await
            .unwrap();
        assert_eq!(token.access_token, "ya29.fresh");
        assert_eq!(token.refresh_token, "1//refresh");
        assert_eq!(token.expires_in, Some(3599));
    }

    #[tokio::test]
    async fn exchange_code_rejects_invalid_code() {
        let config = start_token_endpoint().await;
        let err = exchange_code(&reqwest::Client::new(), &config, "bad-code")
            .await
            .unwrap_err();
        match err {
            Error::TokenExchange(msg) => assert!(msg.contains("invalid_grant"), "{msg}"),
            other => panic!("expected TokenExchange, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exchange_code_reports_unreachable_endpoint() {
        let mut config = OAuthConfig::google("client-1", Secret::new("secret-1".to_string()));
        config.token_endpoint = "http://127.0.0.1:1/token".into();
        let err = exchange_code(&reqwest::Client::new(), &config, "good-code")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
