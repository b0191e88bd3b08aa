//! OAuth client configuration and consent URL construction

use common::Secret;
use reqwest::Url;

use crate::constants::{
    AUTHORIZE_ENDPOINT, DEFAULT_REDIRECT_URL, DEFAULT_STATE, PHOTOS_READONLY_SCOPE, TOKEN_ENDPOINT,
};
use crate::error::{Error, Result};

/// Everything needed to send a user through consent and redeem the code.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Callback URL registered with Google; must match exactly during exchange
    pub redirect_url: String,
    pub scopes: Vec<String>,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub state: String,
}

impl OAuthConfig {
    /// Config with Google's endpoints and the Photos read-only scope.
    pub fn google(client_id: impl Into<String>, client_secret: Secret<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            scopes: vec![PHOTOS_READONLY_SCOPE.to_string()],
            authorize_endpoint: AUTHORIZE_ENDPOINT.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            state: DEFAULT_STATE.to_string(),
        }
    }

    /// Build the consent URL.
    ///
    /// Requests `access_type=offline` so Google issues a refresh token
    /// alongside the access token.
    pub fn consent_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.authorize_endpoint).map_err(|e| {
            Error::InvalidEndpoint(format!("authorize endpoint {}: {e}", self.authorize_endpoint))
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", &self.state)
            .append_pair("access_type", "offline");

        Ok(url.into())
    }
}
