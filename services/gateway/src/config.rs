//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The OAuth client secret comes from `GOOGLE_API_SECRET` or
//! `oauth.client_secret_file`, never from the TOML itself.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::{Secret, require_http_url, resolve_secret};
use google_auth::{
    AUTHORIZE_ENDPOINT, DEFAULT_REDIRECT_URL, DEFAULT_STATE, OAuthConfig, PHOTOS_READONLY_SCOPE,
    TOKEN_ENDPOINT,
};
use provider::{CALENDAR_BASE_URL, GoogleEndpoints, PHOTOS_BASE_URL};
use serde::Deserialize;

use crate::gate::GateSettings;

pub const CLIENT_ID_ENV: &str = "GOOGLE_API_ID";
pub const CLIENT_SECRET_ENV: &str = "GOOGLE_API_SECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Deserialize)]
pub struct OAuthSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// File holding the client secret (alternative to GOOGLE_API_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_authorize_endpoint")]
    pub authorize_endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_exchange_timeout")]
    pub exchange_timeout_secs: u64,
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: u64,
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub secure_cookie: bool,
    /// When unset, sessions live in memory only
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure_cookie: false,
            store_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_photos_base_url")]
    pub photos_base_url: String,
    #[serde(default = "default_calendar_base_url")]
    pub calendar_base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            photos_base_url: default_photos_base_url(),
            calendar_base_url: default_calendar_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_redirect_url() -> String {
    DEFAULT_REDIRECT_URL.to_string()
}

fn default_scopes() -> Vec<String> {
    vec![PHOTOS_READONLY_SCOPE.to_string()]
}

fn default_authorize_endpoint() -> String {
    AUTHORIZE_ENDPOINT.to_string()
}

fn default_token_endpoint() -> String {
    TOKEN_ENDPOINT.to_string()
}

fn default_state() -> String {
    DEFAULT_STATE.to_string()
}

fn default_exchange_timeout() -> u64 {
    10
}

fn default_pending_ttl() -> u64 {
    600
}

fn default_max_pending() -> usize {
    10_000
}

fn default_cookie_name() -> String {
    "session-key".to_string()
}

fn default_photos_base_url() -> String {
    PHOTOS_BASE_URL.to_string()
}

fn default_calendar_base_url() -> String {
    CALENDAR_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. GOOGLE_API_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(client_id) = std::env::var(CLIENT_ID_ENV) {
            if !client_id.is_empty() {
                config.oauth.client_id = client_id;
            }
        }
        config.oauth.client_secret = resolve_secret(
            CLIENT_SECRET_ENV,
            config.oauth.client_secret_file.as_deref(),
        )?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "server.max_connections must be greater than 0".into(),
            ));
        }

        if self.oauth.client_id.is_empty() {
            return Err(common::Error::Config(format!(
                "oauth.client_id is empty; set it in the config file or {CLIENT_ID_ENV}"
            )));
        }
        if self.oauth.client_secret.is_none() {
            return Err(common::Error::Config(format!(
                "OAuth client secret missing; set {CLIENT_SECRET_ENV} or oauth.client_secret_file"
            )));
        }
        if self.oauth.scopes.is_empty() {
            return Err(common::Error::Config(
                "oauth.scopes must name at least one scope".into(),
            ));
        }

        require_http_url("oauth.redirect_url", &self.oauth.redirect_url)?;
        require_http_url("oauth.authorize_endpoint", &self.oauth.authorize_endpoint)?;
        require_http_url("oauth.token_endpoint", &self.oauth.token_endpoint)?;
        require_http_url("upstream.photos_base_url", &self.upstream.photos_base_url)?;
        require_http_url("upstream.calendar_base_url", &self.upstream.calendar_base_url)?;

        for (key, value) in [
            ("oauth.exchange_timeout_secs", self.oauth.exchange_timeout_secs),
            ("oauth.pending_ttl_secs", self.oauth.pending_ttl_secs),
            ("upstream.timeout_secs", self.upstream.timeout_secs),
        ] {
            if value == 0 {
                return Err(common::Error::Config(format!(
                    "{key} must be greater than 0"
                )));
            }
        }

        if self.oauth.max_pending == 0 {
            return Err(common::Error::Config(
                "oauth.max_pending must be greater than 0".into(),
            ));
        }

        if self.session.cookie_name.is_empty() {
            return Err(common::Error::Config(
                "session.cookie_name must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// OAuth client settings for the gate.
    pub fn oauth_config(&self) -> common::Result<OAuthConfig> {
        let client_secret = self.oauth.client_secret.clone().ok_or_else(|| {
            common::Error::Config(format!("OAuth client secret missing; set {CLIENT_SECRET_ENV}"))
        })?;

        Ok(OAuthConfig {
            client_id: self.oauth.client_id.clone(),
            client_secret,
            redirect_url: self.oauth.redirect_url.clone(),
            scopes: self.oauth.scopes.clone(),
            authorize_endpoint: self.oauth.authorize_endpoint.clone(),
            token_endpoint: self.oauth.token_endpoint.clone(),
            state: self.oauth.state.clone(),
        })
    }

    pub fn gate_settings(&self) -> GateSettings {
        GateSettings {
            cookie_name: self.session.cookie_name.clone(),
            secure_cookie: self.session.secure_cookie,
            exchange_timeout: Duration::from_secs(self.oauth.exchange_timeout_secs),
            pending_ttl: Duration::from_secs(self.oauth.pending_ttl_secs),
            max_pending: self.oauth.max_pending,
        }
    }

    pub fn google_endpoints(&self) -> GoogleEndpoints {
        GoogleEndpoints {
            photos_base_url: self.upstream.photos_base_url.clone(),
            calendar_base_url: self.upstream.calendar_base_url.clone(),
        }
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("gateway.toml")
    }
}
