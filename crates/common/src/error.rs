//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{key} must start with http:// or https://, got: {value}")]
    InvalidUrl { key: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Reject a configured URL that has no http(s) scheme.
///
/// `key` names the config field so the message points at the offending line.
pub fn require_http_url(key: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::InvalidUrl {
            key,
            value: value.to_owned(),
        })
    }
}
