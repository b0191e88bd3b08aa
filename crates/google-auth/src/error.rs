//! Error types for OAuth and session operations

/// Errors from OAuth and session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("session record missing field `{0}`")]
    MissingField(&'static str),

    #[error("session field `{field}` is invalid: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("session parse error: {0}")]
    SessionParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
