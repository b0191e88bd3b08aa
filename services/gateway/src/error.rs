//! Per-request error types
//!
//! Every failure the gate or a route can produce maps to a JSON body
//! `{"error":{"type":..,"message":..}}` with a fixed status. Nothing in the
//! request path aborts the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("session store unavailable: {0}")]
    SessionStore(String),

    #[error("user declined consent")]
    ConsentDenied,

    #[error("callback carried no authorization code")]
    MissingCode,

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Stable machine-readable kind, used as the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SessionStore(_) => "session_store_unavailable",
            Error::ConsentDenied => "consent_denied",
            Error::MissingCode => "missing_code",
            Error::TokenExchange(_) => "token_exchange_failed",
            Error::InvalidRequest(_) => "invalid_request",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::SessionStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::ConsentDenied => StatusCode::FORBIDDEN,
            Error::MissingCode | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::TokenExchange(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error_response(self.status(), self.kind(), &self.to_string())
    }
}

/// JSON error body shared by every failure path.
pub fn error_response(status: StatusCode, kind: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "type": kind,
            "message": message,
        }
    });
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}
