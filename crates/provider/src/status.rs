//! Typed failure crossing the RPC boundary
//!
//! Codes follow the gRPC numbering so the JSON error body the gateway emits
//! (`rpc_error`) stays compatible with clients of the original RPC tier.

use serde::{Serialize, Serializer};

/// RPC status codes (gRPC numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    PermissionDenied,
    ResourceExhausted,
    Internal,
    Unavailable,
    Unauthenticated,
}

impl RpcCode {
    pub fn as_u32(self) -> u32 {
        match self {
            RpcCode::Cancelled => 1,
            RpcCode::Unknown => 2,
            RpcCode::InvalidArgument => 3,
            RpcCode::DeadlineExceeded => 4,
            RpcCode::NotFound => 5,
            RpcCode::PermissionDenied => 7,
            RpcCode::ResourceExhausted => 8,
            RpcCode::Internal => 13,
            RpcCode::Unavailable => 14,
            RpcCode::Unauthenticated => 16,
        }
    }

    /// Classify an upstream HTTP status into an RPC code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => RpcCode::InvalidArgument,
            401 => RpcCode::Unauthenticated,
            403 => RpcCode::PermissionDenied,
            404 => RpcCode::NotFound,
            429 => RpcCode::ResourceExhausted,
            499 => RpcCode::Cancelled,
            500 => RpcCode::Internal,
            502..=504 => RpcCode::Unavailable,
            _ => RpcCode::Unknown,
        }
    }

    /// HTTP status the REST tier answers with for this code.
    ///
    /// Anything without a closer match is reported as 404.
    pub fn http_status(self) -> u16 {
        match self {
            RpcCode::InvalidArgument => 400,
            RpcCode::Unauthenticated => 401,
            RpcCode::PermissionDenied => 403,
            RpcCode::ResourceExhausted => 429,
            RpcCode::Unavailable => 503,
            RpcCode::DeadlineExceeded => 504,
            _ => 404,
        }
    }
}

impl Serialize for RpcCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_u32())
    }
}

/// Failure returned by a provider call: a code plus a human readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_classification() {
        assert_eq!(RpcCode::from_http_status(400), RpcCode::InvalidArgument);
        assert_eq!(RpcCode::from_http_status(401), RpcCode::Unauthenticated);
        assert_eq!(RpcCode::from_http_status(403), RpcCode::PermissionDenied);
        assert_eq!(RpcCode::from_http_status(404), RpcCode::NotFound);
        assert_eq!(RpcCode::from_http_status(429), RpcCode::ResourceExhausted);
        assert_eq!(RpcCode::from_http_status(503), RpcCode::Unavailable);
        assert_eq!(RpcCode::from_http_status(418), RpcCode::Unknown);
    }

    #[test]
    fn rest_status_falls_back_to_not_found() {
        assert_eq!(RpcCode::InvalidArgument.http_status(), 400);
        assert_eq!(RpcCode::Unavailable.http_status(), 503);
        assert_eq!(RpcCode::DeadlineExceeded.http_status(), 504);
        assert_eq!(RpcCode::NotFound.http_status(), 404);
        assert_eq!(RpcCode::Internal.http_status(), 404);
        assert_eq!(RpcCode::Unknown.http_status(), 404);
    }

    #[test]
    fn code_serializes_as_number() {
        let json = serde_json::to_string(&RpcCode::InvalidArgument).unwrap();
        assert_eq!(json, "3");
        let json = serde_json::to_string(&RpcCode::Unauthenticated).unwrap();
        assert_eq!(json, "16");
    }

    #[test]
    fn status_display_includes_message() {
        let status = RpcStatus::new(RpcCode::NotFound, "album not found");
        assert_eq!(status.to_string(), "NotFound: album not found");
    }
}
