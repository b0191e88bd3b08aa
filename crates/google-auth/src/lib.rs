//! Google OAuth authentication library
//!
//! Consent URL construction, authorization-code exchange, the typed
//! `CredentialSet` and its session-field encoding, and the session stores
//! that hold it. This crate has no dependency on the gateway binary.
//!
//! Credential flow:
//! 1. Gateway returns `OAuthConfig::consent_url()` to an unauthenticated caller
//! 2. User consents; Google redirects to the callback with `?code=`
//! 3. Gateway calls `token::exchange_code()` with that code
//! 4. `CredentialSet::from_token_response()` builds the typed credential
//! 5. `CredentialSet::apply_to()` writes it into a `SessionRecord`
//! 6. The record is persisted through a `SessionStore`

pub mod consent;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod session;
pub mod token;

pub use consent::OAuthConfig;
pub use constants::*;
pub use credentials::CredentialSet;
pub use error::{Error, Result};
pub use session::{
    FileSessionStore, MemorySessionStore, SessionId, SessionRecord, SessionStore, StoreFuture,
};
pub use token::{TokenResponse, exchange_code};
