//! Shared types for the gateway workspace
//!
//! Holds the pieces every crate needs but none owns: a redacting wrapper for
//! secrets pulled from the environment, and the configuration error type.

mod error;
mod secret;

pub use error::{Error, Result, require_http_url};
pub use secret::{Secret, resolve_secret};
