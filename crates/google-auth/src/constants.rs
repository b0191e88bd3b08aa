//! Google OAuth constants and session field names

/// Google's OAuth 2.0 authorization endpoint
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's token endpoint for code exchange
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Callback registered with the Google OAuth client
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:9090/oauth-callback";

/// Read-only access to the user's Photos library
pub const PHOTOS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/photoslibrary.readonly";

/// Value sent as the OAuth `state` parameter
pub const DEFAULT_STATE: &str = "state";

// Session record keys. Shared with existing session files, so they must not change.
pub const FIELD_ACCESS_TOKEN: &str = "access-token";
pub const FIELD_REFRESH_TOKEN: &str = "refresh-token";
pub const FIELD_TOKEN_TYPE: &str = "token-type";
pub const FIELD_EXPIRY: &str = "expiry";
pub const FIELD_AUTHORIZATION_CODE: &str = "oauth-code";
