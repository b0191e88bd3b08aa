//! Request parameters and response shapes at the RPC boundary
//!
//! Responses serialize with snake_case keys, matching what REST clients of
//! the original RPC tier received.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delegated-access token handed to the provider for a single call.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Absolute expiry as unix seconds (UTC), `None` when the token never expires
    pub expiry_unix: Option<i64>,
}

impl TokenInfo {
    /// Value for the `Authorization` header, e.g. `Bearer ya29...`.
    ///
    /// An empty token type falls back to `Bearer`.
    pub fn authorization(&self) -> String {
        let scheme = if self.token_type.is_empty() {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{scheme} {}", self.access_token)
    }
}

impl fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenInfo")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expiry_unix", &self.expiry_unix)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumListParams {
    pub page_token: Option<String>,
    pub page_size: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumPhotosParams {
    pub album_id: String,
    pub page_token: Option<String>,
    pub page_size: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarListParams {
    pub page_token: Option<String>,
    pub max_results: Option<i32>,
    pub show_deleted: Option<bool>,
    pub show_hidden: Option<bool>,
    pub sync_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarGetParams {
    pub calendar_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumsInfo {
    pub albums_info: Vec<AlbumInfo>,
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumInfo {
    pub id: String,
    pub title: String,
    pub product_url: String,
    pub media_items_count: i32,
    pub cover_photo_base_url: String,
    pub cover_photo_media_item_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotosInfo {
    pub photos_info: Vec<PhotoInfo>,
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoInfo {
    pub id: String,
    pub product_url: String,
    pub base_url: String,
    pub mime_type: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarListResponse {
    pub next_page_token: String,
    pub next_sync_token: String,
    pub items: Vec<CalendarListEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarListEntry {
    pub id: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub timezone: String,
    pub color_id: String,
    pub background_color: String,
    pub foreground_color: String,
    pub hidden: bool,
    pub selected: bool,
    pub access_role: String,
    pub default_reminders: Vec<Reminder>,
    pub notification_settings: NotificationSettings,
    pub primary: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    pub method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(token_type: &str) -> TokenInfo {
        TokenInfo {
            access_token: "ya29.secret".into(),
            refresh_token: "1//refresh".into(),
            token_type: token_type.into(),
            expiry_unix: Some(1_767_225_600),
        }
    }

    #[test]
    fn authorization_header_uses_token_type() {
        assert_eq!(token("Bearer").authorization(), "Bearer ya29.secret");
        assert_eq!(token("").authorization(), "Bearer ya29.secret");
    }

    #[test]
    fn token_debug_redacts_secrets() {
        let debug = format!("{:?}", token("Bearer"));
        assert!(!debug.contains("ya29.secret"), "got: {debug}");
        assert!(!debug.contains("1//refresh"), "got: {debug}");
        assert!(debug.contains("Bearer"));
    }

    #[test]
    fn notification_kind_serializes_as_type() {
        let json = serde_json::to_value(Notification {
            kind: "eventCreation".into(),
            method: "email".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "eventCreation");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn albums_info_uses_snake_case_keys() {
        let json = serde_json::to_value(AlbumsInfo {
            albums_info: vec![AlbumInfo {
                id: "a1".into(),
                media_items_count: 3,
                ..AlbumInfo::default()
            }],
            next_page_token: "next".into(),
        })
        .unwrap();
        assert_eq!(json["next_page_token"], "next");
        assert_eq!(json["albums_info"][0]["media_items_count"], 3);
    }
}
