//! Google REST JSON shapes and their translation into RPC responses
//!
//! Every field defaults so a sparse provider payload decodes instead of
//! failing the whole page.

use serde::Deserialize;

use crate::status::RpcStatus;
use crate::types::{
    AlbumInfo, AlbumsInfo, CalendarListEntry, CalendarListResponse, Notification,
    NotificationSettings, PhotoInfo, PhotosInfo, Reminder,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct AlbumsPage {
    pub albums: Vec<Album>,
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Album {
    pub id: String,
    pub title: String,
    pub product_url: String,
    /// Google encodes this int64 as a JSON string
    pub media_items_count: String,
    pub cover_photo_base_url: String,
    pub cover_photo_media_item_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct MediaItemsPage {
    pub media_items: Vec<MediaItem>,
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct MediaItem {
    pub id: String,
    pub product_url: String,
    pub base_url: String,
    pub mime_type: String,
    pub filename: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct CalendarList {
    pub next_page_token: String,
    pub next_sync_token: String,
    pub items: Vec<CalendarEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct CalendarEntry {
    pub id: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub time_zone: String,
    pub color_id: String,
    pub background_color: String,
    pub foreground_color: String,
    pub hidden: bool,
    pub selected: bool,
    pub access_role: String,
    pub default_reminders: Vec<CalendarReminder>,
    pub notification_settings: CalendarNotificationSettings,
    pub primary: bool,
    pub deleted: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CalendarReminder {
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CalendarNotificationSettings {
    pub notifications: Vec<CalendarNotification>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CalendarNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub method: String,
}

/// `{"error": {"code": 400, "message": "..."}}`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ErrorBody {
    pub error: ErrorDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ErrorDetails {
    pub code: u16,
    pub message: String,
}

impl TryFrom<AlbumsPage> for AlbumsInfo {
    type Error = RpcStatus;

    fn try_from(page: AlbumsPage) -> Result<Self, Self::Error> {
        let albums_info = page
            .albums
            .into_iter()
            .map(|album| {
                let media_items_count = if album.media_items_count.is_empty() {
                    0
                } else {
                    album.media_items_count.parse::<i32>().map_err(|e| {
                        RpcStatus::internal(format!(
                            "album {} has invalid mediaItemsCount {:?}: {e}",
                            album.id, album.media_items_count
                        ))
                    })?
                };
                Ok(AlbumInfo {
                    id: album.id,
                    title: album.title,
                    product_url: album.product_url,
                    media_items_count,
                    cover_photo_base_url: album.cover_photo_base_url,
                    cover_photo_media_item_id: album.cover_photo_media_item_id,
                })
            })
            .collect::<Result<Vec<_>, RpcStatus>>()?;

        Ok(AlbumsInfo {
            albums_info,
            next_page_token: page.next_page_token,
        })
    }
}

impl From<MediaItemsPage> for PhotosInfo {
    fn from(page: MediaItemsPage) -> Self {
        PhotosInfo {
            photos_info: page
                .media_items
                .into_iter()
                .map(|item| PhotoInfo {
                    id: item.id,
                    product_url: item.product_url,
                    base_url: item.base_url,
                    mime_type: item.mime_type,
                    filename: item.filename,
                })
                .collect(),
            next_page_token: page.next_page_token,
        }
    }
}

impl From<CalendarEntry> for CalendarListEntry {
    fn from(entry: CalendarEntry) -> Self {
        CalendarListEntry {
            id: entry.id,
            summary: entry.summary,
            description: entry.description,
            location: entry.location,
            timezone: entry.time_zone,
            color_id: entry.color_id,
            background_color: entry.background_color,
            foreground_color: entry.foreground_color,
            hidden: entry.hidden,
            selected: entry.selected,
            access_role: entry.access_role,
            default_reminders: entry
                .default_reminders
                .into_iter()
                .map(|r| Reminder {
                    method: r.method,
                    minutes: r.minutes,
                })
                .collect(),
            notification_settings: NotificationSettings {
                notifications: entry
                    .notification_settings
                    .notifications
                    .into_iter()
                    .map(|n| Notification {
                        kind: n.kind,
                        method: n.method,
                    })
                    .collect(),
            },
            primary: entry.primary,
            deleted: entry.deleted,
        }
    }
}

impl From<CalendarList> for CalendarListResponse {
    fn from(list: CalendarList) -> Self {
        CalendarListResponse {
            next_page_token: list.next_page_token,
            next_sync_token: list.next_sync_token,
            items: list.items.into_iter().map(CalendarListEntry::from).collect(),
        }
    }
}
