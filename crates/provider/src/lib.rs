//! Provider-Call Adapter
//!
//! Defines the `Provider` trait: given a delegated-access token and the
//! parameters of one protected operation, perform the upstream call and return
//! a typed result or a typed failure (`RpcStatus`). The gateway never talks
//! to the provider's REST APIs directly; it goes through this boundary.
//!
//! `GoogleProvider` implements the trait against the Google Photos Library
//! and Google Calendar REST APIs.

pub mod google;
mod status;
mod types;
mod wire;

pub use google::{CALENDAR_BASE_URL, GoogleEndpoints, GoogleProvider, PHOTOS_BASE_URL};
pub use status::{RpcCode, RpcStatus};
pub use types::{
    AlbumInfo, AlbumListParams, AlbumPhotosParams, AlbumsInfo, CalendarGetParams,
    CalendarListEntry, CalendarListParams, CalendarListResponse, Notification,
    NotificationSettings, PhotoInfo, PhotosInfo, Reminder, TokenInfo,
};

use std::future::Future;
use std::pin::Pin;

/// Result alias for provider calls.
pub type Result<T> = std::result::Result<T, RpcStatus>;

/// Boxed future returned by provider calls.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Authenticated upstream calls for every protected operation.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Provider>`).
pub trait Provider: Send + Sync {
    /// Identifier for logging (e.g. "google")
    fn id(&self) -> &str;

    fn list_albums<'a>(
        &'a self,
        token: &'a TokenInfo,
        params: &'a AlbumListParams,
    ) -> ProviderFuture<'a, AlbumsInfo>;

    fn list_photos_from_album<'a>(
        &'a self,
        token: &'a TokenInfo,
        params: &'a AlbumPhotosParams,
    ) -> ProviderFuture<'a, PhotosInfo>;

    fn list_calendars<'a>(
        &'a self,
        token: &'a TokenInfo,
        params: &'a CalendarListParams,
    ) -> ProviderFuture<'a, CalendarListResponse>;

    fn get_calendar<'a>(
        &'a self,
        token: &'a TokenInfo,
        params: &'a CalendarGetParams,
    ) -> ProviderFuture<'a, CalendarListEntry>;
}
