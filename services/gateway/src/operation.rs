//! Protected operations and their dispatch
//!
//! An `Operation` is the full intent of one protected request: which provider
//! call to make and with what parameters. The gate stores it while the caller
//! is away at the consent screen and replays it afterwards, so it is plain
//! data rather than a closure.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::response::Response;
use google_auth::CredentialSet;
use provider::{
    AlbumListParams, AlbumPhotosParams, CalendarGetParams, CalendarListParams, Provider, TokenInfo,
};
use tracing::debug;

use crate::error::Error;
use crate::handlers;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ListAlbums(AlbumListParams),
    ListPhotosFromAlbum(AlbumPhotosParams),
    ListCalendars(CalendarListParams),
    GetCalendar(CalendarGetParams),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ListAlbums(_) => "list_albums",
            Operation::ListPhotosFromAlbum(_) => "list_photos_from_album",
            Operation::ListCalendars(_) => "list_calendars",
            Operation::GetCalendar(_) => "get_calendar",
        }
    }

    /// `GET /photos/albumsList?pageToken=&pageSize=`
    pub fn list_albums(query: &HashMap<String, String>) -> Result<Self, Error> {
        Ok(Operation::ListAlbums(AlbumListParams {
            page_token: text(query, "pageToken"),
            page_size: int(query, "pageSize")?,
        }))
    }

    /// `GET /photos/album/{albumId}?pageToken=&pageSize=`
    pub fn list_photos_from_album(
        album_id: &str,
        query: &HashMap<String, String>,
    ) -> Result<Self, Error> {
        if !is_album_id(album_id) {
            return Err(Error::InvalidRequest(format!(
                "albumId {album_id:?} must match [-_0-9A-Za-z]+"
            )));
        }
        Ok(Operation::ListPhotosFromAlbum(AlbumPhotosParams {
            album_id: album_id.to_string(),
            page_token: text(query, "pageToken"),
            page_size: int(query, "pageSize")?,
        }))
    }

    /// `GET /calendar/listCalendars`
    pub fn list_calendars(query: &HashMap<String, String>) -> Result<Self, Error> {
        Ok(Operation::ListCalendars(CalendarListParams {
            page_token: text(query, "pageToken"),
            max_results: int(query, "maxResults")?,
            show_deleted: boolean(query, "showDeleted")?,
            show_hidden: boolean(query, "showHidden")?,
            sync_token: text(query, "syncToken"),
        }))
    }

    /// `GET /calendar/getCalendar?calendarId=`
    pub fn get_calendar(query: &HashMap<String, String>) -> Result<Self, Error> {
        let calendar_id = text(query, "calendarId")
            .ok_or_else(|| Error::InvalidRequest("calendarId is required".into()))?;
        Ok(Operation::GetCalendar(CalendarGetParams { calendar_id }))
    }
}

/// Empty values count as absent.
fn text(query: &HashMap<String, String>, key: &str) -> Option<String> {
    query.get(key).filter(|v| !v.is_empty()).cloned()
}

fn int(query: &HashMap<String, String>, key: &str) -> Result<Option<i32>, Error> {
    text(query, key)
        .map(|v| {
            v.parse::<i32>()
                .map_err(|e| Error::InvalidRequest(format!("{key}={v:?}: {e}")))
        })
        .transpose()
}

fn boolean(query: &HashMap<String, String>, key: &str) -> Result<Option<bool>, Error> {
    text(query, key)
        .map(|v| match v.as_str() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(Error::InvalidRequest(format!("{key}={v:?} is not a boolean"))),
        })
        .transpose()
}

fn is_album_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Boxed future returned by `Dispatch::dispatch`.
pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Response> + Send + 'a>>;

/// Runs an operation for a caller who holds a valid credential.
///
/// The gate only ever calls this with a credential it has checked, so
/// implementations never see unauthenticated callers.
pub trait Dispatch: Send + Sync {
    fn dispatch<'a>(
        &'a self,
        operation: &'a Operation,
        credential: &'a CredentialSet,
    ) -> DispatchFuture<'a>;
}

/// Dispatches to a `Provider` and renders the result with the business handlers.
pub struct ProviderDispatch {
    provider: Arc<dyn Provider>,
}

impl ProviderDispatch {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

impl Dispatch for ProviderDispatch {
    fn dispatch<'a>(
        &'a self,
        operation: &'a Operation,
        credential: &'a CredentialSet,
    ) -> DispatchFuture<'a> {
        Box::pin(async move {
            let token = TokenInfo::from(credential);
            debug!(
                provider = self.provider.id(),
                operation = operation.name(),
                "dispatching"
            );
            match operation {
                Operation::ListAlbums(params) => {
                    handlers::albums_response(self.provider.list_albums(&token, params).await)
                }
                Operation::ListPhotosFromAlbum(params) => handlers::photos_response(
                    self.provider.list_photos_from_album(&token, params).await,
                ),
                Operation::ListCalendars(params) => {
                    handlers::calendars_response(self.provider.list_calendars(&token, params).await)
                }
                Operation::GetCalendar(params) => {
                    handlers::calendar_response(self.provider.get_calendar(&token, params).await)
                }
            }
        })
    }
}
