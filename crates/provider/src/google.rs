//! Google Photos Library + Google Calendar REST client

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::status::{RpcCode, RpcStatus};
use crate::types::{
    AlbumListParams, AlbumPhotosParams, AlbumsInfo, CalendarGetParams, CalendarListEntry,
    CalendarListParams, CalendarListResponse, PhotosInfo, TokenInfo,
};
use crate::wire;
use crate::{Provider, ProviderFuture, Result};

pub const PHOTOS_BASE_URL: &str = "https://photoslibrary.googleapis.com";
pub const CALENDAR_BASE_URL: &str = "https://www.googleapis.com";

/// Base URLs for the two Google APIs. Overridable so tests can point at a local mock.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub photos_base_url: String,
    pub calendar_base_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            photos_base_url: PHOTOS_BASE_URL.to_string(),
            calendar_base_url: CALENDAR_BASE_URL.to_string(),
        }
    }
}

pub struct GoogleProvider {
    client: reqwest::Client,
    endpoints: GoogleEndpoints,
}

impl GoogleProvider {
    /// `client` carries the per-call timeout; the provider adds none of its own.
    pub fn new(client: reqwest::Client, endpoints: GoogleEndpoints) -> Self {
        Self { client, endpoints }
    }

    #[instrument(skip_all, fields(page_size = ?params.page_size))]
    async fn albums(&self, token: &TokenInfo, params: &AlbumListParams) -> Result<AlbumsInfo> {
        let url = endpoint(&self.endpoints.photos_base_url, &["v1", "albums"])?;

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(page_token) = &params.page_token {
            query.push(("pageToken", page_token.clone()));
        }
        if let Some(page_size) = params.page_size {
            query.push(("pageSize", page_size.to_string()));
        }

        let page: wire::AlbumsPage = self
            .fetch("list_albums", self.client.get(url).query(&query), token)
            .await?;
        AlbumsInfo::try_from(page)
    }

    #[instrument(skip_all, fields(album_id = %params.album_id))]
    async fn album_photos(
        &self,
        token: &TokenInfo,
        params: &AlbumPhotosParams,
    ) -> Result<PhotosInfo> {
        let url = endpoint(
            &self.endpoints.photos_base_url,
            &["v1", "mediaItems:search"],
        )?;

        let mut body = serde_json::Map::new();
        body.insert("albumId".into(), params.album_id.clone().into());
        if let Some(page_size) = params.page_size {
            body.insert("pageSize".into(), page_size.into());
        }
        if let Some(page_token) = &params.page_token {
            body.insert("pageToken".into(), page_token.clone().into());
        }

        let page: wire::MediaItemsPage = self
            .fetch(
                "list_photos_from_album",
                self.client.post(url).json(&body),
                token,
            )
            .await?;
        Ok(PhotosInfo::from(page))
    }

    #[instrument(skip_all)]
    async fn calendars(
        &self,
        token: &TokenInfo,
        params: &CalendarListParams,
    ) -> Result<CalendarListResponse> {
        let url = endpoint(
            &self.endpoints.calendar_base_url,
            &["calendar", "v3", "users", "me", "calendarList"],
        )?;

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(page_token) = &params.page_token {
            query.push(("pageToken", page_token.clone()));
        }
        if let Some(max_results) = params.max_results {
            query.push(("maxResults", max_results.to_string()));
        }
        if let Some(show_deleted) = params.show_deleted {
            query.push(("showDeleted", show_deleted.to_string()));
        }
        if let Some(show_hidden) = params.show_hidden {
            query.push(("showHidden", show_hidden.to_string()));
        }
        if let Some(sync_token) = &params.sync_token {
            query.push(("syncToken", sync_token.clone()));
        }
        debug!(params = query.len(), "listing calendars");

        let list: wire::CalendarList = self
            .fetch("list_calendars", self.client.get(url).query(&query), token)
            .await?;
        Ok(CalendarListResponse::from(list))
    }

    #[instrument(skip_all, fields(calendar_id = %params.calendar_id))]
    async fn calendar(
        &self,
        token: &TokenInfo,
        params: &CalendarGetParams,
    ) -> Result<CalendarListEntry> {
        let url = endpoint(
            &self.endpoints.calendar_base_url,
            &[
                "calendar",
                "v3",
                "users",
                "me",
                "calendarList",
                params.calendar_id.as_str(),
            ],
        )?;

        let entry: wire::CalendarEntry = self
            .fetch("get_calendar", self.client.get(url), token)
            .await?;
        Ok(CalendarListEntry::from(entry))
    }

    /// Send an authorized request and decode a 2xx JSON body.
    ///
    /// Non-2xx responses become an `RpcStatus` carrying the provider's error
    /// message; transport failures become `DeadlineExceeded` or `Unavailable`.
    async fn fetch<T: DeserializeOwned>(
        &self,
        call: &'static str,
        request: reqwest::RequestBuilder,
        token: &TokenInfo,
    ) -> Result<T> {
        let response = request
            .header(AUTHORIZATION, token.authorization())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(call, error = %e, "provider request failed");
                if e.is_timeout() {
                    RpcStatus::new(RpcCode::DeadlineExceeded, format!("{call}: {e}"))
                } else {
                    RpcStatus::new(RpcCode::Unavailable, format!("{call}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(call, status = status.as_u16(), "provider returned error status");
            return Err(error_status(status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RpcStatus::internal(format!("{call}: invalid provider response: {e}")))
    }
}

impl Provider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn list_albums<'a>(
        &'a self,
        token: &'a TokenInfo,
        params: &'a AlbumListParams,
    ) -> ProviderFuture<'a, AlbumsInfo> {
        Box::pin(self.albums(token, params))
    }

    fn list_photos_from_album<'a>(
        &'a self,
        token: &'a TokenInfo,
        params: &'a AlbumPhotosParams,
    ) -> ProviderFuture<'a, PhotosInfo> {
        Box::pin(self.album_photos(token, params))
    }

    fn list_calendars<'a>(
        &'a self,
        token: &'a TokenInfo,
        params: &'a CalendarListParams,
    ) -> ProviderFuture<'a, CalendarListResponse> {
        Box::pin(self.calendars(token, params))
    }

    fn get_calendar<'a>(
        &'a self,
        token: &'a TokenInfo,
        params: &'a CalendarGetParams,
    ) -> ProviderFuture<'a, CalendarListEntry> {
        Box::pin(self.calendar(token, params))
    }
}

/// Append percent-encoded path segments to a base URL.
fn endpoint(base: &str, segments: &[&str]) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| RpcStatus::internal(format!("invalid provider base url {base}: {e}")))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| RpcStatus::internal(format!("provider base url {base} has no path")))?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

/// Build an `RpcStatus` from a provider error body, tolerating non-JSON bodies.
fn error_status(status: u16, body: &str) -> RpcStatus {
    let parsed: wire::ErrorBody = serde_json::from_str(body).unwrap_or_default();
    // Google repeats the HTTP status in the body; trust the body when present.
    let code = match parsed.error.code {
        0 => status,
        code => code,
    };
    let message = if parsed.error.message.is_empty() {
        format!("provider returned status {status}")
    } else {
        parsed.error.message
    };
    RpcStatus::new(RpcCode::from_http_status(code), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::response::{IntoResponse, Response};
    use tokio::net::TcpListener;

    const CALENDAR_LIST_PATH: &str = "/calendar/v3/users/me/calendarList";

    fn token(access: &str) -> TokenInfo {
        TokenInfo {
            access_token: access.into(),
            refresh_token: "1//refresh".into(),
            token_type: "Bearer".into(),
            expiry_unix: Some(1_767_225_600),
        }
    }

    /// Mock of both Google APIs. Echoes what it received through the
    /// page tokens so tests can assert on query strings and bodies.
    async fn mock_google(request: Request<Body>) -> Response {
        let authorized = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some("Bearer ya29.valid");
        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                axum::Json(serde_json::json!({
                    "error": {"code": 401, "message": "Request had invalid authentication credentials."}
                })),
            )
                .into_response();
        }

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let query = request.uri().query().unwrap_or("").to_string();
        let body = axum::body::to_bytes(request.into_body(), 1024 * 1024)
            .await
            .unwrap();

        let json = match (method, path.as_str()) {
            (Method::GET, "/v1/albums") => serde_json::json!({
                "albums": [{"id": "a1", "title": "Trip", "mediaItemsCount": "7"}],
                "nextPageToken": format!("after:{query}"),
            }),
            (Method::POST, "/v1/mediaItems:search") => {
                let sent: serde_json::Value = serde_json::from_slice(&body).unwrap();
                serde_json::json!({
                    "mediaItems": [{"id": "m1", "filename": "IMG_0001.jpg", "mimeType": "image/jpeg"}],
                    "nextPageToken": sent.to_string(),
                })
            }
            (Method::GET, CALENDAR_LIST_PATH) => serde_json::json!({
                "items": [{"id": "primary", "summary": "Me", "primary": true}],
                "nextPageToken": query,
            }),
            (Method::GET, p) if p.starts_with(CALENDAR_LIST_PATH) => serde_json::json!({
                "id": p.trim_start_matches(CALENDAR_LIST_PATH).trim_start_matches('/'),
                "summary": "Holidays",
            }),
            _ => {
                return (
                    StatusCode::NOT_FOUND,
                    axum::Json(serde_json::json!({
                        "error": {"code": 404, "message": "Requested entity was not found."}
                    })),
                )
                    .into_response();
            }
        };
        axum::Json(json).into_response()
    }

    async fn start_mock() -> GoogleProvider {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, axum::Router::new().fallback(mock_google))
                .await
                .unwrap();
        });

        GoogleProvider::new(
            reqwest::Client::new(),
            GoogleEndpoints {
                photos_base_url: url.clone(),
                calendar_base_url: url,
            },
        )
    }

    #[tokio::test]
    async fn list_albums_forwards_paging_and_converts() {
        let provider = start_mock().await;
        let params = AlbumListParams {
            page_token: Some("tok-1".into()),
            page_size: Some(25),
        };

        let albums = provider
            .list_albums(&token("ya29.valid"), &params)
            .await
            .unwrap();

        assert_eq!(albums.albums_info.len(), 1);
        assert_eq!(albums.albums_info[0].media_items_count, 7);
        assert_eq!(albums.next_page_token, "after:pageToken=tok-1&pageSize=25");
    }

    #[tokio::test]
    async fn list_albums_without_paging_sends_no_query() {
        let provider = start_mock().await;
        let albums = provider
            .list_albums(&token("ya29.valid"), &AlbumListParams::default())
            .await
            .unwrap();
        assert_eq!(albums.next_page_token, "after:");
    }

    #[tokio::test]
    async fn photos_search_posts_album_body() {
        let provider = start_mock().await;
        let params = AlbumPhotosParams {
            album_id: "a1".into(),
            page_token: None,
            page_size: Some(50),
        };

        let photos = provider
            .list_photos_from_album(&token("ya29.valid"), &params)
            .await
            .unwrap();

        assert_eq!(photos.photos_info[0].filename, "IMG_0001.jpg");
        assert_eq!(photos.next_page_token, r#"{"albumId":"a1","pageSize":50}"#);
    }

    #[tokio::test]
    async fn calendar_list_sends_only_set_params() {
        let provider = start_mock().await;
        let params = CalendarListParams {
            show_hidden: Some(true),
            max_results: Some(10),
            ..CalendarListParams::default()
        };

        let list = provider
            .list_calendars(&token("ya29.valid"), &params)
            .await
            .unwrap();

        assert!(list.items[0].primary);
        assert_eq!(list.next_page_token, "maxResults=10&showHidden=true");
    }

    #[tokio::test]
    async fn calendar_get_encodes_calendar_id() {
        let provider = start_mock().await;
        let params = CalendarGetParams {
            calendar_id: "en.usa#holiday@group.v.calendar.google.com".into(),
        };

        let entry = provider
            .get_calendar(&token("ya29.valid"), &params)
            .await
            .unwrap();

        assert_eq!(entry.summary, "Holidays");
        assert_eq!(entry.id, "en.usa%23holiday@group.v.calendar.google.com");
    }

    #[tokio::test]
    async fn rejected_token_maps_to_unauthenticated() {
        let provider = start_mock().await;
        let err = provider
            .list_albums(&token("ya29.expired"), &AlbumListParams::default())
            .await
            .unwrap_err();

        assert_eq!(err.code, RpcCode::Unauthenticated);
        assert_eq!(
            err.message,
            "Request had invalid authentication credentials."
        );
    }

    #[tokio::test]
    async fn dead_upstream_maps_to_unavailable() {
        let provider = GoogleProvider::new(
            reqwest::Client::new(),
            GoogleEndpoints {
                photos_base_url: "http://127.0.0.1:1".into(),
                calendar_base_url: "http://127.0.0.1:1".into(),
            },
        );

        let err = provider
            .list_albums(&token("ya29.valid"), &AlbumListParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, RpcCode::Unavailable);
    }

    #[test]
    fn error_status_tolerates_plain_text() {
        let status = error_status(502, "<html>bad gateway</html>");
        assert_eq!(status.code, RpcCode::Unavailable);
        assert_eq!(status.message, "provider returned status 502");
    }

    #[test]
    fn endpoint_joins_segments_onto_base_path() {
        let url = endpoint("http://127.0.0.1:9/prefix/", &["v1", "albums"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/prefix/v1/albums");
    }
}
