//! Route handlers and business responses
//!
//! Route handlers parse the request into an `Operation` and hand it to the
//! gate. The `*_response` functions render a provider result once the gate
//! has let the call through; they never see unauthenticated callers.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use provider::{AlbumsInfo, CalendarListEntry, CalendarListResponse, PhotosInfo, RpcStatus};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::AppState;
use crate::error::Error;
use crate::gate::CallbackParams;
use crate::metrics;
use crate::operation::Operation;

pub fn albums_response(result: provider::Result<AlbumsInfo>) -> Response {
    render(result)
}

pub fn photos_response(result: provider::Result<PhotosInfo>) -> Response {
    render(result)
}

pub fn calendars_response(result: provider::Result<CalendarListResponse>) -> Response {
    render(result)
}

pub fn calendar_response(result: provider::Result<CalendarListEntry>) -> Response {
    render(result)
}

fn render<T: Serialize>(result: provider::Result<T>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(status) => rpc_error_response(&status),
    }
}

/// `{"rpc_error": <code>, "html_error": <status>, "code": "<message>"}` with
/// the HTTP status derived from the RPC code.
pub fn rpc_error_response(status: &RpcStatus) -> Response {
    let http = StatusCode::from_u16(status.code.http_status()).unwrap_or(StatusCode::NOT_FOUND);
    warn!(
        rpc_code = status.code.as_u32(),
        http_status = http.as_u16(),
        message = %status.message,
        "provider call failed"
    );
    (
        http,
        Json(serde_json::json!({
            "rpc_error": status.code,
            "html_error": http.as_u16(),
            "code": status.message,
        })),
    )
        .into_response()
}

#[instrument(skip_all)]
pub async fn albums_list(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    guarded(&state, "albums_list", jar, Operation::list_albums(&query)).await
}

#[instrument(skip_all, fields(album_id = %album_id))]
pub async fn album_photos(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(album_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let operation = Operation::list_photos_from_album(&album_id, &query);
    guarded(&state, "album_photos", jar, operation).await
}

#[instrument(skip_all)]
pub async fn list_calendars(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    guarded(&state, "list_calendars", jar, Operation::list_calendars(&query)).await
}

#[instrument(skip_all)]
pub async fn get_calendar(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    guarded(&state, "get_calendar", jar, Operation::get_calendar(&query)).await
}

#[instrument(skip_all)]
pub async fn authenticate(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let response = state.gate.authenticate();
    observe(&state, "authenticate", started, &response);
    response
}

#[instrument(skip_all)]
pub async fn oauth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let started = Instant::now();
    let response = state.gate.redirect_callback(jar, params).await;
    observe(&state, "oauth_callback", started, &response);
    response
}

async fn guarded(
    state: &AppState,
    route: &'static str,
    jar: CookieJar,
    operation: Result<Operation, Error>,
) -> Response {
    let started = Instant::now();
    let response = match operation {
        Ok(operation) => state.gate.guard(operation).execute(jar).await,
        Err(err) => {
            debug!(route, error = %err, "rejected request");
            err.into_response()
        }
    };
    observe(state, route, started, &response);
    response
}

fn observe(state: &AppState, route: &'static str, started: Instant, response: &Response) {
    state.requests_total.fetch_add(1, Ordering::Relaxed);
    metrics::record_request(
        route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider::{AlbumInfo, RpcCode};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_renders_snake_case_json() {
        let response = albums_response(Ok(AlbumsInfo {
            albums_info: vec![AlbumInfo {
                id: "a1".into(),
                title: "Trip".into(),
                media_items_count: 7,
                ..AlbumInfo::default()
            }],
            next_page_token: "next".into(),
        }));

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["albums_info"][0]["media_items_count"], 7);
        assert_eq!(body["next_page_token"], "next");
    }

    #[tokio::test]
    async fn rpc_failure_renders_error_body() {
        let response = calendar_response(Err(RpcStatus::new(
            RpcCode::Unauthenticated,
            "Request had invalid authentication credentials.",
        )));

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["rpc_error"], 16);
        assert_eq!(body["html_error"], 401);
        assert_eq!(
            body["code"],
            "Request had invalid authentication credentials."
        );
    }

    #[tokio::test]
    async fn unmapped_rpc_code_is_404() {
        let response = photos_response(Err(RpcStatus::internal("bad count")));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["rpc_error"], 13);
    }

    #[tokio::test]
    async fn rate_limit_maps_to_429() {
        let response = calendars_response(Err(RpcStatus::new(
            RpcCode::ResourceExhausted,
            "Quota exceeded",
        )));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
