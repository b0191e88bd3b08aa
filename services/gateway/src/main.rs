//! Google Photos / Calendar gateway
//!
//! Single-binary service that:
//! 1. Fronts the Photos and Calendar list APIs with a per-session OAuth gate
//! 2. Sends unauthenticated callers to Google's consent screen (401 + URL)
//! 3. Exchanges the callback code, stores the credential in the session
//! 4. Replays the request that triggered consent

mod config;
mod error;
mod gate;
mod handlers;
mod metrics;
mod operation;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use google_auth::{FileSessionStore, MemorySessionStore, SessionStore};
use metrics_exporter_prometheus::PrometheusHandle;
use provider::GoogleProvider;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::gate::Gate;
use crate::operation::ProviderDispatch;

/// Time allowed for in-flight requests to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    gate: Arc<Gate>,
    requests_total: Arc<AtomicU64>,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

impl AppState {
    fn new(gate: Arc<Gate>, prometheus: PrometheusHandle) -> Self {
        Self {
            gate,
            requests_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
            prometheus,
        }
    }
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` caps concurrently served requests.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/authenticate", get(handlers::authenticate))
        .route("/oauth-callback", get(handlers::oauth_callback))
        .route("/photos/albumsList", get(handlers::albums_list))
        .route("/photos/album/{album_id}", get(handlers::album_photos))
        .route("/calendar/listCalendars", get(handlers::list_calendars))
        .route("/calendar/getCalendar", get(handlers::get_calendar))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs; LOG_LEVEL wins over RUST_LOG
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting google-gateway");

    // Install before anything records
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        redirect_url = %config.oauth.redirect_url,
        scopes = config.oauth.scopes.len(),
        session_store = config
            .session
            .store_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "memory".into()),
        "configuration loaded"
    );

    let store: Arc<dyn SessionStore> = match &config.session.store_path {
        Some(path) => Arc::new(
            FileSessionStore::open(path.clone())
                .await
                .with_context(|| format!("failed to open session store {}", path.display()))?,
        ),
        None => Arc::new(MemorySessionStore::new()),
    };

    let upstream_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream.timeout_secs))
        .build()
        .context("failed to build upstream HTTP client")?;
    let provider = Arc::new(GoogleProvider::new(
        upstream_client,
        config.google_endpoints(),
    ));

    let gate = Gate::new(
        config.oauth_config()?,
        reqwest::Client::new(),
        store,
        Arc::new(ProviderDispatch::new(provider)),
        config.gate_settings(),
    )
    .context("failed to build authorization gate")?;

    let app_state = AppState::new(Arc::new(gate), prometheus_handle);
    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timer starts at signal receipt, not at server start.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Liveness plus a few counters.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "requests_served": state.requests_total.load(Ordering::Relaxed),
        "pending_continuations": state.gate.pending_continuations().await,
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
