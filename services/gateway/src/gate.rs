//! Authorization gate
//!
//! Single checkpoint in front of every protected route. A request whose
//! session holds a valid credential is dispatched inline. Otherwise the
//! request's `Operation` is parked under the caller's session id, the caller
//! gets a 401 carrying the consent URL, and when Google redirects back to the
//! callback the parked operation is replayed with the freshly exchanged
//! credential.
//!
//! Per session:
//!
//! ```text
//! IDLE --(no credential)--------------------> AWAITING_CALLBACK
//! IDLE --(credential present)---------------> IDLE (dispatched inline)
//! AWAITING_CALLBACK --(code + exchange ok)--> IDLE (operation replayed)
//! AWAITING_CALLBACK --(denied / no code /
//!                      exchange failure)----> IDLE (operation dropped)
//! ```
//!
//! Parked operations are keyed by session id, so concurrent consent flows
//! from different browsers never see each other's state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use google_auth::{
    CredentialSet, OAuthConfig, SessionId, SessionRecord, SessionStore, exchange_code,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::error::Error;
use crate::metrics::{GateOutcome, record_gate_outcome};
use crate::operation::{Dispatch, Operation};

/// Session-cookie and timing knobs for the gate.
#[derive(Debug, Clone)]
pub struct GateSettings {
    pub cookie_name: String,
    pub secure_cookie: bool,
    /// Upper bound on the code-for-token exchange
    pub exchange_timeout: Duration,
    /// Parked operations older than this are never replayed
    pub pending_ttl: Duration,
    /// Most operations parked at once; the oldest is evicted beyond this
    pub max_pending: usize,
}

/// Query parameters Google sends to the callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error_reason: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    fn consent_denied(&self) -> bool {
        self.error_reason.as_deref() == Some("user_denied")
            || self.error.as_deref() == Some("access_denied")
    }
}

struct PendingContinuation {
    operation: Operation,
    created_at: Instant,
}

pub struct Gate {
    oauth: OAuthConfig,
    consent_url: String,
    client: reqwest::Client,
    store: Arc<dyn SessionStore>,
    dispatcher: Arc<dyn Dispatch>,
    pending: Mutex<HashMap<SessionId, PendingContinuation>>,
    settings: GateSettings,
}

/// A protected operation bound to a gate, ready to run against a caller's cookies.
pub struct Guarded<'a> {
    gate: &'a Gate,
    operation: Operation,
}

impl Gate {
    /// Fails only if the configured authorize endpoint is not a URL.
    pub fn new(
        oauth: OAuthConfig,
        client: reqwest::Client,
        store: Arc<dyn SessionStore>,
        dispatcher: Arc<dyn Dispatch>,
        settings: GateSettings,
    ) -> google_auth::Result<Self> {
        let consent_url = oauth.consent_url()?;
        Ok(Self {
            oauth,
            consent_url,
            client,
            store,
            dispatcher,
            pending: Mutex::new(HashMap::new()),
            settings,
        })
    }

    /// Wrap an operation so it only runs for authenticated callers.
    ///
    /// Nothing happens until `Guarded::execute`.
    pub fn guard(&self, operation: Operation) -> Guarded<'_> {
        Guarded {
            gate: self,
            operation,
        }
    }

    /// 401 with `{"url": "<consent url>"}`. The client navigates there itself.
    pub fn authenticate(&self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "url": self.consent_url })),
        )
            .into_response()
    }

    /// Handle Google's redirect back after consent.
    #[instrument(skip_all)]
    pub async fn redirect_callback(&self, jar: CookieJar, params: CallbackParams) -> Response {
        let (jar, session_id) = self.session(jar);

        let Some(code) = params.code.clone().filter(|c| !c.is_empty()) else {
            let dropped = self.take_pending(&session_id).await;
            let err = if params.consent_denied() {
                warn!(
                    session_id = %session_id,
                    dropped = dropped.as_ref().map(Operation::name),
                    "user declined consent"
                );
                record_gate_outcome(GateOutcome::ConsentDenied);
                Error::ConsentDenied
            } else {
                warn!(
                    session_id = %session_id,
                    error = ?params.error,
                    dropped = dropped.as_ref().map(Operation::name),
                    "callback without authorization code"
                );
                record_gate_outcome(GateOutcome::MissingCode);
                Error::MissingCode
            };
            return (jar, err).into_response();
        };

        let credential = match self.exchange(&code).await {
            Ok(credential) => credential,
            Err(err) => {
                let dropped = self.take_pending(&session_id).await;
                error!(
                    session_id = %session_id,
                    error = %err,
                    dropped = dropped.as_ref().map(Operation::name),
                    "authorization code exchange failed"
                );
                record_gate_outcome(GateOutcome::ExchangeFailed);
                return (jar, err).into_response();
            }
        };

        self.persist(&session_id, &credential).await;

        match self.take_pending(&session_id).await {
            Some(operation) => {
                info!(session_id = %session_id, operation = operation.name(), "resuming after consent");
                record_gate_outcome(GateOutcome::Resumed);
                let response = self.dispatcher.dispatch(&operation, &credential).await;
                (jar, response).into_response()
            }
            None => {
                info!(session_id = %session_id, "authenticated with nothing to resume");
                record_gate_outcome(GateOutcome::Authenticated);
                (
                    jar,
                    Json(serde_json::json!({ "status": "authenticated" })),
                )
                    .into_response()
            }
        }
    }

    /// Number of operations currently parked awaiting a callback.
    pub async fn pending_continuations(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Session id from the cookie, or a fresh one with a cookie added to the jar.
    fn session(&self, jar: CookieJar) -> (CookieJar, SessionId) {
        let existing = jar
            .get(&self.settings.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());
        if let Some(value) = existing {
            return (jar, SessionId::from(value));
        }

        let id = SessionId::generate();
        let cookie = Cookie::build((self.settings.cookie_name.clone(), id.to_string()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.settings.secure_cookie);
        debug!(session_id = %id, "issued session cookie");
        (jar.add(cookie), id)
    }

    async fn exchange(&self, code: &str) -> Result<CredentialSet, Error> {
        let token = tokio::time::timeout(
            self.settings.exchange_timeout,
            exchange_code(&self.client, &self.oauth, code),
        )
        .await
        .map_err(|_| {
            Error::TokenExchange(format!(
                "token endpoint timed out after {}s",
                self.settings.exchange_timeout.as_secs_f64()
            ))
        })?
        .map_err(|e| Error::TokenExchange(e.to_string()))?;

        CredentialSet::from_token_response(&token, code, OffsetDateTime::now_utc())
            .map_err(|e| Error::TokenExchange(e.to_string()))
    }

    /// Write the credential into the session. Failure is logged, never returned:
    /// the caller still gets the replayed operation, it just won't be remembered.
    async fn persist(&self, session_id: &SessionId, credential: &CredentialSet) {
        let mut record = match self.store.load(session_id).await {
            Ok(record) => record,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "loading session for credential write failed");
                record_gate_outcome(GateOutcome::PersistFailed);
                return;
            }
        };

        let saved = match credential.apply_to(&mut record) {
            Ok(()) => self.store.save(session_id, &record).await,
            Err(e) => Err(e),
        };
        match saved {
            Ok(()) => debug!(session_id = %session_id, "stored credential"),
            Err(e) => {
                error!(session_id = %session_id, error = %e, "storing credential failed");
                record_gate_outcome(GateOutcome::PersistFailed);
            }
        }
    }

    /// Park an operation for a session, replacing any earlier one for the same session.
    async fn suspend(&self, session_id: SessionId, operation: Operation) {
        let mut pending = self.pending.lock().await;
        let ttl = self.settings.pending_ttl;
        pending.retain(|_, p| p.created_at.elapsed() <= ttl);

        if !pending.contains_key(&session_id) && pending.len() >= self.settings.max_pending {
            let oldest = pending
                .iter()
                .min_by_key(|(_, p)| p.created_at)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest.and_then(|id| pending.remove_entry(&id)) {
                warn!(
                    session_id = %oldest.0,
                    operation = oldest.1.operation.name(),
                    max_pending = self.settings.max_pending,
                    "pending operations at capacity, evicted oldest"
                );
            }
        }

        let name = operation.name();
        let previous = pending.insert(
            session_id.clone(),
            PendingContinuation {
                operation,
                created_at: Instant::now(),
            },
        );
        if let Some(previous) = previous {
            info!(
                session_id = %session_id,
                replaced = previous.operation.name(),
                operation = name,
                "replaced pending operation"
            );
        }
    }

    /// Remove and return a session's parked operation unless it has expired.
    async fn take_pending(&self, session_id: &SessionId) -> Option<Operation> {
        let entry = self.pending.lock().await.remove(session_id)?;
        if entry.created_at.elapsed() > self.settings.pending_ttl {
            debug!(session_id = %session_id, operation = entry.operation.name(), "discarding expired pending operation");
            return None;
        }
        Some(entry.operation)
    }
}

impl Guarded<'_> {
    /// Dispatch if the session holds a usable credential, otherwise park the
    /// operation and answer with the consent response.
    #[instrument(skip_all, fields(operation = self.operation.name()))]
    pub async fn execute(self, jar: CookieJar) -> Response {
        let gate = self.gate;
        let (jar, session_id) = gate.session(jar);

        let record = match gate.store.load(&session_id).await {
            Ok(record) => record,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "session store lookup failed");
                record_gate_outcome(GateOutcome::SessionStoreError);
                return (jar, Error::SessionStore(e.to_string())).into_response();
            }
        };

        match usable_credential(&session_id, &record) {
            Some(credential) => {
                record_gate_outcome(GateOutcome::PassThrough);
                let response = gate.dispatcher.dispatch(&self.operation, &credential).await;
                (jar, response).into_response()
            }
            None => {
                debug!(session_id = %session_id, "no usable credential, consent required");
                record_gate_outcome(GateOutcome::ConsentRequired);
                gate.suspend(session_id, self.operation).await;
                (jar, gate.authenticate()).into_response()
            }
        }
    }
}

/// A credential that is complete and unexpired, if the record holds one.
fn usable_credential(session_id: &SessionId, record: &SessionRecord) -> Option<CredentialSet> {
    match CredentialSet::from_record(record) {
        Ok(Some(credential)) if credential.is_expired(OffsetDateTime::now_utc()) => {
            info!(session_id = %session_id, expiry = ?credential.expiry, "stored credential expired");
            None
        }
        Ok(credential) => credential,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "session holds an unusable credential");
            None
        }
    }
}
