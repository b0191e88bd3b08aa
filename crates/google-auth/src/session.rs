//! Session identifiers, records, and stores
//!
//! A `SessionRecord` is the flat string map kept per browser session. The
//! gateway only needs two capabilities from a store, load-by-id and save, so
//! `SessionStore` is a small dyn-compatible trait with two implementations:
//!
//! - `MemorySessionStore`: process-local, lost on restart
//! - `FileSessionStore`: JSON file, atomic temp-file + rename on every save

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Opaque session identifier carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random identifier for a caller without a session cookie.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flat string fields stored for one session.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRecord {
    fields: BTreeMap<String, String>,
}

impl SessionRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: String) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// Values hold tokens; only keys are printed.
impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.fields.keys()).finish()
    }
}

/// Boxed future returned by session store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Durable per-session key/value storage.
///
/// Updates are last-writer-wins per session id.
pub trait SessionStore: Send + Sync {
    /// Load a session. An unknown id yields an empty record.
    fn load<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, SessionRecord>;

    /// Replace the stored record for `id`.
    fn save<'a>(&'a self, id: &'a SessionId, record: &'a SessionRecord) -> StoreFuture<'a, ()>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn load<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, SessionRecord> {
        Box::pin(async move {
            let sessions = self.sessions.read().await;
            Ok(sessions.get(id).cloned().unwrap_or_default())
        })
    }

    fn save<'a>(&'a self, id: &'a SessionId, record: &'a SessionRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.sessions
                .write()
                .await
                .insert(id.clone(), record.clone());
            Ok(())
        })
    }
}

/// JSON-file-backed session store.
///
/// The whole map is held in memory behind a Mutex; each save rewrites the file.
/// The file holds OAuth tokens, so it is written with 0600 permissions.
pub struct FileSessionStore {
    path: PathBuf,
    state: Mutex<HashMap<SessionId, SessionRecord>>,
}

impl FileSessionStore {
    /// Open the store at `path`, creating an empty `{}` file on cold start.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let sessions: HashMap<SessionId, SessionRecord> = serde_json::from_str(&contents)
                .map_err(|e| Error::SessionParse(format!("parsing session file: {e}")))?;
            info!(path = %path.display(), sessions = sessions.len(), "loaded sessions");
            sessions
        } else {
            info!(path = %path.display(), "session file not found, starting with empty store");
            let sessions = HashMap::new();
            write_atomic(&path, &sessions).await?;
            sessions
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionStore for FileSessionStore {
    fn load<'a>(&'a self, id: &'a SessionId) -> StoreFuture<'a, SessionRecord> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.get(id).cloned().unwrap_or_default())
        })
    }

    fn save<'a>(&'a self, id: &'a SessionId, record: &'a SessionRecord) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut next = state.clone();
            next.insert(id.clone(), record.clone());
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!(session_id = %id, fields = record.len(), "saved session");
            Ok(())
        })
    }
}

/// Write sessions to a file atomically (temp file in the same directory, then rename).
async fn write_atomic(path: &Path, data: &HashMap<SessionId, SessionRecord>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::SessionParse(format!("serializing sessions: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".sessions.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted sessions");
    Ok(())
}
