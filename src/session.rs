use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::storage::{KeyValueState, StorageResult};

/// The single well-known key under which the current session is persisted.
pub const SESSION_KEY: &str = "currentUser";

/// Role
///
/// Authorization level of an authenticated actor. Closed set: anything else in a
/// stored record makes the whole record invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Session
///
/// The currently authenticated actor, as persisted in the key/value store.
/// A `Session` value is always complete: `decode` refuses partial records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Session {
    /// Opaque identifier assigned by the user-management collaborator.
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

impl Session {
    /// decode
    ///
    /// Parses a stored record. Fails soft: any JSON error, missing field, empty id
    /// or unknown role yields `None`. Extra fields are ignored so that a richer
    /// user record (as returned by the Resource API) still decodes.
    pub fn decode(raw: &str) -> Option<Session> {
        let session: Session = match serde_json::from_str(raw) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!("discarding undecodable session record: {}", e);
                return None;
            }
        };
        session.into_valid()
    }

    fn into_valid(self) -> Option<Session> {
        if self.id.trim().is_empty() {
            tracing::debug!("discarding session record with empty id");
            return None;
        }
        Some(self)
    }
}

/// SessionStore
///
/// Reads and writes the current `Session` under `SESSION_KEY` in a durable
/// key/value backend. This is the only place that knows where the session lives;
/// everything else receives a `Session | None` value explicitly.
#[derive(Clone)]
pub struct SessionStore {
    backend: KeyValueState,
    key: String,
}

impl SessionStore {
    pub fn new(backend: KeyValueState) -> Self {
        Self::with_key(backend, SESSION_KEY)
    }

    pub fn with_key(backend: KeyValueState, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// read
    ///
    /// Resolves the current session. Never fails: a backend error, a missing
    /// entry and a malformed record all resolve to `None`.
    pub fn read(&self) -> Option<Session> {
        match self.backend.get(&self.key) {
            Ok(Some(raw)) => Session::decode(&raw),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("session store unreadable, treating as signed out: {}", e);
                None
            }
        }
    }

    /// write
    ///
    /// Replaces any existing session with `session` in a single key overwrite.
    pub fn write(&self, session: &Session) -> StorageResult<()> {
        let raw = serde_json::to_string(session)?;
        self.backend.set(&self.key, &raw)
    }

    /// clear
    ///
    /// Removes the session. Idempotent.
    pub fn clear(&self) -> StorageResult<()> {
        self.backend.remove(&self.key)
    }
}
