use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local};
use uuid::Uuid;

use super::session::SessionRecord;

/// Opaque identifier handed to the browser in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type SharedSession = Arc<Mutex<SessionRecord>>;

/// Lock a session record, recovering the data if a previous holder panicked.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, SessionRecord> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory map of live sessions. Each record sits behind its own mutex so one
/// respondent's slow step never blocks another's.
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, SharedSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn insert(&self, record: SessionRecord) -> (SessionId, SharedSession) {
        let id = SessionId::new();
        let shared = Arc::new(Mutex::new(record));
        self.entries().insert(id, Arc::clone(&shared));
        (id, shared)
    }

    pub fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.entries().get(id).cloned()
    }

    pub fn remove(&self, id: &SessionId) -> Option<SharedSession> {
        self.entries().remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle for longer than the TTL. Sessions currently locked by a
    /// request are kept. Returns the number of sessions removed.
    pub fn purge_idle(&self, now: DateTime<Local>) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(self.ttl) else {
            return 0;
        };
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, session| match session.try_lock() {
            Ok(record) => now.signed_duration_since(record.last_seen) <= ttl,
            Err(_) => true,
        });
        before - entries.len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<SessionId, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
