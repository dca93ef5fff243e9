use super::types::{CleanupOutcome, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session {0} already exists")]
    AlreadyExists(String),
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable keyed session storage.
///
/// `create` must be create-if-absent and `update_activity` must only touch an
/// active session; each call is atomic on its own.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fails with [`StoreError::AlreadyExists`] when the ticket is taken
    async fn create(&self, session: &Session) -> Result<(), StoreError>;

    async fn get(&self, ticket: &str) -> Result<Option<Session>, StoreError>;

    /// Refresh activity of an active session; `Ok(false)` when absent or closed
    async fn update_activity(
        &self,
        ticket: &str,
        at: DateTime<Utc>,
        count_request: bool,
    ) -> Result<bool, StoreError>;

    async fn close(&self, ticket: &str, at: DateTime<Utc>) -> CleanupOutcome;

    async fn delete(&self, ticket: &str) -> CleanupOutcome;

    /// Remove sessions expired at `now`, returning how many were removed
    async fn sweep_expired(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn backend_name(&self) -> &'static str;
}

/// Process-local store backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        match self.sessions.entry(session.ticket.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(session.ticket.clone())),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, ticket: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(ticket).map(|entry| entry.value().clone()))
    }

    async fn update_activity(
        &self,
        ticket: &str,
        at: DateTime<Utc>,
        count_request: bool,
    ) -> Result<bool, StoreError> {
        // The entry guard holds the shard lock for the whole check-and-set
        Ok(self
            .sessions
            .get_mut(ticket)
            .is_some_and(|mut entry| entry.record_activity(at, count_request)))
    }

    async fn close(&self, ticket: &str, at: DateTime<Utc>) -> CleanupOutcome {
        match self.sessions.get_mut(ticket) {
            Some(mut entry) => {
                entry.close(at);
                CleanupOutcome::Applied
            }
            None => CleanupOutcome::NotFound,
        }
    }

    async fn delete(&self, ticket: &str) -> CleanupOutcome {
        match self.sessions.remove(ticket) {
            Some(_) => CleanupOutcome::Applied,
            None => CleanupOutcome::NotFound,
        }
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        debug!(removed, "Swept expired in-memory sessions");
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
