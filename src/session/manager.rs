use super::store::{SessionStore, StoreError};
use super::types::{CleanupOutcome, Session, SessionStats};
use crate::env;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Owner must not be empty")]
    EmptyOwner,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration for the session manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionManagerConfig {
    pub ttl_secs: u64,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            ttl_secs: env::session::DEFAULT_TTL_SECS,
        }
    }
}

/// Ticket lifecycle on top of a [`SessionStore`].
///
/// Lookups treat closed and expired sessions as absent, and every read or
/// cleanup path swallows store failures so the protocol layer only ever sees
/// `Option`/`bool` outcomes. Only `create_session` reports errors.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionManagerConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("backend", &self.store.backend_name())
            .field("config", &self.config)
            .finish()
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionManagerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    fn ttl(&self) -> Duration {
        // Clamped so `now + ttl` stays representable
        const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;
        Duration::seconds(self.config.ttl_secs.min(MAX_TTL_SECS) as i64)
    }

    /// Opaque ticket: base-36 creation millis followed by a random UUID
    pub fn generate_ticket() -> String {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        format!("{}-{}", to_base36(millis), uuid::Uuid::new_v4().simple())
    }

    /// Create an active session for `owner` and return it
    pub async fn create_session(&self, owner: &str) -> Result<Session, SessionError> {
        if owner.is_empty() {
            return Err(SessionError::EmptyOwner);
        }

        let session = Session::new(Self::generate_ticket(), owner, self.ttl());
        self.store.create(&session).await?;
        info!(
            ticket = %session.ticket,
            owner,
            expires_at = %session.expires_at,
            "Created session"
        );
        Ok(session)
    }

    /// Active, unexpired session for `ticket`. Expired sessions found here are
    /// closed on the spot since the store's own sweep may lag.
    pub async fn get_session(&self, ticket: &str) -> Option<Session> {
        if ticket.is_empty() {
            return None;
        }

        let session = match self.store.get(ticket).await {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                warn!(ticket, error = %e, "Session lookup failed");
                return None;
            }
        };

        if !session.is_active() {
            debug!(ticket, "Session is closed");
            return None;
        }

        let now = Utc::now();
        if session.is_expired_at(now) {
            info!(ticket, expires_at = %session.expires_at, "Session expired; closing");
            self.log_cleanup(ticket, "close", self.store.close(ticket, now).await);
            return None;
        }

        Some(session)
    }

    /// Refresh activity on an active session. `count_request` marks an
    /// outbound request and bumps `requests_sent`.
    pub async fn update_activity(&self, ticket: &str, count_request: bool) -> bool {
        if ticket.is_empty() {
            return false;
        }
        match self
            .store
            .update_activity(ticket, Utc::now(), count_request)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                warn!(ticket, error = %e, "Failed to update session activity");
                false
            }
        }
    }

    pub async fn close_session(&self, ticket: &str) -> CleanupOutcome {
        if ticket.is_empty() {
            return CleanupOutcome::NotFound;
        }
        let outcome = self.store.close(ticket, Utc::now()).await;
        self.log_cleanup(ticket, "close", outcome.clone());
        outcome
    }

    pub async fn delete_session(&self, ticket: &str) -> CleanupOutcome {
        if ticket.is_empty() {
            return CleanupOutcome::NotFound;
        }
        let outcome = self.store.delete(ticket).await;
        self.log_cleanup(ticket, "delete", outcome.clone());
        outcome
    }

    pub async fn validate_session(&self, ticket: &str) -> bool {
        self.get_session(ticket).await.is_some()
    }

    pub async fn session_stats(&self, ticket: &str) -> Option<SessionStats> {
        let session = self.get_session(ticket).await?;
        Some(SessionStats {
            requests_sent: session.requests_sent,
            duration_secs: (Utc::now() - session.created_at).num_seconds(),
        })
    }

    /// Remove expired sessions from the store; returns the number removed
    pub async fn cleanup_expired_sessions(&self) -> usize {
        match self.store.sweep_expired(Utc::now()).await {
            Ok(removed) => {
                info!(removed, backend = self.store.backend_name(), "Cleaned up expired sessions");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Expired session cleanup failed");
                0
            }
        }
    }

    fn log_cleanup(&self, ticket: &str, action: &str, outcome: CleanupOutcome) {
        match outcome {
            CleanupOutcome::Applied => debug!(ticket, action, "Session cleanup applied"),
            CleanupOutcome::NotFound => debug!(ticket, action, "Session not found for cleanup"),
            CleanupOutcome::Failed(reason) => {
                warn!(ticket, action, reason = %reason, "Session cleanup failed")
            }
        }
    }
}

pub(super) fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
