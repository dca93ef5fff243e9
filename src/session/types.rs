use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Closed,
}

/// One Web Connector conversation, keyed by its ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub ticket: String,
    pub owner: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub requests_sent: u32,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(ticket: impl Into<String>, owner: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            ticket: ticket.into(),
            owner: owner.into(),
            status: SessionStatus::Active,
            created_at: now,
            last_activity_at: now,
            requests_sent: 0,
            expires_at: now + ttl,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Apply an activity update; returns false when the session is not active
    pub fn record_activity(&mut self, at: DateTime<Utc>, count_request: bool) -> bool {
        if !self.is_active() {
            return false;
        }
        self.last_activity_at = at;
        if count_request {
            self.requests_sent = self.requests_sent.saturating_add(1);
        }
        true
    }

    pub fn close(&mut self, at: DateTime<Utc>) {
        self.status = SessionStatus::Closed;
        self.last_activity_at = at;
    }
}

/// Result of a best-effort cleanup operation; callers may ignore it
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "cleanup outcomes report whether the store applied the change"]
pub enum CleanupOutcome {
    Applied,
    NotFound,
    Failed(String),
}

impl CleanupOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CleanupOutcome::Applied)
    }
}

/// Usage figures for an active session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub requests_sent: u32,
    pub duration_secs: i64,
}
