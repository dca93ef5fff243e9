use super::store::{SessionStore, StoreError};
use super::types::{CleanupOutcome, Session};
use crate::env;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One JSON document per ticket under a sessions directory.
///
/// Mutations are serialized through a single lock and land via temp file plus
/// rename, so readers never observe a partially written session.
#[derive(Debug)]
pub struct FileSessionStore {
    sessions_dir: PathBuf,
    temp_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let sessions_dir = sessions_dir.into();
        let temp_dir = sessions_dir.join(env::session::TEMP_DIR_NAME);
        for dir in [&sessions_dir, &temp_dir] {
            std::fs::create_dir_all(dir)?;
        }
        info!(path = %sessions_dir.display(), "Opened file session store");

        Ok(Self {
            sessions_dir,
            temp_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Tickets come from the client; anything outside the generated alphabet
    /// cannot name a stored session.
    fn is_valid_ticket(ticket: &str) -> bool {
        !ticket.is_empty()
            && ticket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    fn path_for(&self, ticket: &str) -> Option<PathBuf> {
        Self::is_valid_ticket(ticket).then(|| env::session_file_path(&self.sessions_dir, ticket))
    }

    async fn read_session(path: &Path) -> Result<Option<Session>, StoreError> {
        match async_fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fully write `session` to a fresh temp file and return its path
    async fn write_temp(&self, session: &Session) -> Result<PathBuf, StoreError> {
        let serialized = serde_json::to_vec_pretty(session)?;
        let temp_path = self
            .temp_dir
            .join(format!("{}.{}.tmp", session.ticket, uuid::Uuid::new_v4().simple()));

        let mut file = async_fs::File::create(&temp_path).await?;
        file.write_all(&serialized).await?;
        file.sync_all().await?;
        Ok(temp_path)
    }

    async fn write_session(&self, path: &Path, session: &Session) -> Result<(), StoreError> {
        let temp_path = self.write_temp(session).await?;
        if let Err(e) = async_fs::rename(&temp_path, path).await {
            let _ = async_fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        let path = self
            .path_for(&session.ticket)
            .ok_or_else(|| StoreError::Unavailable(format!("invalid ticket {}", session.ticket)))?;

        let _guard = self.write_lock.lock().await;
        let temp_path = self.write_temp(session).await?;

        // Linking fails if the ticket file exists, even across processes
        let linked = async_fs::hard_link(&temp_path, &path).await;
        let _ = async_fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => {
                debug!(ticket = %session.ticket, "Persisted new session");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(session.ticket.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, ticket: &str) -> Result<Option<Session>, StoreError> {
        match self.path_for(ticket) {
            Some(path) => Self::read_session(&path).await,
            None => Ok(None),
        }
    }

    async fn update_activity(
        &self,
        ticket: &str,
        at: DateTime<Utc>,
        count_request: bool,
    ) -> Result<bool, StoreError> {
        let Some(path) = self.path_for(ticket) else {
            return Ok(false);
        };

        let _guard = self.write_lock.lock().await;
        let Some(mut session) = Self::read_session(&path).await? else {
            return Ok(false);
        };
        if !session.record_activity(at, count_request) {
            return Ok(false);
        }
        self.write_session(&path, &session).await?;
        Ok(true)
    }

    async fn close(&self, ticket: &str, at: DateTime<Utc>) -> CleanupOutcome {
        let Some(path) = self.path_for(ticket) else {
            return CleanupOutcome::NotFound;
        };

        let _guard = self.write_lock.lock().await;
        let mut session = match Self::read_session(&path).await {
            Ok(Some(session)) => session,
            Ok(None) => return CleanupOutcome::NotFound,
            Err(e) => return CleanupOutcome::Failed(e.to_string()),
        };
        session.close(at);
        match self.write_session(&path, &session).await {
            Ok(()) => CleanupOutcome::Applied,
            Err(e) => CleanupOutcome::Failed(e.to_string()),
        }
    }

    async fn delete(&self, ticket: &str) -> CleanupOutcome {
        let Some(path) = self.path_for(ticket) else {
            return CleanupOutcome::NotFound;
        };

        let _guard = self.write_lock.lock().await;
        match async_fs::remove_file(&path).await {
            Ok(()) => CleanupOutcome::Applied,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CleanupOutcome::NotFound,
            Err(e) => CleanupOutcome::Failed(e.to_string()),
        }
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = async_fs::read_dir(&self.sessions_dir).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_session(&path).await {
                Ok(Some(session)) if session.is_expired_at(now) => {
                    async_fs::remove_file(&path).await?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable session file");
                }
            }
        }

        info!(removed, "Swept expired session files");
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
