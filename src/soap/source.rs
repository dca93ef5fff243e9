use crate::env;
use crate::qbxml::{EntityType, QbxmlRequest};
use crate::session::Session;
use async_trait::async_trait;

/// Supplies the outbound request documents of a session
#[async_trait]
pub trait RequestSource: Send + Sync {
    /// Request for the next exchange, given the session as it was before this
    /// exchange was counted. `None` means nothing is left to do.
    async fn next_request(&self, session: &Session) -> Option<QbxmlRequest>;

    /// Progress after `session.requests_sent` exchanges, 0..=100
    fn percent_complete(&self, session: &Session) -> i32;

    fn name(&self) -> &'static str;
}

/// One customer query per exchange; every exchange completes the session
#[derive(Debug, Clone)]
pub struct FixedQuerySource {
    max_returned: u32,
}

impl FixedQuerySource {
    pub fn new(max_returned: u32) -> Self {
        Self { max_returned }
    }
}

impl Default for FixedQuerySource {
    fn default() -> Self {
        Self::new(env::qbxml::DEFAULT_MAX_RETURNED)
    }
}

#[async_trait]
impl RequestSource for FixedQuerySource {
    async fn next_request(&self, _session: &Session) -> Option<QbxmlRequest> {
        Some(QbxmlRequest::query(EntityType::Customer, "1").with_max_returned(self.max_returned))
    }

    fn percent_complete(&self, _session: &Session) -> i32 {
        env::sentinel::COMPLETE
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Walks a list of entity types, one query per exchange
#[derive(Debug, Clone)]
pub struct EntitySyncSource {
    entity_types: Vec<EntityType>,
    max_returned: u32,
}

impl EntitySyncSource {
    pub fn new(entity_types: Vec<EntityType>, max_returned: u32) -> Self {
        Self {
            entity_types,
            max_returned,
        }
    }

    pub fn entity_types(&self) -> &[EntityType] {
        &self.entity_types
    }
}

#[async_trait]
impl RequestSource for EntitySyncSource {
    async fn next_request(&self, session: &Session) -> Option<QbxmlRequest> {
        let index = session.requests_sent as usize;
        self.entity_types.get(index).map(|entity_type| {
            QbxmlRequest::query(entity_type.clone(), (index + 1).to_string())
                .with_max_returned(self.max_returned)
        })
    }

    fn percent_complete(&self, session: &Session) -> i32 {
        let total = self.entity_types.len() as u64;
        if total == 0 {
            return env::sentinel::COMPLETE;
        }
        let percent = (u64::from(session.requests_sent) * 100 / total).min(100);
        percent as i32
    }

    fn name(&self) -> &'static str {
        "entity-sync"
    }
}
