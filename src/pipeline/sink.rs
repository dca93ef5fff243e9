use crate::qbxml::{Entity, EntityType};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Entity batch rejected: {0}")]
    Rejected(String),
    #[error("Downstream unavailable: {0}")]
    Unavailable(String),
}

/// Entities produced by one exchange, ready for the downstream system
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityBatch {
    pub ticket: String,
    pub owner: String,
    pub request_id: String,
    pub entity_type: EntityType,
    pub entities: Vec<Entity>,
}

/// Downstream consumer of transformed entities (a CRM or similar).
///
/// Delivery may be attempted more than once for the same batch, so
/// implementations should be idempotent per `request_id`.
#[async_trait]
pub trait EntitySink: Send + Sync {
    async fn deliver(&self, batch: &EntityBatch) -> Result<(), SinkError>;

    fn name(&self) -> &'static str;
}

/// Sink that only records deliveries in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl EntitySink for LoggingSink {
    async fn deliver(&self, batch: &EntityBatch) -> Result<(), SinkError> {
        info!(
            ticket = %batch.ticket,
            request_id = %batch.request_id,
            entity_type = %batch.entity_type,
            count = batch.entities.len(),
            "Handing off entity batch"
        );
        for entity in &batch.entities {
            debug!(entity = %entity.label(), "Entity ready for handoff");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
