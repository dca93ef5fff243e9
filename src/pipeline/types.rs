use crate::qbxml::{Entity, EntityType, Operation, ValidationIssue};
use crate::recovery::BatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage toggles, fixed for the lifetime of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub validation_enabled: bool,
    pub transformation_enabled: bool,
    /// Classify unexpected failures instead of reporting them raw
    pub error_handling_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            validation_enabled: true,
            transformation_enabled: true,
            error_handling_enabled: true,
        }
    }
}

/// Per-call options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub skip_validation: bool,
    pub skip_transformation: bool,
    /// Run entity-level validation and fail the result on any entity error
    pub validate_entities: bool,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetadata {
    pub request_id: String,
    pub entity_type: EntityType,
    pub operation: Operation,
    pub processed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub record_count: usize,
}

/// Uniform result envelope of every pipeline call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult<T = Entity> {
    pub success: bool,
    pub data: Vec<T>,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub metadata: ProcessingMetadata,
}

impl<T> ProcessingResult<T> {
    pub(crate) fn started(request_id: String, entity_type: EntityType) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            metadata: ProcessingMetadata {
                request_id,
                entity_type,
                operation: Operation::Query,
                processed_at: Utc::now(),
                elapsed_ms: 0,
                record_count: 0,
            },
        }
    }
}

/// One response document of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub content: String,
    #[serde(default)]
    pub entity_type: Option<EntityType>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl BatchItem {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            entity_type: None,
            request_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<ProcessingResult>,
    pub errors: Vec<BatchError>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub validator: ComponentStatus,
    pub transformer: ComponentStatus,
    pub retry_executor: ComponentStatus,
}

impl ComponentHealth {
    fn all(&self) -> [ComponentStatus; 3] {
        [self.validator, self.transformer, self.retry_executor]
    }

    /// Healthy with no failures, unhealthy when every component failed
    pub fn overall(&self) -> HealthStatus {
        let failed = self
            .all()
            .iter()
            .filter(|status| **status == ComponentStatus::Error)
            .count();
        match failed {
            0 => HealthStatus::Healthy,
            n if n == self.all().len() => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: ComponentHealth,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatistics {
    pub config: PipelineConfig,
    pub version: &'static str,
    pub features: Vec<&'static str>,
}
