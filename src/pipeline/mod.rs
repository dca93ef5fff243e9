//! Response processing pipeline and downstream entity handoff.

pub mod processor;
pub mod sink;
pub mod types;

pub use processor::{DEFAULT_BATCH_CONCURRENCY, Pipeline};
pub use sink::{EntityBatch, EntitySink, LoggingSink, SinkError};
pub use types::{
    BatchItem, BatchReport, BatchSummary, ComponentHealth, ComponentStatus, HealthReport,
    HealthStatus, PipelineConfig, PipelineStatistics, ProcessingMetadata, ProcessingOptions,
    ProcessingResult,
};
