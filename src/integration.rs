//! # Relay Assembly
//!
//! Builds a ready-to-serve [`WebConnectorService`] from a [`RelayConfig`]:
//! the session store backend, the session manager, the processing pipeline,
//! the request source and the handoff retry policy.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 RelaySystem                  │
//! │  ┌────────────┐ ┌────────────┐ ┌───────────┐ │
//! │  │  Session   │ │ Processing │ │  Request  │ │
//! │  │  Manager   │ │  Pipeline  │ │  Source   │ │
//! │  └────────────┘ └────────────┘ └───────────┘ │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use qbxml_relay::{RelayConfig, RelaySystem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let relay = RelaySystem::new(RelayConfig::default())?;
//!     let ticket = relay.service().authenticate("qbwc", "secret").await;
//!     let request = relay.service().begin_exchange(&ticket).await;
//!     println!("{}", request);
//!     relay.shutdown().await;
//!     Ok(())
//! }
//! ```

use crate::env;
use crate::pipeline::{HealthReport, Pipeline, PipelineConfig, PipelineStatistics};
use crate::qbxml::EntityType;
use crate::recovery::{RetryExecutor, RetryOverrides, RetryPolicy};
use crate::session::{
    FileSessionStore, InMemorySessionStore, SessionManager, SessionManagerConfig, SessionStore,
};
use crate::soap::{
    CredentialPolicy, EntitySyncSource, FixedQuerySource, RequestSource, WebConnectorService,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Session store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub ttl_secs: u64,
    pub backend: StoreBackend,
    /// Directory of the file backend; defaults to `./.qbxml-relay/sessions`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: env::session::DEFAULT_TTL_SECS,
            backend: StoreBackend::Memory,
            dir: None,
        }
    }
}

impl SessionSettings {
    pub fn manager_config(&self) -> SessionManagerConfig {
        SessionManagerConfig {
            ttl_secs: self.ttl_secs,
        }
    }

    /// Directory the file backend writes to
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            env::sessions_dir_path(&root)
        })
    }
}

/// What the relay asks the client for, one entity type per exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Empty means a single customer query per session
    pub entity_types: Vec<EntityType>,
    pub max_returned: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            entity_types: Vec::new(),
            max_returned: env::qbxml::DEFAULT_MAX_RETURNED,
        }
    }
}

impl SyncSettings {
    /// Entity type names end up as element names, so only letters are allowed
    pub fn validate(&self) -> Result<()> {
        for entity_type in &self.entity_types {
            let name = entity_type.as_str();
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
                bail!("Invalid sync entity type {:?}: expected letters only", name);
            }
        }
        Ok(())
    }

    pub fn request_source(&self) -> Arc<dyn RequestSource> {
        if self.entity_types.is_empty() {
            Arc::new(FixedQuerySource::new(self.max_returned))
        } else {
            Arc::new(EntitySyncSource::new(
                self.entity_types.clone(),
                self.max_returned,
            ))
        }
    }
}

/// Complete relay configuration, loadable from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub session: SessionSettings,
    pub pipeline: PipelineConfig,
    pub retry: RetryPolicy,
    pub credentials: CredentialPolicy,
    pub sync: SyncSettings,
    /// Overrides applied on top of `retry` for entity handoff
    pub handoff: RetryOverrides,
}

impl RelayConfig {
    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML config")?;
        config.sync.validate()?;
        Ok(config)
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    pub fn handoff_policy(&self) -> RetryPolicy {
        self.handoff.resolve(&self.retry)
    }
}

/// Point-in-time view of the assembled relay
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub store_backend: &'static str,
    pub request_source: &'static str,
    pub health: HealthReport,
    pub pipeline: PipelineStatistics,
    pub is_healthy: bool,
}

/// The assembled relay: one service over one store and one pipeline
#[derive(Debug, Clone)]
pub struct RelaySystem {
    config: RelayConfig,
    service: WebConnectorService,
    source_name: &'static str,
}

impl RelaySystem {
    pub fn new(config: RelayConfig) -> Result<Self> {
        config.sync.validate()?;
        let store: Arc<dyn SessionStore> = match config.session.backend {
            StoreBackend::Memory => Arc::new(InMemorySessionStore::new()),
            StoreBackend::File => {
                let dir = config.session.resolved_dir();
                Arc::new(FileSessionStore::new(&dir).with_context(|| {
                    format!("Failed to open session directory {}", dir.display())
                })?)
            }
        };
        Ok(Self::with_store(config, store))
    }

    /// Assemble over an externally provided store
    pub fn with_store(config: RelayConfig, store: Arc<dyn SessionStore>) -> Self {
        let sessions = SessionManager::new(store, config.session.manager_config());
        let pipeline = Arc::new(Pipeline::new(
            config.pipeline,
            RetryExecutor::new(config.retry.clone()),
        ));
        let source = config.sync.request_source();
        let source_name = source.name();

        let service = WebConnectorService::new(sessions, pipeline)
            .with_source(source)
            .with_handoff_executor(RetryExecutor::new(config.handoff_policy()))
            .with_credentials(config.credentials.clone());

        info!(
            backend = service.sessions().backend_name(),
            source = source_name,
            ttl_secs = config.session.ttl_secs,
            "Relay assembled"
        );

        Self {
            config,
            service,
            source_name,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn service(&self) -> &WebConnectorService {
        &self.service
    }

    pub fn pipeline(&self) -> &Pipeline {
        self.service.pipeline()
    }

    pub async fn get_system_status(&self) -> SystemStatus {
        let health = self.pipeline().health_check().await;
        let is_healthy = health.status == crate::pipeline::HealthStatus::Healthy;
        SystemStatus {
            store_backend: self.service.sessions().backend_name(),
            request_source: self.source_name,
            health,
            pipeline: self.pipeline().statistics(),
            is_healthy,
        }
    }

    /// Sweep expired sessions before the process exits
    pub async fn shutdown(&self) {
        let swept = self.service.sessions().cleanup_expired_sessions().await;
        debug!(swept, "Relay shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = RelayConfig::default();
        let toml = config.to_toml_string().unwrap();
        assert!(toml.contains("[session]"));
        assert!(toml.contains("backend = \"memory\""));
        assert_eq!(RelayConfig::from_toml_str(&toml).unwrap(), config);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = RelayConfig::from_toml_str(
            r#"
[session]
ttl_secs = 600
backend = "file"
dir = "/var/lib/qbxml-relay/sessions"

[credentials]
mode = "static"
username = "qbwc"
password = "hunter2"

[sync]
entity_types = ["Customer", "Invoice"]

[handoff]
max_retries = 5
retryable_codes = ["TEMPORARY_UNAVAILABLE"]
"#,
        )
        .unwrap();

        assert_eq!(config.session.ttl_secs, 600);
        assert_eq!(config.session.backend, StoreBackend::File);
        assert_eq!(
            config.session.resolved_dir(),
            PathBuf::from("/var/lib/qbxml-relay/sessions")
        );
        assert!(config.credentials.accepts("qbwc", "hunter2"));
        assert_eq!(
            config.sync.entity_types,
            vec![EntityType::Customer, EntityType::Invoice]
        );
        assert_eq!(config.sync.max_returned, 100);
        assert!(config.pipeline.validation_enabled);

        let handoff = config.handoff_policy();
        assert_eq!(handoff.max_retries, 5);
        assert_eq!(handoff.initial_delay_ms, config.retry.initial_delay_ms);
        assert_eq!(handoff.retryable_codes, vec![ErrorCode::TemporaryUnavailable]);
    }

    #[test]
    fn test_invalid_config_reports_context() {
        let error = RelayConfig::from_toml_str("[session]\nbackend = \"redis\"").unwrap_err();
        assert!(error.to_string().contains("Failed to parse TOML config"));

        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        let error = RelayConfig::from_toml_file(&missing).unwrap_err();
        assert!(error.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_sync_entity_types_must_be_element_names() {
        for bad in ["Sales Order", "Customer<x>", "Item\"", ""] {
            let content = format!("[sync]\nentity_types = [{:?}]", bad);
            let error = RelayConfig::from_toml_str(&content).unwrap_err();
            assert!(
                error.to_string().contains("Invalid sync entity type"),
                "{}",
                error
            );
        }

        let config = RelayConfig::from_toml_str("[sync]\nentity_types = [\"Bill\", \"invoice\"]")
            .unwrap();
        assert_eq!(
            config.sync.entity_types,
            vec![EntityType::Other("Bill".to_string()), EntityType::Invoice]
        );

        let mut config = RelayConfig::default();
        config.sync.entity_types = vec![EntityType::Other("Bill Payment".to_string())];
        assert!(RelaySystem::new(config).is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("relay.toml");

        let mut config = RelayConfig::default();
        config.sync.entity_types = vec![EntityType::Item];
        config.to_toml_file(&path).unwrap();

        assert_eq!(RelayConfig::from_toml_file(&path).unwrap(), config);
    }

    #[tokio::test]
    async fn test_relay_system_assembly() {
        let relay = RelaySystem::new(RelayConfig::default()).unwrap();
        let status = relay.get_system_status().await;
        assert_eq!(status.store_backend, "memory");
        assert_eq!(status.request_source, "fixed");
        assert!(status.is_healthy);

        let temp_dir = TempDir::new().unwrap();
        let mut config = RelayConfig::default();
        config.session.backend = StoreBackend::File;
        config.session.dir = Some(temp_dir.path().join("sessions"));
        config.sync.entity_types = vec![EntityType::Customer, EntityType::Vendor];

        let relay = RelaySystem::new(config).unwrap();
        assert_eq!(relay.service().sessions().backend_name(), "file");

        let ticket = relay.service().authenticate("alice", "pw").await;
        assert!(temp_dir
            .path()
            .join("sessions")
            .join(format!("{}.json", ticket))
            .exists());
        assert!(relay
            .service()
            .begin_exchange(&ticket)
            .await
            .contains("<CustomerQueryRq"));
        relay.shutdown().await;
    }
}
