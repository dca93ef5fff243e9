//! # QBXML Relay
//!
//! A session-oriented relay between the QuickBooks Web Connector's six-method
//! SOAP protocol and a backend that wants structured, validated business
//! entities.
//!
//! ## Architecture Overview
//!
//! - **[`soap`]**: Envelope codec and the protocol state machine
//! - **[`session`]**: Ticket lifecycle over a pluggable session store
//! - **[`pipeline`]**: Validation, transformation and entity handoff
//! - **[`qbxml`]**: Document model, validator, transformer and request builder
//! - **[`recovery`]**: Error classification, bounded retry and batch windows
//! - **[`integration`]**: Configuration and assembly of the whole relay
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qbxml_relay::{RelayConfig, RelaySystem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let relay = RelaySystem::new(RelayConfig::default())?;
//!     let reply = relay
//!         .service()
//!         .handle_envelope_or_fault("<soap:Envelope>...</soap:Envelope>")
//!         .await;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

/// Session lifecycle and storage.
///
/// Tickets, TTL expiry and the store contract with its in-memory and
/// file-backed adapters.
pub mod session;

/// QBXML document handling.
///
/// Owned XML tree, request/response validation, entity model and the
/// response transformer.
pub mod qbxml;

/// Error classification and retry.
pub mod recovery;

/// Processing pipeline orchestrating validation and transformation, plus
/// the downstream entity sink.
pub mod pipeline;

/// Web Connector SOAP surface.
///
/// Envelope codec, the six-method protocol service, request sources and the
/// WSDL/QWC descriptors.
pub mod soap;

/// Configuration and assembly of the relay.
pub mod integration;

/// Environment constants and path utilities.
///
/// Protocol sentinels, namespaces and the configuration/session paths.
pub mod env;

// CLI module for command-line interface
pub mod cli;

pub use integration::{RelayConfig, RelaySystem, StoreBackend, SystemStatus};
pub use pipeline::{Pipeline, PipelineConfig, ProcessingOptions, ProcessingResult};
pub use qbxml::{Entity, EntityType, Operation, ValidationIssue, ValidationResult};
pub use recovery::{ClassifiedError, ErrorCode, RetryExecutor, RetryPolicy};
pub use session::{Session, SessionManager, SessionManagerConfig, SessionStore};
pub use soap::{ConnectorCall, CredentialPolicy, WebConnectorService};
