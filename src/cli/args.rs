//! Command line argument parsing
//!
//! Subcommands:
//! - `validate`: Validate a QBXML request or response document
//! - `process`: Run a response document through the pipeline
//! - `batch`: Process several response documents in bounded windows
//! - `soap`: Answer one SOAP envelope read from a file or stdin
//! - `wsdl`: Print the service WSDL
//! - `qwc`: Render the Web Connector `.qwc` file for a profile
//! - `health`: Run the pipeline health check
//! - `show-config`: Show configuration discovery information

use crate::qbxml::EntityType;
use crate::soap::QwcProfile;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "qbxml-relay")]
#[command(author = "QBXML Relay Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Session-oriented relay between the QuickBooks Web Connector and structured business entities"
)]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Configuration file path (overrides discovery)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a QBXML document
    Validate {
        /// Path to the document
        file: PathBuf,
        /// Treat the document as an outbound request instead of a response
        #[arg(long = "request")]
        request: bool,
        /// Entity type the document must carry
        #[arg(short = 't', long = "entity-type", value_name = "TYPE")]
        entity_type: Option<EntityType>,
    },
    /// Validate and transform a QBXML response document
    Process {
        /// Path to the response document
        file: PathBuf,
        /// Expected entity type
        #[arg(short = 't', long = "entity-type", value_name = "TYPE")]
        entity_type: Option<EntityType>,
        /// Fail when any transformed entity has validation errors
        #[arg(long = "strict")]
        strict: bool,
        /// Request identifier to report in the result metadata
        #[arg(long = "request-id")]
        request_id: Option<String>,
    },
    /// Process several response documents
    Batch {
        /// Paths to the response documents
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Documents processed concurrently per window
        #[arg(long = "concurrency", default_value_t = crate::pipeline::DEFAULT_BATCH_CONCURRENCY)]
        concurrency: usize,
        /// Stop at the first window containing a failure
        #[arg(long = "stop-on-error")]
        stop_on_error: bool,
    },
    /// Handle one SOAP request envelope and print the reply
    Soap {
        /// Envelope file; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Print the WSDL of the connector service
    Wsdl {
        /// Public URL of the service endpoint
        #[arg(long = "url")]
        url: String,
    },
    /// Render the `.qwc` file the Web Connector imports
    Qwc {
        /// Deployment profile
        #[arg(short = 'p', long = "profile", value_enum, default_value_t = QwcProfile::Dev)]
        profile: QwcProfile,
        /// Public URL of the service endpoint
        #[arg(long = "url")]
        url: String,
        /// Write into this directory instead of stdout
        #[arg(short = 'o', long = "output-dir")]
        output_dir: Option<PathBuf>,
    },
    /// Run the pipeline health check
    Health,
    /// Show configuration discovery information
    ShowConfig {
        /// Also print the effective configuration as TOML
        #[arg(long = "effective")]
        effective: bool,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_command() {
        let args = Args::try_parse_from([
            "qbxml-relay",
            "process",
            "response.xml",
            "--entity-type",
            "Invoice",
            "--strict",
            "-c",
            "relay.toml",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("relay.toml")));
        match args.command {
            Some(Commands::Process {
                file,
                entity_type,
                strict,
                request_id,
            }) => {
                assert_eq!(file, PathBuf::from("response.xml"));
                assert_eq!(entity_type, Some(EntityType::Invoice));
                assert!(strict);
                assert_eq!(request_id, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_qwc_and_batch_commands() {
        let args = Args::try_parse_from([
            "qbxml-relay",
            "qwc",
            "--profile",
            "prod",
            "--url",
            "https://relay.example.com/qbwc",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Qwc { profile: QwcProfile::Prod, .. })
        ));

        let args = Args::try_parse_from(["qbxml-relay", "batch", "a.xml", "b.xml"]).unwrap();
        match args.command {
            Some(Commands::Batch {
                files,
                concurrency,
                stop_on_error,
            }) => {
                assert_eq!(files.len(), 2);
                assert_eq!(concurrency, crate::pipeline::DEFAULT_BATCH_CONCURRENCY);
                assert!(!stop_on_error);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Args::try_parse_from(["qbxml-relay", "batch"]).is_err());
        assert!(Args::try_parse_from(["qbxml-relay", "qwc", "--url", "x", "-p", "qa"]).is_err());
    }
}
