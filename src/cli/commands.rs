//! Command runner behind the `qbxml-relay` binary.
//!
//! Every command prints its result to stdout (JSON for pipeline output) and
//! reports whether the document or system it inspected was acceptable.

use super::args::{Args, Commands};
use super::config::ConfigDiscovery;
use crate::pipeline::{BatchItem, HealthStatus, Pipeline, ProcessingOptions};
use crate::qbxml::{EntityType, Validator};
use crate::recovery::{BatchOptions, RetryExecutor};
use crate::soap::wsdl_document;
use crate::{RelayConfig, RelaySystem};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Run the parsed command; `Ok(false)` means the command ran but the input
/// was rejected
pub async fn run(args: Args) -> Result<bool> {
    let Some(command) = args.command else {
        bail!("No command given; see --help");
    };

    if let Commands::ShowConfig { effective } = &command {
        ConfigDiscovery::show_discovery_info();
        if *effective {
            let config = ConfigDiscovery::load(args.config.as_deref())?;
            println!();
            println!("{}", config.to_toml_string()?);
        }
        return Ok(true);
    }

    let config = ConfigDiscovery::load(args.config.as_deref())?;
    debug!(?config, "Effective configuration");

    match command {
        Commands::Validate {
            file,
            request,
            entity_type,
        } => validate(&file, request, entity_type.as_ref()).await,
        Commands::Process {
            file,
            entity_type,
            strict,
            request_id,
        } => {
            let xml = read_document(&file).await?;
            let options = ProcessingOptions {
                validate_entities: strict,
                request_id,
                ..Default::default()
            };
            let result = pipeline_for(&config).process_response(&xml, entity_type.as_ref(), &options);
            print_json(&result)?;
            Ok(result.success)
        }
        Commands::Batch {
            files,
            concurrency,
            stop_on_error,
        } => batch(&config, &files, concurrency, stop_on_error).await,
        Commands::Soap { file } => {
            let envelope = match file {
                Some(path) => read_document(&path).await?,
                None => {
                    let mut input = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut input)
                        .await
                        .context("Failed to read envelope from stdin")?;
                    input
                }
            };
            let relay = RelaySystem::new(config)?;
            let reply = relay.service().handle_envelope_or_fault(&envelope).await;
            println!("{}", reply);
            relay.shutdown().await;
            Ok(!reply.contains(":Fault>"))
        }
        Commands::Wsdl { url } => {
            print!("{}", wsdl_document(&url));
            Ok(true)
        }
        Commands::Qwc {
            profile,
            url,
            output_dir,
        } => {
            let document = profile.qwc_document(&url);
            match output_dir {
                Some(dir) => {
                    tokio::fs::create_dir_all(&dir)
                        .await
                        .with_context(|| format!("Failed to create {}", dir.display()))?;
                    let path = dir.join(profile.file_name());
                    tokio::fs::write(&path, document)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(profile = %profile, path = %path.display(), "Wrote QWC file");
                    println!("{}", path.display());
                }
                None => print!("{}", document),
            }
            Ok(true)
        }
        Commands::Health => {
            let relay = RelaySystem::new(config)?;
            let status = relay.get_system_status().await;
            print_json(&status)?;
            Ok(status.health.status != HealthStatus::Unhealthy)
        }
        Commands::ShowConfig { .. } => Ok(true),
    }
}

async fn validate(file: &Path, request: bool, entity_type: Option<&EntityType>) -> Result<bool> {
    let xml = read_document(file).await?;
    let validator = Validator::new();
    let result = if request {
        validator.validate_request(&xml, entity_type)
    } else {
        validator.validate_response(&xml, entity_type)
    };
    print_json(&result)?;
    Ok(result.is_valid)
}

async fn batch(
    config: &RelayConfig,
    files: &[PathBuf],
    concurrency: usize,
    stop_on_error: bool,
) -> Result<bool> {
    let mut items = Vec::with_capacity(files.len());
    for file in files {
        items.push(BatchItem {
            request_id: Some(file.display().to_string()),
            ..BatchItem::new(read_document(file).await?)
        });
    }

    let options = BatchOptions {
        continue_on_error: !stop_on_error,
        max_concurrent: concurrency.max(1),
    };
    let report = pipeline_for(config)
        .process_batch(&items, &ProcessingOptions::default(), options)
        .await;
    print_json(&report)?;
    Ok(report.summary.failed == 0)
}

fn pipeline_for(config: &RelayConfig) -> Pipeline {
    Pipeline::new(config.pipeline, RetryExecutor::new(config.retry.clone()))
}

async fn read_document(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}
