use super::types::*;
use crate::qbxml::{
    EntityType, Operation, TransformError, Transformer, ValidationIssue, Validator,
    XmlElement, samples,
};
use crate::recovery::{
    BatchOptions, ClassifiedError, ErrorContext, RetryExecutor, RetryPolicy, Severity,
    log_classified,
};
use futures::FutureExt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default window for [`Pipeline::process_batch`]
pub const DEFAULT_BATCH_CONCURRENCY: usize = 3;

/// Validator → transformer → classifier orchestration with a uniform
/// [`ProcessingResult`] envelope.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    validator: Validator,
    transformer: Transformer,
    executor: RetryExecutor,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default(), RetryExecutor::new(RetryPolicy::default()))
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig, executor: RetryExecutor) -> Self {
        Self {
            config,
            validator: Validator::new(),
            transformer: Transformer::new(),
            executor,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    pub fn default_batch_options() -> BatchOptions {
        BatchOptions {
            continue_on_error: true,
            max_concurrent: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    /// Validate an outbound request document
    pub fn process_request(
        &self,
        xml: &str,
        expected: Option<&EntityType>,
        options: &ProcessingOptions,
    ) -> ProcessingResult {
        let start = Instant::now();
        let detected = detect_message(xml, "QBXMLMsgsRq", "Rq");
        let mut result = ProcessingResult::started(
            resolve_request_id(options, detected.request_id.clone(), "request"),
            detected.entity_type(expected),
        );
        result.metadata.operation = detected.operation();

        if self.config.validation_enabled && !options.skip_validation {
            debug!(request_id = %result.metadata.request_id, "Validating request document");
            let validation = self.validator.validate_request(xml, expected);
            result.errors.extend(validation.errors);
            result.warnings.extend(validation.warnings);
            result.success = validation.is_valid;
        } else {
            result.success = true;
        }

        finish(result, start)
    }

    /// Validate and transform an inbound response document.
    ///
    /// Every path, including early returns, leaves through [`finish`] so that
    /// `elapsed_ms` and `record_count` are always set.
    pub fn process_response(
        &self,
        xml: &str,
        expected: Option<&EntityType>,
        options: &ProcessingOptions,
    ) -> ProcessingResult {
        let start = Instant::now();
        let detected = detect_message(xml, "QBXMLMsgsRs", "Rs");
        let mut result = ProcessingResult::started(
            resolve_request_id(options, detected.request_id.clone(), "process"),
            detected.entity_type(expected),
        );
        result.metadata.operation = detected.operation();

        self.run_response(xml, expected, options, &mut result);
        let result = finish(result, start);

        if result.success {
            info!(
                request_id = %result.metadata.request_id,
                entity_type = %result.metadata.entity_type,
                records = result.metadata.record_count,
                elapsed_ms = result.metadata.elapsed_ms,
                "Processed response document"
            );
        } else {
            warn!(
                request_id = %result.metadata.request_id,
                errors = result.errors.len(),
                first_code = result.errors.first().map(|issue| issue.code.as_str()).unwrap_or(""),
                "Response document processing failed"
            );
        }
        result
    }

    fn run_response(
        &self,
        xml: &str,
        expected: Option<&EntityType>,
        options: &ProcessingOptions,
        result: &mut ProcessingResult,
    ) {
        if self.config.validation_enabled && !options.skip_validation {
            let validation = self.validator.validate_response(xml, expected);
            result.errors.extend(validation.errors);
            result.warnings.extend(validation.warnings);
            if !validation.is_valid {
                return;
            }
        }

        if self.config.transformation_enabled && !options.skip_transformation {
            match self.transformer.transform_response(xml, expected) {
                Ok(transformed) => {
                    result.metadata.entity_type = transformed.info.entity_type;
                    result.metadata.operation = transformed.info.operation;
                    result.data = transformed.entities;
                }
                Err(TransformError::ResponseStatus { code, message }) => {
                    result
                        .errors
                        .push(ValidationIssue::new("response", message, code, Severity::Error));
                    return;
                }
                Err(error) => {
                    let issue = self.transformation_issue(error, result);
                    result.errors.push(issue);
                    return;
                }
            }
        }

        if options.validate_entities && !self.validate_entities(result) {
            return;
        }

        result.success = true;
    }

    /// Strict entity pass; returns false when any entity has errors
    fn validate_entities(&self, result: &mut ProcessingResult) -> bool {
        let mut valid = true;
        for (index, entity) in result.data.iter().enumerate() {
            let validation = self.validator.validate_entity(entity);
            valid &= validation.is_valid;
            let prefix = |mut issue: ValidationIssue| {
                issue.field = format!("data[{}].{}", index, issue.field);
                issue
            };
            result.errors.extend(validation.errors.into_iter().map(prefix));
            result.warnings.extend(validation.warnings.into_iter().map(prefix));
        }
        valid
    }

    fn transformation_issue(&self, error: TransformError, result: &ProcessingResult) -> ValidationIssue {
        if !self.config.error_handling_enabled {
            return ValidationIssue::new(
                "transformation",
                error.to_string(),
                error.code(),
                Severity::Error,
            );
        }

        let context = ErrorContext::for_request(result.metadata.request_id.clone())
            .with_entity(result.metadata.entity_type.clone(), result.metadata.operation);
        let classified = ClassifiedError::from(error).with_context(&context);
        log_classified(&classified);

        let severity = match classified.severity {
            Severity::Critical => Severity::Critical,
            _ => Severity::Error,
        };
        ValidationIssue::new(
            "transformation",
            classified.message,
            classified.code.as_str(),
            severity,
        )
    }

    /// Process response documents in bounded windows
    pub async fn process_batch(
        &self,
        items: &[BatchItem],
        options: &ProcessingOptions,
        batch: BatchOptions,
    ) -> BatchReport {
        info!(count = items.len(), window = batch.max_concurrent, "Processing batch");

        let outcome = self
            .executor
            .process_batch(
                items,
                |item, _| {
                    let item_options = ProcessingOptions {
                        request_id: item.request_id.clone().or_else(|| options.request_id.clone()),
                        ..options.clone()
                    };
                    async move {
                        Ok::<_, ClassifiedError>(self.process_response(
                            &item.content,
                            item.entity_type.as_ref(),
                            &item_options,
                        ))
                    }
                    .boxed()
                },
                batch,
                &ErrorContext {
                    request_id: options.request_id.clone(),
                    ..Default::default()
                },
            )
            .await;

        let (results, errors) = match outcome {
            Ok(outcome) => (outcome.results, outcome.errors),
            Err(aborted) => (aborted.completed.results, aborted.completed.errors),
        };

        let successful = results.iter().filter(|result| result.success).count();
        let summary = BatchSummary {
            total: items.len(),
            successful,
            failed: (results.len() - successful) + errors.len(),
            warnings: results.iter().map(|result| result.warnings.len()).sum(),
        };
        info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            "Batch complete"
        );

        BatchReport {
            results,
            errors,
            summary,
        }
    }

    /// Exercise each component against the built-in sample documents
    pub async fn health_check(&self) -> HealthReport {
        let mut details = Vec::new();

        let validation = self
            .validator
            .validate_request(samples::CUSTOMER_QUERY_REQUEST, Some(&EntityType::Customer));
        let validator = if validation.is_valid {
            ComponentStatus::Ok
        } else {
            details.extend(
                validation
                    .errors
                    .iter()
                    .map(|issue| format!("Validator error: {}", issue.message)),
            );
            ComponentStatus::Error
        };

        let transformer = match self
            .transformer
            .transform_response(samples::CUSTOMER_QUERY_RESPONSE, Some(&EntityType::Customer))
        {
            Ok(transformed) if !transformed.entities.is_empty() => ComponentStatus::Ok,
            Ok(_) => {
                details.push("Transformer error: sample produced no entities".to_string());
                ComponentStatus::Error
            }
            Err(e) => {
                details.push(format!("Transformer error: {}", e));
                ComponentStatus::Error
            }
        };

        // Zero retries, separate statistics
        let probe = RetryExecutor::new(RetryPolicy {
            max_retries: 0,
            ..self.executor.policy().clone()
        });
        let retry_executor = match probe
            .execute(
                || async { Ok::<_, ClassifiedError>("ok") }.boxed(),
                &ErrorContext::for_request("health-check"),
            )
            .await
        {
            Ok(_) => ComponentStatus::Ok,
            Err(e) => {
                details.push(format!("Retry executor error: {}", e));
                ComponentStatus::Error
            }
        };

        let components = ComponentHealth {
            validator,
            transformer,
            retry_executor,
        };
        HealthReport {
            status: components.overall(),
            components,
            details,
        }
    }

    pub fn statistics(&self) -> PipelineStatistics {
        let mut features = Vec::new();
        if self.config.validation_enabled {
            features.push("validation");
        }
        if self.config.transformation_enabled {
            features.push("transformation");
        }
        if self.config.error_handling_enabled {
            features.push("error-handling");
        }
        features.extend(["batch-processing", "health-checks"]);

        PipelineStatistics {
            config: self.config,
            version: env!("CARGO_PKG_VERSION"),
            features,
        }
    }
}

/// Stamp timing and record count at the single exit point
fn finish(mut result: ProcessingResult, start: Instant) -> ProcessingResult {
    result.metadata.record_count = result.data.len();
    result.metadata.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    result
}

fn resolve_request_id(options: &ProcessingOptions, detected: Option<String>, prefix: &str) -> String {
    options
        .request_id
        .clone()
        .or(detected)
        .unwrap_or_else(|| format!("{}-{}", prefix, uuid::Uuid::new_v4().simple()))
}

/// Best-effort look at the first message of a document, used for metadata only
#[derive(Debug, Default)]
struct DetectedMessage {
    request_id: Option<String>,
    kind: Option<(EntityType, Operation)>,
}

impl DetectedMessage {
    fn entity_type(&self, expected: Option<&EntityType>) -> EntityType {
        match (&self.kind, expected) {
            (Some((entity_type, _)), _) => entity_type.clone(),
            (None, Some(expected)) => expected.clone(),
            (None, None) => EntityType::Customer,
        }
    }

    fn operation(&self) -> Operation {
        self.kind
            .as_ref()
            .map(|(_, operation)| *operation)
            .unwrap_or_default()
    }
}

fn detect_message(xml: &str, container: &str, suffix: &str) -> DetectedMessage {
    let Ok(root) = XmlElement::parse(xml) else {
        return DetectedMessage::default();
    };
    let Some(first) = root
        .child(container)
        .and_then(|msgs| msgs.children_with_suffix(suffix).next())
    else {
        return DetectedMessage::default();
    };

    DetectedMessage {
        request_id: first
            .attribute("requestID")
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        kind: EntityType::parse_message_name(&first.name),
    }
}

