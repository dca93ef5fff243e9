use super::types::{ClassifiedError, ErrorCode, ErrorContext, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bounded exponential backoff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    pub max_jitter_ms: u64,
    pub retryable_codes: Vec<ErrorCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
            max_jitter_ms: 1000,
            retryable_codes: vec![
                ErrorCode::NetworkError,
                ErrorCode::Timeout,
                ErrorCode::TemporaryUnavailable,
                ErrorCode::RateLimit,
                ErrorCode::QbBusy,
                ErrorCode::ConnectionLost,
                ErrorCode::ServerError,
            ],
        }
    }
}

impl RetryPolicy {
    /// Total number of tries including the first one
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `attempt + 1`, without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        if self.jitter && self.max_jitter_ms > 0 {
            let jitter = (rand::random::<f64>() * self.max_jitter_ms as f64) as u64;
            delay.saturating_add(Duration::from_millis(jitter))
        } else {
            delay
        }
    }

    /// Both the classification and the configured code list must allow a retry
    pub fn should_retry(&self, error: &ClassifiedError) -> bool {
        error.retryable && self.retryable_codes.contains(&error.code)
    }
}

/// Partial policy supplied by a caller; unset fields keep the defaults
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOverrides {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub jitter: Option<bool>,
    pub max_jitter_ms: Option<u64>,
    pub retryable_codes: Option<Vec<ErrorCode>>,
}

impl RetryOverrides {
    pub fn resolve(&self, defaults: &RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_delay_ms: self.initial_delay_ms.unwrap_or(defaults.initial_delay_ms),
            max_delay_ms: self.max_delay_ms.unwrap_or(defaults.max_delay_ms),
            backoff_multiplier: self
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
            jitter: self.jitter.unwrap_or(defaults.jitter),
            max_jitter_ms: self.max_jitter_ms.unwrap_or(defaults.max_jitter_ms),
            retryable_codes: self
                .retryable_codes
                .clone()
                .unwrap_or_else(|| defaults.retryable_codes.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorStatistics {
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub total_errors: u64,
    pub total_retries: u64,
    pub last_error_time: Option<DateTime<Utc>>,
    pub error_types: HashMap<String, u32>,
}

/// Runs operations under a [`RetryPolicy`], classifying every failure
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    error_stats: Arc<Mutex<ErrorStatistics>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            error_stats: Arc::new(Mutex::new(ErrorStatistics::default())),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn execute<'a, F, T, E>(
        &self,
        operation: F,
        context: &ErrorContext,
    ) -> Result<T, ClassifiedError>
    where
        F: Fn() -> BoxFuture<'a, Result<T, E>> + Send + Sync,
        T: Send,
        E: Into<ClassifiedError> + Send,
    {
        self.execute_with_cancel(operation, context, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), but a cancelled token aborts the
    /// pending retry delay with a `CANCELLED` error.
    pub async fn execute_with_cancel<'a, F, T, E>(
        &self,
        operation: F,
        context: &ErrorContext,
        cancel: &CancellationToken,
    ) -> Result<T, ClassifiedError>
    where
        F: Fn() -> BoxFuture<'a, Result<T, E>> + Send + Sync,
        T: Send,
        E: Into<ClassifiedError> + Send,
    {
        let total_attempts = self.policy.total_attempts();
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(ClassifiedError::cancelled("Operation cancelled before attempt")
                    .with_context(context));
            }

            let error = match operation().await {
                Ok(result) => {
                    self.record_success().await;
                    return Ok(result);
                }
                Err(error) => error,
            };

            let attempt_context = ErrorContext {
                attempt: Some(attempt + 1),
                total_attempts: Some(total_attempts),
                ..context.clone()
            };
            let classified: ClassifiedError = error.into();
            let classified = classified.with_context(&attempt_context);
            self.record_error(&classified).await;
            log_classified(&classified);

            if attempt >= self.policy.max_retries || !self.policy.should_retry(&classified) {
                return Err(classified);
            }

            let delay = self.policy.delay_for(attempt);
            info!(
                request_id = ?classified.context.request_id,
                attempt = attempt + 1,
                total_attempts,
                delay_ms = delay.as_millis() as u64,
                "Retrying operation"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(request_id = ?classified.context.request_id, "Retry delay cancelled");
                    return Err(ClassifiedError::cancelled(format!(
                        "Retry cancelled after: {}",
                        classified.message
                    ))
                    .with_context(&attempt_context));
                }
                _ = tokio::time::sleep(delay) => {}
            }

            self.error_stats.lock().await.total_retries += 1;
            attempt += 1;
        }
    }

    async fn record_success(&self) {
        let mut stats = self.error_stats.lock().await;
        stats.consecutive_successes += 1;
        stats.consecutive_failures = 0;
    }

    async fn record_error(&self, error: &ClassifiedError) {
        let mut stats = self.error_stats.lock().await;
        stats.consecutive_failures += 1;
        stats.consecutive_successes = 0;
        stats.total_errors += 1;
        stats.last_error_time = Some(Utc::now());
        *stats
            .error_types
            .entry(error.code.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub async fn get_error_statistics(&self) -> ErrorStatistics {
        self.error_stats.lock().await.clone()
    }
}

/// Log a classified failure at the level its severity calls for
pub fn log_classified(error: &ClassifiedError) {
    let context = &error.context;
    match error.severity {
        Severity::Critical | Severity::Error => error!(
            code = %error.code,
            legacy_code = ?error.legacy_code,
            severity = %error.severity,
            retryable = error.retryable,
            request_id = ?context.request_id,
            entity_type = ?context.entity_type,
            ticket = ?context.ticket,
            attempt = ?context.attempt,
            total_attempts = ?context.total_attempts,
            "{}",
            error.message
        ),
        Severity::Warning => warn!(
            code = %error.code,
            legacy_code = ?error.legacy_code,
            retryable = error.retryable,
            request_id = ?context.request_id,
            entity_type = ?context.entity_type,
            ticket = ?context.ticket,
            attempt = ?context.attempt,
            "{}",
            error.message
        ),
    }
}
