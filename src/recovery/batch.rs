use super::retry::{BoxFuture, RetryExecutor};
use super::types::{ClassifiedError, ErrorContext};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub continue_on_error: bool,
    pub max_concurrent: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            max_concurrent: 5,
        }
    }
}

/// A failed item, keyed by its position in the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    pub index: usize,
    pub error: ClassifiedError,
}

/// A batch stopped by a failure with `continue_on_error` unset. `completed`
/// holds everything finished before the stop, including the failing window.
#[derive(Debug, Clone)]
pub struct BatchAborted<T> {
    pub error: BatchError,
    pub completed: BatchOutcome<T>,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome<T> {
    /// Successful results in input order
    pub results: Vec<T>,
    pub errors: Vec<BatchError>,
    pub success_count: usize,
    pub error_count: usize,
}

impl RetryExecutor {
    /// Process `items` in windows of `max_concurrent`, each item under the
    /// retry policy. With `continue_on_error` unset, the first failed window
    /// aborts the batch with the lowest failing index.
    pub async fn process_batch<'a, I, T, E, F>(
        &self,
        items: &'a [I],
        processor: F,
        options: BatchOptions,
        context: &ErrorContext,
    ) -> Result<BatchOutcome<T>, BatchAborted<T>>
    where
        I: Sync,
        F: Fn(&'a I, usize) -> BoxFuture<'a, Result<T, E>> + Send + Sync,
        T: Send,
        E: Into<ClassifiedError> + Send,
    {
        let window = options.max_concurrent.max(1);
        let processor = &processor;
        let mut results = Vec::with_capacity(items.len());
        let mut errors = Vec::new();

        for (window_index, chunk) in items.chunks(window).enumerate() {
            let offset = window_index * window;
            debug!(offset, size = chunk.len(), "Processing batch window");

            let attempts = chunk.iter().enumerate().map(|(position, item)| {
                let index = offset + position;
                let request_id = match &context.request_id {
                    Some(base) => format!("{}-{}", base, index),
                    None => format!("batch-{}", index),
                };
                let item_context = ErrorContext {
                    request_id: Some(request_id),
                    ..context.clone()
                };
                async move {
                    let outcome = self
                        .execute(|| processor(item, index), &item_context)
                        .await;
                    (index, outcome)
                }
            });

            for (index, outcome) in join_all(attempts).await {
                match outcome {
                    Ok(result) => results.push(result),
                    Err(error) => errors.push(BatchError { index, error }),
                }
            }

            if !options.continue_on_error && let Some(first) = errors.first().cloned() {
                warn!(index = first.index, code = %first.error.code, "Aborting batch on item failure");
                return Err(BatchAborted {
                    error: first,
                    completed: BatchOutcome {
                        success_count: results.len(),
                        error_count: errors.len(),
                        results,
                        errors,
                    },
                });
            }
        }

        Ok(BatchOutcome {
            success_count: results.len(),
            error_count: errors.len(),
            results,
            errors,
        })
    }
}
