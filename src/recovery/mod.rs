//! Failure classification and bounded retry.

pub mod batch;
pub mod classifier;
pub mod retry;
pub mod types;

pub use batch::{BatchAborted, BatchError, BatchOptions, BatchOutcome};
pub use classifier::{Classification, classify};
pub use retry::{
    BoxFuture, ErrorStatistics, RetryExecutor, RetryOverrides, RetryPolicy, log_classified,
};
pub use types::{ClassifiedError, ErrorCode, ErrorContext, Severity};

#[cfg(test)]
mod tests;
