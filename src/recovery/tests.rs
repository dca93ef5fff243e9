use crate::qbxml::TransformError;
use crate::recovery::*;
use futures::FutureExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Policy with tiny, deterministic delays
fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        initial_delay_ms: 1,
        max_delay_ms: 5,
        jitter: false,
        ..Default::default()
    }
}

#[test]
fn test_default_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.total_attempts(), 4);
    assert!(policy.jitter);
    assert_eq!(policy.retryable_codes.len(), 7);
    assert!(policy.retryable_codes.contains(&ErrorCode::QbBusy));
}

#[test]
fn test_backoff_is_exponential_and_capped() {
    let policy = RetryPolicy {
        jitter: false,
        ..Default::default()
    };
    assert_eq!(policy.base_delay(0), Duration::from_millis(1000));
    assert_eq!(policy.base_delay(1), Duration::from_millis(2000));
    assert_eq!(policy.base_delay(3), Duration::from_millis(8000));
    assert_eq!(policy.base_delay(10), Duration::from_millis(30_000));
    assert_eq!(policy.delay_for(2), Duration::from_millis(4000));

    let jittered = RetryPolicy::default();
    for attempt in 0..4 {
        let delay = jittered.delay_for(attempt);
        let base = jittered.base_delay(attempt);
        assert!(delay >= base);
        assert!(delay <= base + Duration::from_millis(1000));
    }
}

#[test]
fn test_overrides_resolve_against_defaults() {
    let defaults = RetryPolicy::default();
    let overrides = RetryOverrides {
        max_retries: Some(1),
        jitter: Some(false),
        ..Default::default()
    };

    let resolved = overrides.resolve(&defaults);
    assert_eq!(resolved.max_retries, 1);
    assert!(!resolved.jitter);
    assert_eq!(resolved.initial_delay_ms, defaults.initial_delay_ms);
    assert_eq!(resolved.retryable_codes, defaults.retryable_codes);

    assert_eq!(RetryOverrides::default().resolve(&defaults), defaults);
}

#[test]
fn test_retry_requires_classification_and_code_list() {
    let policy = RetryPolicy {
        retryable_codes: vec![ErrorCode::Timeout],
        ..Default::default()
    };

    assert!(policy.should_retry(&classify("request timed out")));
    assert!(!policy.should_retry(&classify("network unreachable")));

    let forced = ClassifiedError::new("odd", ErrorCode::Timeout, Severity::Error, false);
    assert!(!policy.should_retry(&forced));
}

#[tokio::test]
async fn test_retryable_failure_runs_max_retries_plus_one() {
    let executor = RetryExecutor::new(fast_policy());
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let result: Result<(), ClassifiedError> = executor
        .execute(
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("network unreachable".to_string())
                }
                .boxed()
            },
            &ErrorContext::for_request("req-1"),
        )
        .await;

    let error = result.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(error.code, ErrorCode::NetworkError);
    assert_eq!(error.context.request_id.as_deref(), Some("req-1"));
    assert_eq!(error.context.attempt, Some(4));
    assert_eq!(error.context.total_attempts, Some(4));

    let stats = executor.get_error_statistics().await;
    assert_eq!(stats.total_errors, 4);
    assert_eq!(stats.total_retries, 3);
    assert_eq!(stats.consecutive_failures, 4);
    assert_eq!(stats.error_types.get("NETWORK_ERROR"), Some(&4));
}

#[tokio::test]
async fn test_non_retryable_failure_is_classified_once() {
    let executor = RetryExecutor::new(fast_policy());
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let error = executor
        .execute(
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>("malformed document")
                }
                .boxed()
            },
            &ErrorContext::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(error.code, ErrorCode::ParsingError);
    assert!(!error.retryable);
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let executor = RetryExecutor::new(fast_policy());
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let value = executor
        .execute(
            move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("QuickBooks application is busy".to_string())
                    } else {
                        Ok(42)
                    }
                }
                .boxed()
            },
            &ErrorContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let stats = executor.get_error_statistics().await;
    assert_eq!(stats.consecutive_failures, 0);
    assert_eq!(stats.error_types.get("QB_BUSY"), Some(&2));
}

#[tokio::test]
async fn test_cancellation_aborts_retry_delay() {
    let executor = RetryExecutor::new(RetryPolicy {
        initial_delay_ms: 60_000,
        jitter: false,
        ..Default::default()
    });
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let error = tokio::time::timeout(
        Duration::from_secs(5),
        executor.execute_with_cancel(
            || async { Err::<(), _>("request timed out") }.boxed(),
            &ErrorContext::default(),
            &cancel,
        ),
    )
    .await
    .expect("cancellation should interrupt the delay")
    .unwrap_err();

    assert_eq!(error.code, ErrorCode::Cancelled);
    assert!(error.message.contains("timed out"));
}

#[tokio::test]
async fn test_batch_continues_past_failing_item() {
    let executor = RetryExecutor::new(fast_policy());
    let items: Vec<u32> = (0..5).collect();

    let outcome = executor
        .process_batch(
            &items,
            |item, index| {
                async move {
                    if index == 2 {
                        Err(format!("invalid record {}", item))
                    } else {
                        Ok(item * 10)
                    }
                }
                .boxed()
            },
            BatchOptions::default(),
            &ErrorContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.success_count, 4);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(outcome.results, vec![0, 10, 30, 40]);
    assert_eq!(outcome.errors[0].index, 2);
    assert_eq!(outcome.errors[0].error.code, ErrorCode::ValidationError);
    assert_eq!(
        outcome.errors[0].error.context.request_id.as_deref(),
        Some("batch-2")
    );
}

#[tokio::test]
async fn test_batch_aborts_without_continue_on_error() {
    let executor = RetryExecutor::new(fast_policy());
    let items = vec!["a", "b", "c", "d", "e", "f", "g"];
    let processed = Arc::new(AtomicUsize::new(0));

    let counter = processed.clone();
    let failure = executor
        .process_batch(
            &items,
            move |_, index| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if index == 3 {
                        Err("required field missing")
                    } else {
                        Ok(index)
                    }
                }
                .boxed()
            },
            BatchOptions {
                continue_on_error: false,
                max_concurrent: 2,
            },
            &ErrorContext::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.error.index, 3);
    // The window holding the failure completes; later windows never start
    assert_eq!(processed.load(Ordering::SeqCst), 4);
    assert_eq!(failure.completed.results, vec![0, 1, 2]);
    assert_eq!(failure.completed.success_count, 3);
    assert_eq!(failure.completed.error_count, 1);
}

#[tokio::test]
async fn test_batch_item_context_keeps_caller_request_id() {
    let executor = RetryExecutor::new(fast_policy());
    let items = vec!["ok", "bad"];

    let outcome = executor
        .process_batch(
            &items,
            |item, _| {
                async move {
                    if *item == "bad" {
                        Err("invalid record")
                    } else {
                        Ok(())
                    }
                }
                .boxed()
            },
            BatchOptions::default(),
            &ErrorContext::for_request("import-42"),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.errors[0].error.context.request_id.as_deref(),
        Some("import-42-1")
    );
}

#[test]
fn test_delay_saturates_on_extreme_config() {
    let policy = RetryPolicy {
        initial_delay_ms: u64::MAX,
        max_delay_ms: u64::MAX,
        jitter: true,
        max_jitter_ms: u64::MAX,
        ..Default::default()
    };
    assert!(policy.delay_for(10) >= Duration::from_millis(u64::MAX));
}

#[tokio::test]
async fn test_batch_window_bounds_concurrency() {
    let executor = RetryExecutor::new(fast_policy());
    let items: Vec<usize> = (0..9).collect();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let (current, max_seen) = (in_flight.clone(), peak.clone());
    let outcome = executor
        .process_batch(
            &items,
            move |item, _| {
                let (current, max_seen) = (current.clone(), max_seen.clone());
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(*item)
                }
                .boxed()
            },
            BatchOptions {
                continue_on_error: true,
                max_concurrent: 3,
            },
            &ErrorContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.results, items);
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[test]
fn test_conversions_classify() {
    let status = TransformError::ResponseStatus {
        code: "3100".to_string(),
        message: "The name \"Acme\" of the list element is already in use.".to_string(),
    };
    let error = ClassifiedError::from(status);
    assert_eq!(error.code, ErrorCode::DuplicateName);
    assert_eq!(error.legacy_code.as_deref(), Some("3100"));

    let original = ClassifiedError::new("keep me", ErrorCode::ServerError, Severity::Error, true);
    let wrapped = anyhow::Error::new(original.clone());
    assert_eq!(ClassifiedError::from(wrapped), original);

    let contextual = anyhow::anyhow!("socket closed").context("sending handoff");
    assert_eq!(
        ClassifiedError::from(contextual).code,
        ErrorCode::NetworkError
    );
}
