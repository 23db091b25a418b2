use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::event_sourcing::StoreError;
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig, RetryResult};
use super::errors::ServiceError;

/// Run an order-store read with backoff on transient failures.
///
/// Only reads go through here. Appends are compare-and-swap writes and are
/// never replayed on the caller's behalf.
pub(super) async fn read_with_retry<F, Fut, T>(
    operation_name: &'static str,
    retry: &RetryConfig,
    metrics: Option<&Metrics>,
    mut read: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = AtomicU32::new(0);

    let outcome = retry_on_transient(operation_name, retry, |attempt| {
        attempts.store(attempt, Ordering::Relaxed);
        if attempt > 1 {
            if let Some(metrics) = metrics {
                metrics.record_retry_attempt(operation_name, attempt);
            }
        }
        read()
    })
    .await;

    if attempts.load(Ordering::Relaxed) > 1 {
        if let Some(metrics) = metrics {
            metrics.record_retry_outcome(operation_name, matches!(outcome, RetryResult::Success(_)));
        }
    }

    outcome.into_result().map_err(ServiceError::from)
}
