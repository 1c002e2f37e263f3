//! Fan-out/fan-in over independent remote calls
//!
//! Every call runs in its own spawned task under its own timeout. The join
//! waits for all of them to settle and returns outcomes in input order.
//! Cancellation stops dispatch of calls not yet started and short-circuits
//! the join; calls already in flight are left to finish on their own.

use crate::config::EngineConfig;
use crate::error::{AttendanceError, TransportError};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Dispatch limits for one batch
#[derive(Debug, Clone, Copy)]
pub(crate) struct FanOutPolicy {
    pub(crate) timeout: Duration,
    pub(crate) max_in_flight: Option<usize>,
}

impl FanOutPolicy {
    pub(crate) fn from_config(config: &EngineConfig) -> Self {
        Self {
            timeout: config.request_timeout(),
            max_in_flight: config.max_in_flight,
        }
    }
}

enum Dispatch<T> {
    Settled(Result<T, TransportError>),
    NotDispatched,
}

/// Run `op` for every item concurrently and collect each outcome.
///
/// Individual failures are returned in place, never raised.
///
/// # Errors
/// `AttendanceError::Cancelled` if `cancel` fires before or during the batch.
pub(crate) async fn settle_all<I, T, F, Fut>(
    items: Vec<I>,
    policy: FanOutPolicy,
    cancel: &CancellationToken,
    op: F,
) -> Result<Vec<Result<T, TransportError>>, AttendanceError>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(AttendanceError::Cancelled);
    }

    let limiter = policy.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
    let after_ms = u64::try_from(policy.timeout.as_millis()).unwrap_or(u64::MAX);

    let handles: Vec<_> = items
        .into_iter()
        .map(|item| {
            let call = op(item);
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            let timeout = policy.timeout;

            tokio::spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return Dispatch::NotDispatched,
                    },
                    None => None,
                };
                if cancel.is_cancelled() {
                    return Dispatch::NotDispatched;
                }
                match tokio::time::timeout(timeout, call).await {
                    Ok(outcome) => Dispatch::Settled(outcome),
                    Err(_) => Dispatch::Settled(Err(TransportError::Timeout { after_ms })),
                }
            })
        })
        .collect();

    let joined = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AttendanceError::Cancelled),
        joined = join_all(handles) => joined,
    };

    let mut outcomes = Vec::with_capacity(joined.len());
    for result in joined {
        match result {
            Ok(Dispatch::Settled(outcome)) => outcomes.push(outcome),
            Ok(Dispatch::NotDispatched) => return Err(AttendanceError::Cancelled),
            Err(join_error) => outcomes.push(Err(TransportError::Network(format!(
                "dispatch task failed: {join_error}"
            )))),
        }
    }
    Ok(outcomes)
}
