/// Deadline wrappers for async operations
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutError {
    #[error("Operation timed out after {0:?}")]
    Elapsed(Duration),
    #[error("Operation cancelled")]
    Cancelled,
}

/// Execute a future with timeout
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    timeout(duration, future)
        .await
        .map_err(|_| TimeoutError::Elapsed(duration))
}

/// Execute a future under its own deadline, aborting early if `cancel` fires.
///
/// Cancellation is checked before the future is first polled, so an already
/// cancelled token never starts the operation.
pub async fn with_cancellable_timeout<F, T>(
    duration: Duration,
    cancel: &CancellationToken,
    future: F,
) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TimeoutError::Cancelled),
        result = timeout(duration, future) => result.map_err(|_| TimeoutError::Elapsed(duration)),
    }
}
