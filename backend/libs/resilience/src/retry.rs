/// Bounded retry driven by an error classifier
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::timeout::{with_cancellable_timeout, TimeoutError};

/// Classifies a failure as transient (worth another attempt) or terminal.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one. 0 and 1 both mean a single attempt.
    pub max_attempts: u32,
    /// Deadline applied to every attempt independently
    pub attempt_timeout: Duration,
    /// Backoff after the first failed attempt, grows with the square of the attempt number
    pub min_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Add random jitter to backoff (±30%)
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout: Duration::from_secs(30),
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            jitter: false,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Retry immediately after a transient failure
    pub fn without_backoff(mut self) -> Self {
        self.min_backoff = Duration::ZERO;
        self
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the attempt following `attempt` failed ones.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = attempt.saturating_mul(attempt);
        let base = self
            .min_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff);

        if self.jitter && !base.is_zero() {
            let jitter_factor = 1.0 + rand::thread_rng().gen_range(-0.3..0.3);
            Duration::from_millis((base.as_millis() as f64 * jitter_factor) as u64)
        } else {
            base
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Operation(E),
}

impl<E> RetryError<E> {
    pub fn into_operation(self) -> Option<E> {
        match self {
            RetryError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Execute an operation up to `config.max_attempts` times.
///
/// `f` receives the 1-based attempt number. Every attempt gets a fresh
/// `attempt_timeout` deadline. Non-retryable errors are returned after the
/// attempt that produced them; when attempts run out the last error is
/// returned as-is. Firing `cancel` aborts the in-flight attempt or backoff
/// and no further attempt starts.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = config.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let last_error = match with_cancellable_timeout(config.attempt_timeout, cancel, f(attempt))
            .await
        {
            Ok(Ok(result)) => return Ok(result),
            Ok(Err(e)) if !e.is_retryable() => {
                debug!(attempt, error = %e, "Non-retryable failure, giving up");
                return Err(RetryError::Operation(e));
            }
            Ok(Err(e)) => RetryError::Operation(e),
            Err(TimeoutError::Elapsed(duration)) => RetryError::Timeout(duration),
            Err(TimeoutError::Cancelled) => return Err(RetryError::Cancelled),
        };

        if attempt >= max_attempts {
            if max_attempts > 1 {
                warn!(max_attempts, error = %last_error, "Max attempts reached");
            }
            return Err(last_error);
        }

        let delay = config.backoff_for(attempt);

        warn!(
            "Retry attempt {}/{} after {}, waiting {:?}",
            attempt + 1,
            max_attempts,
            last_error,
            delay
        );

        if !delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient => write!(f, "transient"),
                TestError::Fatal => write!(f, "fatal"),
            }
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn immediate(max_attempts: u32) -> RetryConfig {
        RetryConfig::default()
            .with_max_attempts(max_attempts)
            .without_backoff()
    }

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&immediate(3), &CancellationToken::new(), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TestError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&immediate(3), &CancellationToken::new(), move |_| {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_max_attempts_exceeded() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&immediate(4), &CancellationToken::new(), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(TestError::Transient) }
        })
        .await;

        assert!(matches!(
            result,
            Err(RetryError::Operation(TestError::Transient))
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&immediate(5), &CancellationToken::new(), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(TestError::Fatal) }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Operation(TestError::Fatal))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_means_one() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let _ = with_retry(&immediate(0), &CancellationToken::new(), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(TestError::Transient) }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_numbers_are_passed_through() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let _ = with_retry(&immediate(3), &CancellationToken::new(), move |attempt| {
            seen_clone.lock().unwrap().push(attempt);
            async { Err::<i32, _>(TestError::Transient) }
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quadratic_backoff_timing() {
        let config = RetryConfig {
            max_attempts: 4,
            min_backoff: Duration::from_millis(10),
            ..Default::default()
        };

        let start = tokio::time::Instant::now();

        let _ = with_retry(&config, &CancellationToken::new(), |_| async {
            Err::<i32, _>(TestError::Transient)
        })
        .await;

        // 10ms + 40ms + 90ms
        assert!(start.elapsed() >= Duration::from_millis(140));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            ..Default::default()
        };

        assert_eq!(config.backoff_for(1), Duration::from_secs(1));
        assert_eq!(config.backoff_for(2), Duration::from_secs(4));
        assert_eq!(config.backoff_for(3), Duration::from_secs(5));
        assert_eq!(config.backoff_for(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_jitter_stays_in_range() {
        let config = RetryConfig {
            min_backoff: Duration::from_millis(1000),
            jitter: true,
            ..Default::default()
        };

        for _ in 0..50 {
            let delay = config.backoff_for(1);
            assert!(delay >= Duration::from_millis(700));
            assert!(delay <= Duration::from_millis(1300));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retried_and_reported() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let config = immediate(2).with_attempt_timeout(Duration::from_millis(50));

        let result = with_retry(&config, &CancellationToken::new(), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, TestError>(1)
            }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Timeout(d)) if d == Duration::from_millis(50)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
