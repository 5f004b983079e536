/// Resilience patterns for outbound calls
///
/// This library provides the retry and deadline primitives used by the push
/// clients:
/// - **Retry**: bounded attempts driven by a caller-supplied error classifier,
///   with quadratic backoff and optional jitter
/// - **Timeout**: a fresh deadline per attempt that also observes a
///   caller-supplied cancellation token
///
/// # Example: Retrying a transient call
///
/// ```rust,no_run
/// use resilience::{with_retry, RetryConfig, Retryable};
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug)]
/// struct Unavailable;
///
/// impl std::fmt::Display for Unavailable {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "service unavailable")
///     }
/// }
///
/// impl Retryable for Unavailable {
///     fn is_retryable(&self) -> bool {
///         true
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let config = RetryConfig::default().with_max_attempts(3);
///     let cancel = CancellationToken::new();
///
///     let result = with_retry(&config, &cancel, |_attempt| async {
///         // Your network call here
///         Ok::<_, Unavailable>(())
///     })
///     .await;
/// }
/// ```

pub mod retry;
pub mod timeout;

pub use retry::{with_retry, RetryConfig, RetryError, Retryable};
pub use timeout::{with_cancellable_timeout, with_timeout, TimeoutError};
pub use tokio_util::sync::CancellationToken;
