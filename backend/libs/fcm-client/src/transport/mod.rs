//! Transport strategies
//!
//! A [`Sender`] is picked once when the client is built and used for every
//! send afterwards.

use async_trait::async_trait;
use resilience::RetryConfig;
use tokio_util::sync::CancellationToken;

use crate::errors::FCMError;
use crate::models::{Message, Response};

pub mod app;
pub mod http;

pub use app::AppSender;
pub use http::HttpSender;

/// Delivers an already validated message and returns the normalized response
#[async_trait]
pub trait Sender: Send + Sync {
    /// Short transport name used in logs and errors
    fn name(&self) -> &'static str;

    /// Single attempt bounded by the client timeout
    async fn send(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<Response, FCMError>;

    /// Bounded retries; transports that cannot retry safely refuse.
    async fn send_with_retry(
        &self,
        _message: &Message,
        _policy: &RetryConfig,
        _cancel: &CancellationToken,
    ) -> Result<Response, FCMError> {
        Err(FCMError::RetryUnsupported(self.name()))
    }
}
