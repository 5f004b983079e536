use std::time::Duration;

use resilience::{RetryError, Retryable};
use thiserror::Error;

use crate::classify::ErrorClass;
use crate::messaging::MessagingError;
use crate::models::Response;
use crate::validate::ValidationError;

/// FCM Client Error Types
#[derive(Error, Debug)]
pub enum FCMError {
    #[error("client API key is invalid")]
    InvalidApiKey,

    #[error("credentials path is invalid")]
    InvalidCredentialsPath,

    #[error("endpoint is invalid")]
    InvalidEndpoint,

    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("failed to initialize messaging app: {0}")]
    AppInit(#[source] MessagingError),

    #[error("invalid message: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("{status} error: {reason}")]
    Server { status: u16, reason: String },

    #[error("{status} error: {reason}")]
    Client { status: u16, reason: String },

    #[error("failed to decode FCM response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("send cancelled")]
    Cancelled,

    #[error("retries are not supported by the {0} transport")]
    RetryUnsupported(&'static str),

    /// The provider rejected the whole call; `response` reports every
    /// recipient as failed.
    #[error("messaging provider error: {source}")]
    Provider {
        #[source]
        source: MessagingError,
        response: Box<Response>,
    },
}

impl FCMError {
    /// Error Classifier result for direct transport failures
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            FCMError::Connection(_) | FCMError::Timeout(_) => Some(ErrorClass::Connection),
            FCMError::Server { .. } => Some(ErrorClass::Server),
            FCMError::Client { .. } | FCMError::Decode(_) => Some(ErrorClass::Client),
            _ => None,
        }
    }

    /// Normalized response attached to a provider failure
    pub fn response(&self) -> Option<&Response> {
        match self {
            FCMError::Provider { response, .. } => Some(response),
            _ => None,
        }
    }
}

impl Retryable for FCMError {
    fn is_retryable(&self) -> bool {
        self.class().is_some_and(|class| class.is_retryable())
    }
}

impl From<RetryError<FCMError>> for FCMError {
    fn from(err: RetryError<FCMError>) -> Self {
        match err {
            RetryError::Operation(e) => e,
            RetryError::Timeout(duration) => FCMError::Timeout(duration),
            RetryError::Cancelled => FCMError::Cancelled,
        }
    }
}

impl From<resilience::TimeoutError> for FCMError {
    fn from(err: resilience::TimeoutError) -> Self {
        match err {
            resilience::TimeoutError::Elapsed(duration) => FCMError::Timeout(duration),
            resilience::TimeoutError::Cancelled => FCMError::Cancelled,
        }
    }
}
