//! Boundary to an authenticated messaging provider
//!
//! The SDK-mediated transport talks to the provider only through [`App`] and
//! [`MessagingClient`]. [`ServiceAccountApp`] is the production implementation
//! backed by a Google service account and the FCM HTTP v1 API.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::ErrorKind;

pub mod service_account;

pub use service_account::{FcmV1Client, ServiceAccountApp, ServiceAccountKey};

/// Notification part of a provider message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Message for exactly one registration token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMessage {
    pub token: String,
    pub notification: Option<PushNotification>,
    pub data: HashMap<String, String>,
}

/// Message for a set of registration tokens, sent in one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub notification: Option<PushNotification>,
    pub data: HashMap<String, String>,
}

impl MulticastMessage {
    /// Per-token message carrying the shared payload
    pub fn for_token(&self, token: &str) -> TokenMessage {
        TokenMessage {
            token: token.to_string(),
            notification: self.notification.clone(),
            data: self.data.clone(),
        }
    }
}

/// Provider result of a multicast call: one outcome per token, in order
#[derive(Debug, Clone)]
pub struct BatchResponse {
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<Result<String, MessagingError>>,
}

impl BatchResponse {
    pub fn from_responses(responses: Vec<Result<String, MessagingError>>) -> Self {
        let success_count = responses.iter().filter(|r| r.is_ok()).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
        }
    }
}

/// Messaging Provider Error Types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("failed to load credentials: {0}")]
    Credentials(String),

    #[error("failed to get access token: {0}")]
    Auth(String),

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider rejected request ({kind}): {message}")]
    Api { kind: ErrorKind, message: String },
}

impl MessagingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MessagingError::Credentials(_) | MessagingError::Auth(_) => ErrorKind::Authentication,
            MessagingError::Transport(_) => ErrorKind::Unavailable,
            MessagingError::Api { kind, .. } => *kind,
        }
    }

    /// Provider-facing message text without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            MessagingError::Credentials(message)
            | MessagingError::Auth(message)
            | MessagingError::Transport(message)
            | MessagingError::Api { message, .. } => message,
        }
    }
}

/// Authenticated messaging handle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Send to one token, returning the provider message id
    async fn send(&self, message: &TokenMessage) -> Result<String, MessagingError>;

    /// Send to every token in one call
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, MessagingError>;
}

/// Credential-based application able to hand out a messaging handle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait App: Send + Sync {
    async fn messaging(&self) -> Result<Arc<dyn MessagingClient>, MessagingError>;
}
