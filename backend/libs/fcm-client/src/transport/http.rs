use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use resilience::{with_cancellable_timeout, with_retry, RetryConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Sender;
use crate::classify::{classify_status, classify_transport, ErrorClass};
use crate::errors::FCMError;
use crate::models::{Message, Response};

/// Direct transport: authenticated POST of the JSON message to the endpoint
pub struct HttpSender {
    api_key: String,
    endpoint: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpSender {
    pub fn new(
        api_key: String,
        endpoint: String,
        timeout: Duration,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            api_key,
            endpoint,
            timeout,
            http_client,
        }
    }

    fn encode(message: &Message) -> Result<Vec<u8>, FCMError> {
        serde_json::to_vec(message).map_err(FCMError::Encode)
    }

    /// One POST of an encoded body
    async fn post(&self, body: Vec<u8>) -> Result<Response, FCMError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("key={}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| FCMError::Connection(e.to_string()))?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
        match classify_status(status) {
            None => {}
            Some(ErrorClass::Server) => {
                warn!(status = status.as_u16(), "FCM server error");
                return Err(FCMError::Server {
                    status: status.as_u16(),
                    reason,
                });
            }
            Some(_) => {
                return Err(FCMError::Client {
                    status: status.as_u16(),
                    reason,
                });
            }
        }

        let bytes = response.bytes().await.map_err(|e| match classify_transport(&e) {
            ErrorClass::Connection => FCMError::Connection(e.to_string()),
            _ => FCMError::Client {
                status: status.as_u16(),
                reason: e.to_string(),
            },
        })?;

        serde_json::from_slice(&bytes).map_err(FCMError::Decode)
    }
}

#[async_trait]
impl Sender for HttpSender {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<Response, FCMError> {
        let body = Self::encode(message)?;

        let response = with_cancellable_timeout(self.timeout, cancel, self.post(body)).await??;
        debug!(
            success = response.success,
            failure = response.failure,
            "FCM send complete"
        );
        Ok(response)
    }

    async fn send_with_retry(
        &self,
        message: &Message,
        policy: &RetryConfig,
        cancel: &CancellationToken,
    ) -> Result<Response, FCMError> {
        // Encoded once, reused by every attempt
        let body = Self::encode(message)?;

        let policy = policy.clone().with_attempt_timeout(self.timeout);
        let response = with_retry(&policy, cancel, |attempt| {
            debug!(attempt, max_attempts = policy.max_attempts, "FCM send attempt");
            self.post(body.clone())
        })
        .await?;

        debug!(
            success = response.success,
            failure = response.failure,
            "FCM send complete"
        );
        Ok(response)
    }
}
