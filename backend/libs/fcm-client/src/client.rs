use std::path::Path;
use std::sync::Arc;

use resilience::RetryConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{ClientConfig, FcmSettings};
use crate::errors::FCMError;
use crate::messaging::{App, ServiceAccountApp};
use crate::models::{Message, Response};
use crate::transport::{AppSender, HttpSender, Sender};

/// Firebase Cloud Messaging Client
///
/// Validates outbound messages and hands them to the transport chosen at
/// construction: a direct HTTP POST authorized by a server API key, or a
/// credential-based app that owns an authenticated messaging handle.
///
/// The client is cheap to share behind an `Arc` and safe to call
/// concurrently.
pub struct FCMClient {
    sender: Box<dyn Sender>,
    retry: RetryConfig,
}

impl FCMClient {
    /// Create a client for the direct HTTP transport with default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self, FCMError> {
        Self::with_api_key(api_key, ClientConfig::default())
    }

    /// Create a client for the direct HTTP transport
    ///
    /// # Arguments
    /// * `api_key` - Server key sent as `Authorization: key=<api_key>`
    /// * `config` - Endpoint, timeout and HTTP client overrides
    pub fn with_api_key(api_key: impl Into<String>, config: ClientConfig) -> Result<Self, FCMError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(FCMError::InvalidApiKey);
        }
        Self::check_config(&config)?;

        let sender = HttpSender::new(
            api_key,
            config.endpoint.clone(),
            config.timeout,
            config.http_client.clone().unwrap_or_default(),
        );

        info!(endpoint = %config.endpoint, "Initialized FCM client with API key");
        Ok(Self::from_parts(Box::new(sender), &config))
    }

    /// Create a client for the SDK-mediated transport from a service account file
    pub fn with_credentials(
        path: impl AsRef<Path>,
        config: ClientConfig,
    ) -> Result<Self, FCMError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(FCMError::InvalidCredentialsPath);
        }
        Self::check_config(&config)?;

        let mut app = ServiceAccountApp::from_file(path).map_err(FCMError::AppInit)?;
        if let Some(http_client) = config.http_client.clone() {
            app = app.with_http_client(http_client);
        }

        info!(project_id = %app.project_id(), "Initialized FCM client with credentials");
        Ok(Self::with_app(Arc::new(app), config))
    }

    /// Create a client for the SDK-mediated transport over any credential-based app
    pub fn with_app(app: Arc<dyn App>, config: ClientConfig) -> Self {
        let sender = AppSender::new(app, config.timeout, config.empty_recipients);
        Self::from_parts(Box::new(sender), &config)
    }

    /// Build from environment settings; the API key wins when both are set.
    pub fn from_settings(settings: &FcmSettings) -> Result<Self, FCMError> {
        let config = settings.client_config();
        match (&settings.api_key, &settings.credentials_path) {
            (Some(api_key), _) if !api_key.is_empty() => Self::with_api_key(api_key, config),
            (_, Some(path)) => Self::with_credentials(path, config),
            _ => Err(FCMError::InvalidApiKey),
        }
    }

    fn check_config(config: &ClientConfig) -> Result<(), FCMError> {
        if config.endpoint.is_empty() {
            return Err(FCMError::InvalidEndpoint);
        }
        if config.timeout.is_zero() {
            return Err(FCMError::InvalidTimeout);
        }
        Ok(())
    }

    fn from_parts(sender: Box<dyn Sender>, config: &ClientConfig) -> Self {
        let retry = RetryConfig {
            attempt_timeout: config.timeout,
            min_backoff: config.min_backoff,
            max_backoff: config.max_backoff,
            ..Default::default()
        };
        Self { sender, retry }
    }

    /// Name of the transport serving this client (`"http"` or `"app"`)
    pub fn transport(&self) -> &'static str {
        self.sender.name()
    }

    /// Send a message once, without retrying in case of service
    /// unavailability. Non-success statuses are returned as errors.
    pub async fn send(&self, message: &Message) -> Result<Response, FCMError> {
        self.send_with_cancellation(message, &CancellationToken::new())
            .await
    }

    /// Like [`send`](Self::send), aborting when `cancel` fires.
    pub async fn send_with_cancellation(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<Response, FCMError> {
        message.validate()?;
        debug!(transport = self.sender.name(), "Sending FCM message");
        self.sender.send(message, cancel).await
    }

    /// Send a message, retrying connection and server errors up to
    /// `max_attempts` attempts in total. Only the direct HTTP transport
    /// supports retries.
    pub async fn send_with_retry(
        &self,
        message: &Message,
        max_attempts: u32,
    ) -> Result<Response, FCMError> {
        self.send_with_retry_and_cancellation(message, max_attempts, &CancellationToken::new())
            .await
    }

    /// Like [`send_with_retry`](Self::send_with_retry), aborting the
    /// in-flight attempt and any further attempts when `cancel` fires.
    pub async fn send_with_retry_and_cancellation(
        &self,
        message: &Message,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<Response, FCMError> {
        message.validate()?;
        let policy = self.retry.clone().with_max_attempts(max_attempts);
        debug!(
            transport = self.sender.name(),
            max_attempts, "Sending FCM message with retry"
        );
        self.sender.send_with_retry(message, &policy, cancel).await
    }
}
