use std::time::Duration;

use serde::Deserialize;

/// Endpoint URL of the FCM legacy HTTP service
pub const DEFAULT_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

/// Per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the SDK-mediated transport treats a message without registration ids
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyRecipients {
    /// Hand the empty token list to the provider's multicast call
    #[default]
    Multicast,
    /// Fail validation before any provider call
    Reject,
}

/// FCM client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub http_client: Option<reqwest::Client>,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub empty_recipients: EmptyRecipients,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            http_client: None,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            empty_recipients: EmptyRecipients::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, pooling)
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Backoff between retry attempts; `Duration::ZERO` retries immediately
    pub fn with_backoff(mut self, min_backoff: Duration, max_backoff: Duration) -> Self {
        self.min_backoff = min_backoff;
        self.max_backoff = max_backoff;
        self
    }

    pub fn with_empty_recipients(mut self, policy: EmptyRecipients) -> Self {
        self.empty_recipients = policy;
        self
    }
}

/// Client settings read from `FCM_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct FcmSettings {
    pub api_key: Option<String>,
    pub credentials_path: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub empty_recipients: EmptyRecipients,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_max_attempts() -> u32 {
    1
}

impl FcmSettings {
    /// Load settings, reading a `.env` file first when present
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("FCM_").from_env::<FcmSettings>()
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_endpoint(self.endpoint.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_empty_recipients(self.empty_recipients)
    }
}
