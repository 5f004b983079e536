use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::future::join_all;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    App, BatchResponse, MessagingClient, MessagingError, MulticastMessage, PushNotification,
    TokenMessage,
};
use crate::models::ErrorKind;

/// Default FCM HTTP v1 host
pub const FCM_V1_BASE_URL: &str = "https://fcm.googleapis.com";

/// Maximum tokens accepted in one multicast call
pub const MAX_MULTICAST_TOKENS: usize = 500;

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Firebase Service Account Key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub auth_uri: String,
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MessagingError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MessagingError::Credentials(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&raw).map_err(|e| {
            MessagingError::Credentials(format!("invalid service account JSON: {}", e))
        })
    }
}

/// OAuth2 Token Cache
#[derive(Debug, Clone)]
struct TokenCache {
    access_token: String,
    expires_at: i64,
}

/// JWT Claims for Google OAuth2
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    sub: String,
    scope: String,
    aud: String,
    exp: i64,
    iat: i64,
}

/// Google OAuth2 Token Response
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: i64,
}

/// FCM v1 Message Request
#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    message: FcmMessageContent<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessageContent<'a> {
    token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<&'a PushNotification>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    data: &'a HashMap<String, String>,
}

/// FCM API Response
#[derive(Debug, Deserialize)]
struct FcmApiResponse {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Credential-based app backed by a Google service account
pub struct ServiceAccountApp {
    credentials: Arc<ServiceAccountKey>,
    http_client: reqwest::Client,
    base_url: String,
}

impl ServiceAccountApp {
    pub fn new(credentials: ServiceAccountKey) -> Self {
        Self {
            credentials: Arc::new(credentials),
            http_client: reqwest::Client::new(),
            base_url: FCM_V1_BASE_URL.to_string(),
        }
    }

    /// Load the service account JSON file at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MessagingError> {
        Ok(Self::new(ServiceAccountKey::from_file(path)?))
    }

    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Override the FCM host, e.g. for an emulator
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.credentials.project_id
    }
}

#[async_trait]
impl App for ServiceAccountApp {
    async fn messaging(&self) -> Result<Arc<dyn MessagingClient>, MessagingError> {
        let encoding_key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| MessagingError::Credentials(format!("Failed to parse private key: {}", e)))?;

        info!(
            project_id = %self.credentials.project_id,
            "Initialized FCM v1 messaging client"
        );

        Ok(Arc::new(FcmV1Client {
            credentials: self.credentials.clone(),
            encoding_key,
            token_cache: Mutex::new(None),
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
        }))
    }
}

/// Firebase Cloud Messaging HTTP v1 client
///
/// Manages OAuth2 token generation and caching, and delivers messages one
/// token at a time. Multicast fans out concurrently and keeps token order.
pub struct FcmV1Client {
    credentials: Arc<ServiceAccountKey>,
    encoding_key: EncodingKey,
    token_cache: Mutex<Option<TokenCache>>,
    http_client: reqwest::Client,
    base_url: String,
}

impl FcmV1Client {
    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url.trim_end_matches('/'),
            self.credentials.project_id
        )
    }

    /// Get access token from service account (with caching)
    pub async fn get_access_token(&self) -> Result<String, MessagingError> {
        // Held across the refresh so concurrent callers wait for one exchange
        let mut cache = self.token_cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > Utc::now().timestamp() + 60 {
                return Ok(cached.access_token.clone());
            }
        }

        let now = Utc::now();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            sub: self.credentials.client_email.clone(),
            scope: MESSAGING_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.credentials.private_key_id.clone());

        let assertion = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| MessagingError::Auth(format!("Failed to encode JWT: {}", e)))?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| MessagingError::Auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MessagingError::Auth(format!(
                "Token request failed with status: {}",
                response.status()
            )));
        }

        let token_response: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| MessagingError::Auth(format!("Failed to parse token response: {}", e)))?;

        debug!(expires_in = token_response.expires_in, "Refreshed FCM access token");

        *cache = Some(TokenCache {
            access_token: token_response.access_token.clone(),
            expires_at: Utc::now().timestamp() + token_response.expires_in,
        });

        Ok(token_response.access_token)
    }
}

#[async_trait]
impl MessagingClient for FcmV1Client {
    async fn send(&self, message: &TokenMessage) -> Result<String, MessagingError> {
        let access_token = self.get_access_token().await?;

        let body = FcmMessage {
            message: FcmMessageContent {
                token: &message.token,
                notification: message.notification.as_ref(),
                data: &message.data,
            },
        };

        let response = self
            .http_client
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| MessagingError::Transport(format!("FCM send request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let fcm_response: FcmApiResponse = response.json().await.map_err(|e| {
                MessagingError::Transport(format!("Failed to parse FCM response: {}", e))
            })?;

            return fcm_response.name.ok_or_else(|| MessagingError::Api {
                kind: ErrorKind::Unknown,
                message: "FCM response has no message name".to_string(),
            });
        }

        let error_text = response.text().await.unwrap_or_default();
        let token_prefix = message.token.chars().take(8).collect::<String>();
        warn!(status = %status, token = %token_prefix, "FCM v1 send rejected");

        Err(api_error(status, &error_text))
    }

    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, MessagingError> {
        if message.tokens.is_empty() {
            return Err(MessagingError::Api {
                kind: ErrorKind::InvalidArgument,
                message: "tokens must not be empty".to_string(),
            });
        }
        if message.tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(MessagingError::Api {
                kind: ErrorKind::InvalidArgument,
                message: format!(
                    "tokens must not contain more than {} entries",
                    MAX_MULTICAST_TOKENS
                ),
            });
        }

        // Fails the whole call before fanning out if credentials are bad
        self.get_access_token().await?;

        let sends = message.tokens.iter().map(|token| {
            let single = message.for_token(token);
            async move { self.send(&single).await }
        });
        let responses = join_all(sends).await;

        Ok(BatchResponse::from_responses(responses))
    }
}

/// Map a Google API error body onto a structured provider error
fn api_error(status: StatusCode, body: &str) -> MessagingError {
    let parsed = serde_json::from_str::<GoogleErrorBody>(body).ok();

    let kind = parsed
        .as_ref()
        .and_then(|b| {
            b.error
                .details
                .iter()
                .find_map(|d| d.error_code.as_deref())
                .or(b.error.status.as_deref())
        })
        .map(ErrorKind::from_code)
        .filter(|kind| *kind != ErrorKind::Unknown)
        .unwrap_or_else(|| kind_for_status(status));

    let message = match parsed {
        Some(b) if !b.error.message.is_empty() => b.error.message,
        _ if !body.is_empty() => body.to_string(),
        _ => status.to_string(),
    };

    MessagingError::Api { kind, message }
}

fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::BAD_REQUEST => ErrorKind::InvalidArgument,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Authentication,
        StatusCode::NOT_FOUND => ErrorKind::Unregistered,
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::QuotaExceeded,
        StatusCode::SERVICE_UNAVAILABLE => ErrorKind::Unavailable,
        s if s.is_server_error() => ErrorKind::Internal,
        _ => ErrorKind::Unknown,
    }
}
