/// FCM Client Library
///
/// This library provides a Firebase Cloud Messaging (FCM) client for sending
/// push notifications to Android, iOS and Web devices.
///
/// It handles:
/// - Message validation before any network activity
/// - Two transports: direct HTTP with a server API key, or a service-account
///   app using OAuth2 and the HTTP v1 API
/// - Bounded retries for connection and server errors (direct transport)
/// - One response shape for single-token, multicast and topic sends
///
/// # Example
///
/// ```rust,no_run
/// use fcm_client::{FCMClient, Message, Notification};
///
/// #[tokio::main]
/// async fn main() -> Result<(), fcm_client::FCMError> {
///     let client = FCMClient::new("server-key")?;
///     let message = Message::to_tokens(["device-token"])
///         .with_notification(Notification::new("Hello", "World"));
///
///     let response = client.send_with_retry(&message, 3).await?;
///     println!("{} delivered, {} failed", response.success, response.failure);
///     Ok(())
/// }
/// ```

pub mod classify;
pub mod client;
pub mod config;
pub mod errors;
pub mod messaging;
pub mod models;
pub mod normalize;
pub mod transport;
pub mod validate;

pub use classify::ErrorClass;
pub use client::FCMClient;
pub use config::{ClientConfig, EmptyRecipients, FcmSettings, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use errors::FCMError;
pub use messaging::{App, MessagingClient, MessagingError, ServiceAccountApp, ServiceAccountKey};
pub use models::{ErrorKind, Message, Notification, Priority, Response, ResultError, SendResult};
pub use tokio_util::sync::CancellationToken;
pub use validate::ValidationError;
