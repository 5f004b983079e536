use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resilience::with_cancellable_timeout;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::Sender;
use crate::config::EmptyRecipients;
use crate::errors::FCMError;
use crate::messaging::{App, MessagingClient, MulticastMessage, PushNotification, TokenMessage};
use crate::models::{Message, Response};
use crate::normalize;
use crate::validate::ValidationError;

/// SDK-mediated transport: delegates to the credential-based app's
/// messaging handle, created on first use and cached for the sender's
/// lifetime.
pub struct AppSender {
    app: Arc<dyn App>,
    messaging: OnceCell<Arc<dyn MessagingClient>>,
    timeout: Duration,
    empty_recipients: EmptyRecipients,
}

impl AppSender {
    pub fn new(app: Arc<dyn App>, timeout: Duration, empty_recipients: EmptyRecipients) -> Self {
        Self {
            app,
            messaging: OnceCell::new(),
            timeout,
            empty_recipients,
        }
    }

    /// First successful initialization wins; failures are not cached.
    async fn messaging(&self) -> Result<&Arc<dyn MessagingClient>, FCMError> {
        self.messaging
            .get_or_try_init(|| async {
                info!("Initializing messaging handle");
                self.app.messaging().await
            })
            .await
            .map_err(FCMError::AppInit)
    }

    async fn deliver(&self, message: &Message) -> Result<Response, FCMError> {
        let data = message.string_data()?;
        let notification = message.notification.as_ref().map(|n| PushNotification {
            title: n.title.clone(),
            body: n.body.clone(),
            image: n.image.clone(),
        });

        let messaging = self.messaging().await?;

        match message.registration_ids.as_slice() {
            [token] => {
                let single = TokenMessage {
                    token: token.clone(),
                    notification,
                    data,
                };
                normalize::single(messaging.send(&single).await)
            }
            tokens => {
                debug!(recipients = tokens.len(), "Sending multicast message");
                let multicast = MulticastMessage {
                    tokens: tokens.to_vec(),
                    notification,
                    data,
                };
                normalize::multicast(tokens.len(), messaging.send_multicast(&multicast).await)
            }
        }
    }
}

#[async_trait]
impl Sender for AppSender {
    fn name(&self) -> &'static str {
        "app"
    }

    async fn send(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<Response, FCMError> {
        if message.registration_ids.is_empty() && self.empty_recipients == EmptyRecipients::Reject
        {
            return Err(ValidationError::NoRecipients.into());
        }

        with_cancellable_timeout(self.timeout, cancel, self.deliver(message)).await?
    }
}
