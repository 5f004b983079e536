//! Response Normalizer
//!
//! Turns provider-native outcomes into the uniform [`Response`] so callers
//! never branch on which transport served the request.

use tracing::debug;

use crate::errors::FCMError;
use crate::messaging::{BatchResponse, MessagingError};
use crate::models::{Response, ResultError, SendResult};

impl From<&MessagingError> for ResultError {
    fn from(err: &MessagingError) -> Self {
        ResultError::new(err.kind(), err.message())
    }
}

/// Single-target send: the one implicit result lives only in the counts.
pub fn single(outcome: Result<String, MessagingError>) -> Result<Response, FCMError> {
    match outcome {
        Ok(message_id) => Ok(Response {
            success: 1,
            failure: 0,
            message_id: Some(message_id),
            ..Default::default()
        }),
        Err(source) => {
            let response = Response {
                success: 0,
                failure: 1,
                error: Some(ResultError::from(&source)),
                ..Default::default()
            };
            Err(FCMError::Provider {
                source,
                response: Box::new(response),
            })
        }
    }
}

/// Multicast send: one result per recipient, in input order.
///
/// A call-level failure reports every recipient as failed.
pub fn multicast(
    recipients: usize,
    outcome: Result<BatchResponse, MessagingError>,
) -> Result<Response, FCMError> {
    let batch = match outcome {
        Ok(batch) => batch,
        Err(source) => {
            let response = Response {
                success: 0,
                failure: recipients,
                error: Some(ResultError::from(&source)),
                ..Default::default()
            };
            return Err(FCMError::Provider {
                source,
                response: Box::new(response),
            });
        }
    };

    if batch.responses.len() != recipients {
        debug!(
            recipients,
            responses = batch.responses.len(),
            "Provider returned a different number of outcomes than recipients"
        );
    }

    let results = batch
        .responses
        .iter()
        .map(|outcome| match outcome {
            Ok(message_id) => SendResult::delivered(message_id.clone()),
            Err(err) => SendResult::failed(ResultError::from(err)),
        })
        .collect();

    Ok(Response {
        success: batch.success_count,
        failure: batch.failure_count,
        results,
        ..Default::default()
    })
}
