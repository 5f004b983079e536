use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::models::Message;

/// Maximum number of registration ids in one legacy multicast request
pub const MAX_REGISTRATION_IDS: usize = 1000;

/// Maximum time-to-live accepted by FCM (4 weeks)
pub const MAX_TIME_TO_LIVE: u32 = 2_419_200;

/// Maximum number of `&&` / `||` operators in a topic condition
pub const MAX_CONDITION_OPERATORS: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message has no target: set to, condition or registration_ids")]
    MissingTarget,

    #[error("message has no registration ids")]
    NoRecipients,

    #[error("condition has {0} operators, at most 2 are allowed")]
    ConditionTooComplex(usize),

    #[error("too many registration ids: {0}, at most 1000 are allowed")]
    TooManyRegistrationIds(usize),

    #[error("time_to_live {0}s exceeds the maximum of 2419200s")]
    InvalidTimeToLive(u32),

    #[error("data value for key {0:?} cannot be sent as a string")]
    NonStringData(String),
}

impl Message {
    /// Check the message is deliverable before any network activity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_to = self.to.as_deref().is_some_and(|to| !to.is_empty());
        let condition = self.condition.as_deref().filter(|c| !c.is_empty());

        if let Some(condition) = condition {
            let operators = condition.matches("&&").count() + condition.matches("||").count();
            if operators > MAX_CONDITION_OPERATORS {
                return Err(ValidationError::ConditionTooComplex(operators));
            }
        }

        if !has_to && condition.is_none() && self.registration_ids.is_empty() {
            return Err(ValidationError::MissingTarget);
        }

        if self.registration_ids.len() > MAX_REGISTRATION_IDS {
            return Err(ValidationError::TooManyRegistrationIds(
                self.registration_ids.len(),
            ));
        }

        if let Some(ttl) = self.time_to_live {
            if ttl > MAX_TIME_TO_LIVE {
                return Err(ValidationError::InvalidTimeToLive(ttl));
            }
        }

        Ok(())
    }

    /// Data payload flattened to strings, as required by the v1 API.
    ///
    /// Numbers and booleans are stringified; nulls, arrays and objects are
    /// rejected.
    pub fn string_data(&self) -> Result<HashMap<String, String>, ValidationError> {
        self.data
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null | Value::Array(_) | Value::Object(_) => {
                        return Err(ValidationError::NonStringData(key.clone()))
                    }
                };
                Ok((key.clone(), text))
            })
            .collect()
    }
}
