use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Delivery priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

/// Notification payload shown by the device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Outbound push message, encoded as the FCM HTTP JSON body
///
/// A message is addressed by `registration_ids`, by `to` (a single token or
/// `/topics/<name>`), or by a topic `condition`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registration_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub content_available: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub mutable_content: bool,
    /// Seconds the message is kept while the device is offline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_package_name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Message {
    /// Message addressed to one or more registration tokens
    pub fn to_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            registration_ids: tokens.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Message addressed to every subscriber of `topic`
    pub fn to_topic(topic: &str) -> Self {
        Self {
            to: Some(format!("/topics/{}", topic.trim_start_matches("/topics/"))),
            ..Default::default()
        }
    }

    /// Message addressed by a topic condition, e.g. `'a' in topics && 'b' in topics`
    pub fn to_condition(condition: impl Into<String>) -> Self {
        Self {
            condition: Some(condition.into()),
            ..Default::default()
        }
    }

    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_time_to_live(mut self, seconds: u32) -> Self {
        self.time_to_live = Some(seconds);
        self
    }
}

/// Provider error category for a failed delivery
///
/// Both legacy codes (`NotRegistered`) and HTTP v1 codes (`UNREGISTERED`)
/// map onto the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unregistered,
    InvalidArgument,
    SenderIdMismatch,
    QuotaExceeded,
    Unavailable,
    Internal,
    ThirdPartyAuth,
    Authentication,
    #[serde(other)]
    Unknown,
}

impl ErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "NotRegistered" | "UNREGISTERED" => ErrorKind::Unregistered,
            "MissingRegistration"
            | "InvalidRegistration"
            | "InvalidPackageName"
            | "MessageTooBig"
            | "InvalidDataKey"
            | "InvalidTtl"
            | "InvalidParameters"
            | "INVALID_ARGUMENT" => ErrorKind::InvalidArgument,
            "MismatchSenderId" | "SENDER_ID_MISMATCH" => ErrorKind::SenderIdMismatch,
            "DeviceMessageRateExceeded"
            | "TopicsMessageRateExceeded"
            | "QUOTA_EXCEEDED"
            | "RESOURCE_EXHAUSTED" => ErrorKind::QuotaExceeded,
            "Unavailable" | "UNAVAILABLE" => ErrorKind::Unavailable,
            "InternalServerError" | "INTERNAL" => ErrorKind::Internal,
            "InvalidApnsCredential" | "THIRD_PARTY_AUTH_ERROR" => ErrorKind::ThirdPartyAuth,
            "UNAUTHENTICATED" | "PERMISSION_DENIED" => ErrorKind::Authentication,
            _ => ErrorKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unregistered => "UNREGISTERED",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::SenderIdMismatch => "SENDER_ID_MISMATCH",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::Internal => "INTERNAL",
            ErrorKind::ThirdPartyAuth => "THIRD_PARTY_AUTH",
            ErrorKind::Authentication => "AUTHENTICATION",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// The token is no longer valid and should be dropped by the caller
    pub fn is_unregistered(&self) -> bool {
        matches!(self, ErrorKind::Unregistered)
    }

    /// The provider may accept the same message later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::Unavailable | ErrorKind::Internal | ErrorKind::QuotaExceeded
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured per-recipient error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ResultErrorRepr")]
pub struct ResultError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ResultError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error from a bare provider code such as `"NotRegistered"`
    pub fn from_code(code: &str) -> Self {
        Self::new(ErrorKind::from_code(code), code)
    }
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// Legacy responses carry a bare code string, ours carry kind + message.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResultErrorRepr {
    Code(String),
    Structured { kind: ErrorKind, message: String },
}

impl From<ResultErrorRepr> for ResultError {
    fn from(repr: ResultErrorRepr) -> Self {
        match repr {
            ResultErrorRepr::Code(code) => ResultError::from_code(&code),
            ResultErrorRepr::Structured { kind, message } => ResultError { kind, message },
        }
    }
}

/// Outcome for one recipient: a message id on success, an error otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub message_id: Option<String>,
    /// Canonical token the provider wants the caller to use from now on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
}

impl SendResult {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: ResultError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.message_id.is_some()
    }
}

/// Aggregate result of one send call, identical for every transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub multicast_id: i64,
    #[serde(default)]
    pub success: usize,
    #[serde(default)]
    pub failure: usize,
    #[serde(default)]
    pub canonical_ids: usize,
    /// One entry per recipient, in input order. Empty for single-target sends.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<SendResult>,
    /// Device group sends only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_registration_ids: Vec<String>,
    /// Provider id for single-target and topic sends
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
}

impl Response {
    /// Tokens whose result reports them as unregistered
    ///
    /// `tokens` must be the recipient list the response was produced for.
    pub fn unregistered_tokens<'a>(&self, tokens: &'a [String]) -> Vec<&'a str> {
        self.results
            .iter()
            .zip(tokens)
            .filter(|(result, _)| {
                result
                    .error
                    .as_ref()
                    .is_some_and(|e| e.kind.is_unregistered())
            })
            .map(|(_, token)| token.as_str())
            .collect()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_skips_empty_fields() {
        let message = Message::to_tokens(["token-a"]).with_notification(Notification::new("Hi", ""));

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            json!({
                "registration_ids": ["token-a"],
                "notification": {"title": "Hi"}
            })
        );
    }

    #[test]
    fn test_topic_prefix_is_not_duplicated() {
        assert_eq!(Message::to_topic("news").to.as_deref(), Some("/topics/news"));
        assert_eq!(
            Message::to_topic("/topics/news").to.as_deref(),
            Some("/topics/news")
        );
    }

    #[test]
    fn test_response_decodes_minimal_body() {
        let response: Response = serde_json::from_str(r#"{"success":1,"failure":0}"#).unwrap();

        assert_eq!(response.success, 1);
        assert_eq!(response.failure, 0);
        assert!(response.results.is_empty());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_legacy_multicast_response() {
        let body = json!({
            "multicast_id": 216,
            "success": 1,
            "failure": 1,
            "canonical_ids": 0,
            "results": [
                {"message_id": "1:0408"},
                {"error": "NotRegistered"}
            ]
        });

        let response: Response = serde_json::from_value(body).unwrap();
        assert_eq!(response.multicast_id, 216);
        assert!(response.results[0].is_success());
        assert_eq!(
            response.results[1].error,
            Some(ResultError::new(ErrorKind::Unregistered, "NotRegistered"))
        );

        let tokens = vec!["good".to_string(), "stale".to_string()];
        assert_eq!(response.unregistered_tokens(&tokens), vec!["stale"]);
    }

    #[test]
    fn test_topic_response_numeric_message_id() {
        let response: Response = serde_json::from_str(r#"{"message_id":5213938921}"#).unwrap();
        assert_eq!(response.message_id.as_deref(), Some("5213938921"));
    }

    #[test]
    fn test_structured_error_roundtrip() {
        let error = ResultError::new(ErrorKind::QuotaExceeded, "slow down");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json, json!({"kind": "QUOTA_EXCEEDED", "message": "slow down"}));

        let decoded: ResultError = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, error);
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(ErrorKind::from_code("UNREGISTERED"), ErrorKind::Unregistered);
        assert_eq!(ErrorKind::from_code("InvalidRegistration"), ErrorKind::InvalidArgument);
        assert_eq!(ErrorKind::from_code("TopicsMessageRateExceeded"), ErrorKind::QuotaExceeded);
        assert_eq!(ErrorKind::from_code("something-new"), ErrorKind::Unknown);
        assert!(ErrorKind::Unavailable.is_transient());
        assert!(!ErrorKind::Unregistered.is_transient());
    }
}
