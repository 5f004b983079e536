use reqwest::StatusCode;

/// Failure category of a direct HTTP send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request never got a response (DNS, TCP, TLS, deadline)
    Connection,
    /// The server answered with a 5xx status
    Server,
    /// Any other non-success status, or an undecodable success body
    Client,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Connection | ErrorClass::Server)
    }
}

/// Classify a response status. `None` means the status is a success.
pub fn classify_status(status: StatusCode) -> Option<ErrorClass> {
    if status == StatusCode::OK {
        None
    } else if status.is_server_error() {
        Some(ErrorClass::Server)
    } else {
        Some(ErrorClass::Client)
    }
}

/// Classify a failure reported by the HTTP client itself.
pub fn classify_transport(err: &reqwest::Error) -> ErrorClass {
    match err.status() {
        Some(status) => classify_status(status).unwrap_or(ErrorClass::Client),
        None if err.is_decode() => ErrorClass::Client,
        None => ErrorClass::Connection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_buckets() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(ErrorClass::Server)
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(ErrorClass::Server)
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            Some(ErrorClass::Client)
        );
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            Some(ErrorClass::Client)
        );
        assert_eq!(
            classify_status(StatusCode::NO_CONTENT),
            Some(ErrorClass::Client)
        );
    }

    #[test]
    fn test_retry_eligibility() {
        assert!(ErrorClass::Connection.is_retryable());
        assert!(ErrorClass::Server.is_retryable());
        assert!(!ErrorClass::Client.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let err = reqwest::Client::new()
            .post("http://127.0.0.1:9/fcm/send")
            .send()
            .await
            .unwrap_err();

        assert_eq!(classify_transport(&err), ErrorClass::Connection);
    }
}
