/// Direct HTTP transport tests against a mock FCM endpoint
use fcm_client::{
    CancellationToken, ClientConfig, ErrorClass, FCMClient, FCMError, Message, Notification,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> FCMClient {
    let config = ClientConfig::default()
        .with_endpoint(format!("{}/fcm/send", server.uri()))
        .with_timeout(Duration::from_secs(2))
        .with_backoff(Duration::ZERO, Duration::ZERO);

    FCMClient::with_api_key("test-key", config).unwrap()
}

fn message() -> Message {
    Message::to_tokens(["token-1"]).with_notification(Notification::new("Hello", "World"))
}

#[tokio::test]
async fn test_success_body_decodes_into_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(header("Authorization", "key=test-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "registration_ids": ["token-1"],
            "notification": {"title": "Hello", "body": "World"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": 1, "failure": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).await.send(&message()).await.unwrap();

    assert_eq!(response.success, 1);
    assert_eq!(response.failure, 0);
}

#[tokio::test]
async fn test_server_error_is_retry_eligible() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).await.send(&message()).await.unwrap_err();

    assert_eq!(err.class(), Some(ErrorClass::Server));
    assert_eq!(err.to_string(), "500 error: Internal Server Error");
}

#[tokio::test]
async fn test_bad_request_is_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).await.send(&message()).await.unwrap_err();

    assert!(matches!(err, FCMError::Client { status: 400, .. }));
    assert_eq!(err.class(), Some(ErrorClass::Client));
}

#[tokio::test]
async fn test_malformed_success_body_is_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .send_with_retry(&message(), 3)
        .await
        .unwrap_err();

    assert!(matches!(err, FCMError::Decode(_)));
}

#[tokio::test]
async fn test_retry_exhausts_attempts_on_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .send_with_retry(&message(), 4)
        .await
        .unwrap_err();

    assert!(matches!(err, FCMError::Server { status: 503, .. }));
}

#[tokio::test]
async fn test_retry_stops_on_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .send_with_retry(&message(), 5)
        .await
        .unwrap_err();

    assert!(matches!(err, FCMError::Client { status: 401, .. }));
}

#[tokio::test]
async fn test_retry_succeeds_after_one_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "multicast_id": 7,
            "success": 1,
            "failure": 0,
            "results": [{"message_id": "0:1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .await
        .send_with_retry(&message(), 3)
        .await
        .unwrap();

    assert_eq!(response.success, 1);
    assert_eq!(response.multicast_id, 7);
    assert_eq!(response.results[0].message_id.as_deref(), Some("0:1"));
}

#[tokio::test]
async fn test_zero_attempts_sends_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .send_with_retry(&message(), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, FCMError::Server { .. }));
}

#[tokio::test]
async fn test_each_attempt_gets_its_own_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .expect(2)
        .mount(&server)
        .await;

    let config = ClientConfig::default()
        .with_endpoint(format!("{}/fcm/send", server.uri()))
        .with_timeout(Duration::from_millis(200))
        .with_backoff(Duration::ZERO, Duration::ZERO);
    let client = FCMClient::with_api_key("test-key", config).unwrap();

    let err = client.send_with_retry(&message(), 2).await.unwrap_err();

    assert!(matches!(err, FCMError::Timeout(d) if d == Duration::from_millis(200)));
    assert_eq!(err.class(), Some(ErrorClass::Connection));
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_secs(1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client
        .send_with_retry_and_cancellation(&message(), 5, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, FCMError::Cancelled));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connection_error() {
    let config = ClientConfig::default()
        .with_endpoint("http://127.0.0.1:9/fcm/send")
        .with_backoff(Duration::ZERO, Duration::ZERO);
    let client = FCMClient::with_api_key("test-key", config).unwrap();

    let err = client.send_with_retry(&message(), 2).await.unwrap_err();

    assert!(matches!(err, FCMError::Connection(_)));
}

#[tokio::test]
async fn test_invalid_message_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .send(&Message::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FCMError::Validation(_)));
}
