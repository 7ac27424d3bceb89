//! Correction service contract tests.
//!
//! Verify the HTTP request shape, conversation-id replay and error mapping of
//! the correction client against a mock server.

use serde_json::json;
use speakstream::SpeechError;
use speakstream::config::CorrectionConfig;
use speakstream::correction::{CorrectionService, DifyCorrectionClient};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> DifyCorrectionClient {
    let config = CorrectionConfig {
        api_url: format!("{}/v1/chat-messages", server.uri()),
        api_key: "test-key".to_owned(),
        user: "tester".to_owned(),
        ..CorrectionConfig::default()
    };
    DifyCorrectionClient::new(&config).unwrap()
}

#[tokio::test]
async fn request_carries_query_and_blocking_mode() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "inputs": {},
            "query": "09:00:01: hello",
            "response_mode": "blocking",
            "conversation_id": "",
            "user": "tester"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "09:00:01: Hello.",
            "conversation_id": "conv-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let answer = client.correct("09:00:01: hello").await.unwrap();

    assert_eq!(answer, "09:00:01: Hello.");
    assert_eq!(client.conversation_id().as_deref(), Some("conv-1"));
}

#[tokio::test]
async fn conversation_id_is_replayed_on_next_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"query": "first"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "First.",
            "conversation_id": "conv-42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "query": "second",
            "conversation_id": "conv-42"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Second.",
            "conversation_id": "conv-42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.correct("first").await.unwrap(), "First.");
    assert_eq!(client.correct("second").await.unwrap(), "Second.");
}

#[tokio::test]
async fn http_error_maps_to_correction_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "unauthorized",
            "message": "Access token is invalid"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.correct("text").await.unwrap_err();

    assert!(matches!(err, SpeechError::Correction(_)));
    assert!(err.to_string().contains("Access token is invalid"));
    assert!(client.conversation_id().is_none());
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.correct("text").await.unwrap_err();
    assert!(err.to_string().contains("invalid response"));
}

#[tokio::test]
async fn unreachable_service_is_an_error() {
    let config = CorrectionConfig {
        api_url: "http://127.0.0.1:9/v1/chat-messages".to_owned(),
        api_key: "test-key".to_owned(),
        ..CorrectionConfig::default()
    };
    let client = DifyCorrectionClient::new(&config).unwrap();
    assert!(matches!(
        client.correct("text").await,
        Err(SpeechError::Correction(_))
    ));
}
