//! Integration tests for the Gemini label generator against a mock server.

use std::time::Duration;

use review_trends::label::{LabelSource, TopicLabeler};
use review_trends::{GeminiClient, LabelError, LabelGenerator};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn candidate_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::with_base_url(
        "test-key",
        "gemini-2.5-flash",
        base_url,
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_gemini_generate_returns_cleaned_label() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_string_contains("Delivery was two hours late"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("\"Late delivery.\"\n")))
        .expect(1)
        .mount(&server)
        .await;

    let label = client(&server.uri())
        .generate("Delivery was two hours late")
        .await
        .unwrap();
    assert_eq!(label, "Late delivery");
}

#[tokio::test]
async fn test_gemini_generate_joins_multiple_parts() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "App " }, { "text": "crashes" }] }
            }]
        })))
        .mount(&server)
        .await;

    let label = client(&server.uri()).generate("crash").await.unwrap();
    assert_eq!(label, "App crashes");
}

#[tokio::test]
async fn test_gemini_generate_status_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
        .mount(&server)
        .await;

    let result = client(&server.uri()).generate("anything").await;
    match result {
        Err(LabelError::Status { status, body, .. }) => {
            assert_eq!(status, 429);
            assert!(body.contains("RESOURCE_EXHAUSTED"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_gemini_generate_no_candidates_is_malformed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let result = client(&server.uri()).generate("anything").await;
    assert!(matches!(result, Err(LabelError::MalformedResponse { .. })));
}

#[tokio::test]
async fn test_gemini_generate_blank_text_is_empty_response() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("  \n ")))
        .mount(&server)
        .await;

    let result = client(&server.uri()).generate("anything").await;
    assert!(matches!(result, Err(LabelError::EmptyResponse { .. })));
}

#[tokio::test]
async fn test_gemini_generate_invalid_json_is_malformed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client(&server.uri()).generate("anything").await;
    assert!(matches!(result, Err(LabelError::MalformedResponse { .. })));
}

#[tokio::test]
async fn test_topic_labeler_falls_back_when_service_fails() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let labeler = TopicLabeler::new(Box::new(client(&server.uri())));
    let generated = labeler
        .generate("I want a refund, the order was never received")
        .await;
    assert_eq!(generated.label, "General complaint");
    assert_eq!(generated.source, LabelSource::Fallback);
}

#[tokio::test]
async fn test_topic_labeler_falls_back_on_slow_service() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(candidate_body("Too late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let labeler = TopicLabeler::new(Box::new(client(&server.uri())))
        .with_timeout(Duration::from_millis(200));
    let generated = labeler.generate("the app keeps crashing").await;
    assert_eq!(generated.label, "App crashes");
    assert_eq!(generated.source, LabelSource::Fallback);
}
