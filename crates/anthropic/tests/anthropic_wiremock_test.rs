//! Anthropic generator against a mocked messages endpoint

use phoenix_anthropic::{AnthropicGenerator, ANTHROPIC_VERSION};
use phoenix_core::{ContentGenerator, GenerationRequest, ServiceError};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_generate_content_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", ANTHROPIC_VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-haiku-latest",
            "content": [{"type": "text", "text": "Objet : candidature"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 20, "output_tokens": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = AnthropicGenerator::new("test-key")
        .with_api_url(format!("{}/v1/messages", server.uri()));
    let response = generator
        .generate_content(&GenerationRequest::new("Lettre de motivation"))
        .await
        .unwrap();

    assert_eq!(response.text, "Objet : candidature");
    assert_eq!(response.provider, "anthropic");
    assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
    assert_eq!(response.usage.unwrap().output_tokens, 4);
}

#[tokio::test]
async fn test_server_error_maps_to_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let generator = AnthropicGenerator::new("k").with_api_url(server.uri());
    let err = generator
        .generate_content(&GenerationRequest::new("hi"))
        .await
        .unwrap_err();

    match err {
        ServiceError::Upstream(msg) => assert!(msg.contains("overloaded")),
        other => panic!("expected upstream error, got {other:?}"),
    }
}
