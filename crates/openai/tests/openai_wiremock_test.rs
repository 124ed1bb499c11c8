//! OpenAI generator against a mocked chat completions endpoint

use phoenix_core::{ContentGenerator, GenerationRequest, ServiceError};
use phoenix_openai::OpenAiGenerator;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_generate_content_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Madame, Monsieur,"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = OpenAiGenerator::new("test-key").with_base_url(format!("{}/v1", server.uri()));
    let response = generator
        .generate_content(&GenerationRequest::new("Write a cover letter"))
        .await
        .unwrap();

    assert_eq!(response.text, "Madame, Monsieur,");
    assert_eq!(response.provider, "openai");
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    let usage = response.usage.unwrap();
    assert_eq!(usage.input_tokens, 12);
    assert_eq!(usage.output_tokens, 3);
}

#[tokio::test]
async fn test_error_status_maps_to_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let generator = OpenAiGenerator::new("k").with_base_url(server.uri());
    let err = generator
        .generate_content(&GenerationRequest::new("hi"))
        .await
        .unwrap_err();

    match err {
        ServiceError::Upstream(msg) => {
            assert!(msg.contains("429"));
            assert!(msg.contains("rate limited"));
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_choices_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"model": "gpt-4o-mini", "choices": []})),
        )
        .mount(&server)
        .await;

    let generator = OpenAiGenerator::new("k").with_base_url(server.uri());
    let err = generator
        .generate_content(&GenerationRequest::new("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream(_)));
}
