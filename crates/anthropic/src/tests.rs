use crate::generator::MessagesResponse;
use crate::{AnthropicGenerator, DEFAULT_API_URL, DEFAULT_MODEL};
use phoenix_core::GenerationRequest;
use serde_json::json;

#[test]
fn test_defaults() {
    let generator = AnthropicGenerator::new("sk-ant-secret");
    assert_eq!(generator.api_url(), DEFAULT_API_URL);
    assert!(!format!("{:?}", generator).contains("sk-ant-secret"));
}

#[test]
fn test_build_request_defaults_max_tokens() {
    let generator = AnthropicGenerator::new("key");
    let body = generator.build_request(&GenerationRequest::new("Bonjour"));

    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["model"], DEFAULT_MODEL);
    assert_eq!(json["max_tokens"], 1024);
    assert_eq!(json["messages"][0]["role"], "user");
    assert_eq!(json["messages"][0]["content"], "Bonjour");
    assert!(json.get("system").is_none());
}

#[test]
fn test_system_prompt_is_top_level() {
    let generator = AnthropicGenerator::new("key");
    let request = GenerationRequest::new("CV please").with_system_prompt("You write CVs");
    let json = serde_json::to_value(generator.build_request(&request)).unwrap();
    assert_eq!(json["system"], "You write CVs");
    assert_eq!(json["messages"].as_array().unwrap().len(), 1);
}

#[test]
fn test_response_text_skips_non_text_blocks() {
    let response: MessagesResponse = serde_json::from_value(json!({
        "model": "claude",
        "content": [
            {"type": "text", "text": "Hello "},
            {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
            {"type": "text", "text": "world"}
        ],
        "stop_reason": "end_turn"
    }))
    .unwrap();

    assert_eq!(response.text(), "Hello world");
}
