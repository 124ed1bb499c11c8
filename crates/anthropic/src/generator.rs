// Anthropic Claude content generator

use std::time::Duration;

use async_trait::async_trait;
use phoenix_core::{
    ContentGenerator, GenerationRequest, GenerationResponse, Result, ServiceError, TokenUsage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

/// max_tokens is mandatory for the messages API
const DEFAULT_MAX_TOKENS: u32 = 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Anthropic Claude content generator
///
/// ```ignore
/// use phoenix_anthropic::AnthropicGenerator;
///
/// let generator = AnthropicGenerator::from_env()?;
/// // or with custom endpoint
/// let generator = AnthropicGenerator::new("your-api-key")
///     .with_api_url("https://api.example.com/v1/messages");
/// ```
#[derive(Clone)]
pub struct AnthropicGenerator {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl AnthropicGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create from `ANTHROPIC_API_KEY`, plus optional `ANTHROPIC_MODEL` and `ANTHROPIC_API_URL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ServiceError::config("ANTHROPIC_API_KEY environment variable not set"))?;
        let mut generator = Self::new(api_key);
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            generator = generator.with_model(model);
        }
        if let Ok(url) = std::env::var("ANTHROPIC_API_URL") {
            generator = generator.with_api_url(url);
        }
        Ok(generator)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub(crate) fn build_request(&self, request: &GenerationRequest) -> MessagesRequest {
        MessagesRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system_prompt.clone(),
            messages: vec![RequestMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        }
    }
}

impl std::fmt::Debug for AnthropicGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicGenerator")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    pub model: String,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    pub(crate) fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect()
    }
}

#[async_trait]
impl ContentGenerator for AnthropicGenerator {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    #[tracing::instrument(skip(self, request))]
    async fn generate_content(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::upstream(format!("Failed to send Anthropic request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::upstream(format!(
                "Anthropic API error ({status}): {error_text}"
            )));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            ServiceError::upstream(format!("Failed to parse Anthropic response: {e}"))
        })?;

        Ok(GenerationResponse {
            text: parsed.text(),
            provider: "anthropic".to_string(),
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
            finish_reason: parsed.stop_reason,
        })
    }
}
