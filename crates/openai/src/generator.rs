// OpenAiGenerator

use std::time::Duration;

use async_trait::async_trait;
use phoenix_core::{
    ContentGenerator, GenerationRequest, GenerationResponse, Result, ServiceError, TokenUsage,
};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::types::{ChatMessage, ChatRequest, ChatResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI content generator
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create from `OPENAI_API_KEY`, `OPENAI_MODEL` and `OPENAI_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ServiceError::config("OPENAI_API_KEY environment variable not set"))?;
        let mut generator = Self::new(api_key);
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            generator = generator.with_model(model);
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            generator = generator.with_base_url(base_url);
        }
        Ok(generator)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Default model, used when a request names none
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn build_request(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(request.prompt.clone()));

        ChatRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

impl std::fmt::Debug for OpenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    fn provider_name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model))]
    async fn generate_content(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let body = self.build_request(request);
        tracing::Span::current().record("model", body.model.as_str());

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::upstream(format!("Failed to send OpenAI request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::upstream(format!(
                "OpenAI API request failed with status {status}: {error_text}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::upstream(format!("Failed to parse OpenAI response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::upstream("No choices in OpenAI response"))?;

        debug!(finish_reason = ?choice.finish_reason, "OpenAI completion received");

        Ok(GenerationResponse {
            text: choice.message.content.unwrap_or_default(),
            provider: "openai".to_string(),
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }
}
