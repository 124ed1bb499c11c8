// Provider interfaces
//
// Explicit polymorphic interfaces with a fixed capability set:
// - ContentGenerator: {generate_content}
// - RequestValidator: {validate_request}
// Concrete adapters live in provider crates (phoenix-openai, phoenix-anthropic)
// and in phoenix-guardian.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::Result;
use crate::security::{ComplianceStatus, Finding, ThreatLevel};

// ============================================================================
// ContentGenerator
// ============================================================================

/// Request for generated content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct GenerationRequest {
    /// User prompt
    pub prompt: String,

    /// Optional system instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Model override (adapter default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Task tag (e.g. "cover_letter", "cv_analysis"), recorded with the interaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            model: None,
            max_tokens: None,
            temperature: None,
            task: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }
}

/// Token usage statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Generated content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct GenerationResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Trait for generative-AI providers
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Provider name (e.g. "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Generate content for a request
    async fn generate_content(&self, request: &GenerationRequest) -> Result<GenerationResponse>;
}

// ============================================================================
// RequestValidator
// ============================================================================

/// Request text to validate before it reaches a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ValidationRequest {
    pub text: String,

    /// Calling app (e.g. "phoenix-letters")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
}

impl ValidationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            app: None,
        }
    }
}

/// Validation verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ValidationOutcome {
    /// Whether the request may proceed
    pub allowed: bool,
    pub threat_level: ThreatLevel,
    pub compliance: ComplianceStatus,
    pub findings: Vec<Finding>,
    /// Request text with personal data masked
    pub sanitized_text: String,
    /// Why the request was rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Trait for request validation services
#[async_trait]
pub trait RequestValidator: Send + Sync {
    /// Validate a request
    async fn validate_request(&self, request: &ValidationRequest) -> Result<ValidationOutcome>;
}
