// Router / Orchestrator
//
// Static capability table: each Capability maps to exactly one Agent.
// The orchestrator forwards the request payload and returns the agent's
// response unchanged. No load balancing, no admission control.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::{Result, ServiceError};
use crate::events::{Payload, INTERACTION_RECORDED};
use crate::provider::{ContentGenerator, GenerationRequest, RequestValidator, ValidationRequest};
use crate::publisher::EventPublisher;

/// Payload keys copied from the routed request into the recorded interaction
const INTERACTION_METADATA_KEYS: &[&str] =
    &["app", "task", "user_tier", "tone", "language", "satisfaction"];

// ============================================================================
// Capability
// ============================================================================

/// Routable capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    GenerateContent,
    ValidateRequest,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::GenerateContent, Capability::ValidateRequest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::GenerateContent => "generate_content",
            Capability::ValidateRequest => "validate_request",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ServiceError::validation(format!("unknown capability: {s}")))
    }
}

// ============================================================================
// Agent
// ============================================================================

/// Agent output for one routed request
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    /// Response payload returned to the caller
    pub result: Value,
    /// Request text as the agent passed it on, when it was rewritten
    pub forwarded_request: Option<String>,
}

impl AgentReply {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            forwarded_request: None,
        }
    }

    pub fn with_forwarded_request(mut self, request: impl Into<String>) -> Self {
        self.forwarded_request = Some(request.into());
        self
    }
}

/// Target of a routed request
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Handle a request payload and return the response payload
    async fn handle(&self, payload: Value) -> Result<AgentReply>;
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| ServiceError::validation(format!("invalid payload: {e}")))
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ServiceError::Internal(e.into()))
}

/// Routes `generate_content` to a ContentGenerator.
///
/// With a validator attached the prompt is screened first: a rejected prompt
/// is a validation error and an accepted one is forwarded in its sanitized form.
pub struct GenerationAgent {
    generator: Arc<dyn ContentGenerator>,
    validator: Option<Arc<dyn RequestValidator>>,
}

impl GenerationAgent {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            generator,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn RequestValidator>) -> Self {
        self.validator = Some(validator);
        self
    }
}

#[async_trait]
impl Agent for GenerationAgent {
    fn name(&self) -> &str {
        self.generator.provider_name()
    }

    async fn handle(&self, payload: Value) -> Result<AgentReply> {
        let mut request: GenerationRequest = parse_payload(payload)?;
        if request.prompt.trim().is_empty() {
            return Err(ServiceError::validation("prompt must not be empty"));
        }

        if let Some(validator) = &self.validator {
            let outcome = validator
                .validate_request(&ValidationRequest::new(request.prompt.clone()))
                .await?;
            if !outcome.allowed {
                return Err(ServiceError::validation(
                    outcome
                        .reason
                        .unwrap_or_else(|| "request rejected".to_string()),
                ));
            }
            request.prompt = outcome.sanitized_text;
        }

        let response = self.generator.generate_content(&request).await?;
        Ok(AgentReply::new(to_payload(&response)?).with_forwarded_request(request.prompt))
    }
}

/// Routes `validate_request` to a RequestValidator
pub struct ValidationAgent {
    validator: Arc<dyn RequestValidator>,
}

impl ValidationAgent {
    pub fn new(validator: Arc<dyn RequestValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Agent for ValidationAgent {
    fn name(&self) -> &str {
        "guardian"
    }

    async fn handle(&self, payload: Value) -> Result<AgentReply> {
        let request: ValidationRequest = parse_payload(payload)?;
        let outcome = self.validator.validate_request(&request).await?;
        Ok(AgentReply::new(to_payload(&outcome)?).with_forwarded_request(outcome.sanitized_text))
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Inbound routed request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RoutedRequest {
    /// Capability name (e.g. "generate_content")
    pub capability: String,

    /// Agent-specific payload
    #[serde(default)]
    pub payload: Value,

    /// Stream the interaction is recorded on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

/// Agent response plus routing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RoutedResponse {
    pub capability: Capability,
    pub agent: String,
    pub result: Value,

    /// Id of the recorded InteractionRecorded event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_event_id: Option<Uuid>,
}

/// Capability table entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CapabilityInfo {
    pub capability: Capability,
    pub agent: String,
}

/// Forwards requests through a static capability table
#[derive(Default)]
pub struct Orchestrator {
    agents: HashMap<Capability, Arc<dyn Agent>>,
    publisher: Option<EventPublisher>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the agent for a capability, replacing any previous one
    pub fn register(mut self, capability: Capability, agent: Arc<dyn Agent>) -> Self {
        self.agents.insert(capability, agent);
        self
    }

    /// Record successful routed calls as interaction events
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Registered capabilities, in declaration order
    pub fn capabilities(&self) -> Vec<CapabilityInfo> {
        Capability::ALL
            .into_iter()
            .filter_map(|capability| {
                self.agents.get(&capability).map(|agent| CapabilityInfo {
                    capability,
                    agent: agent.name().to_string(),
                })
            })
            .collect()
    }

    #[instrument(skip(self, request), fields(capability = %request.capability))]
    pub async fn route(&self, request: RoutedRequest) -> Result<RoutedResponse> {
        let capability: Capability = request.capability.parse()?;
        let agent = self.agents.get(&capability).ok_or_else(|| {
            ServiceError::validation(format!("capability not registered: {capability}"))
        })?;

        debug!(agent = agent.name(), "Routing request");
        let reply = agent.handle(request.payload.clone()).await?;

        let interaction_event_id = match (&self.publisher, request.stream_id.as_deref()) {
            (Some(publisher), Some(stream_id)) => {
                let payload = interaction_payload(capability, agent.name(), &request.payload, &reply);
                match publisher.publish(stream_id, INTERACTION_RECORDED, payload).await {
                    Ok(id) => Some(id),
                    Err(err) => {
                        warn!(stream_id, error = %err, "Failed to record interaction");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(RoutedResponse {
            capability,
            agent: agent.name().to_string(),
            result: reply.result,
            interaction_event_id,
        })
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("capabilities", &self.capabilities())
            .field("publisher", &self.publisher.is_some())
            .finish()
    }
}

/// Build the InteractionRecorded payload for a routed call.
///
/// The request is recorded as the agent forwarded it. The raw input text is
/// never stored, so text masked by a validator stays masked.
fn interaction_payload(capability: Capability, agent: &str, input: &Value, reply: &AgentReply) -> Payload {
    let output = &reply.result;
    let mut payload = Payload::new();
    payload.insert("capability".into(), Value::from(capability.as_str()));
    payload.insert("agent".into(), Value::from(agent));

    let response = match capability {
        Capability::GenerateContent => output.get("text"),
        Capability::ValidateRequest => output.get("threat_level"),
    };
    if let Some(request) = &reply.forwarded_request {
        payload.insert("request".into(), Value::from(request.as_str()));
    }
    if let Some(response) = response {
        payload.insert("response".into(), response.clone());
    }
    if let Some(allowed) = output.get("allowed") {
        payload.insert("success".into(), allowed.clone());
    }

    for key in INTERACTION_METADATA_KEYS {
        if let Some(value) = input.get(*key) {
            payload.insert((*key).to_string(), value.clone());
        }
    }
    payload
}
