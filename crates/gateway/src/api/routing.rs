// Capability routing HTTP routes
//
// Thin wrappers over the Orchestrator: the dedicated endpoints build a
// RoutedRequest for a fixed capability, /v1/route accepts any capability.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use phoenix_core::{Capability, CapabilityInfo, GenerationRequest, RoutedRequest, RoutedResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::common::{ApiError, ErrorResponse, ListResponse};
use super::validation::{validate_prompt, validate_stream_id};
use crate::auth::AuthUser;
use crate::state::AppState;

/// Optional interaction metadata, recorded with the interaction event
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InteractionContext {
    /// Stream the interaction is recorded on (not recorded when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    /// Calling application (e.g. "letters", "cv")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Explicit satisfaction score in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<f64>,
}

/// Body of POST /v1/generate-content
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateContentRequest {
    #[serde(flatten)]
    pub request: GenerationRequest,
    #[serde(flatten)]
    pub context: InteractionContext,
}

/// Body of POST /v1/validate-request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateRequestBody {
    /// Text to screen
    pub text: String,
    #[serde(flatten)]
    pub context: InteractionContext,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/generate-content", post(generate_content))
        .route("/v1/validate-request", post(validate_request))
        .route("/v1/route", post(route_request))
        .route("/v1/capabilities", get(list_capabilities))
}

/// Build a routed request for a fixed capability from a flattened body.
///
/// `stream_id` is routing metadata and is removed from the agent payload.
fn routed<T: Serialize>(
    capability: Capability,
    body: &T,
    stream_id: Option<String>,
) -> Result<RoutedRequest, ApiError> {
    let mut payload = serde_json::to_value(body)
        .map_err(|e| ApiError(phoenix_core::ServiceError::Internal(e.into())))?;
    if let Value::Object(map) = &mut payload {
        map.remove("stream_id");
    }
    Ok(RoutedRequest {
        capability: capability.as_str().to_string(),
        payload,
        stream_id,
    })
}

async fn dispatch(state: &AppState, request: RoutedRequest) -> Result<Json<RoutedResponse>, ApiError> {
    if let Some(stream_id) = request.stream_id.as_deref() {
        validate_stream_id(stream_id)?;
    }
    let response = state.orchestrator.route(request).await?;
    Ok(Json(response))
}

/// POST /v1/generate-content - Generate content through the configured provider
#[utoipa::path(
    post,
    path = "/v1/generate-content",
    request_body = GenerateContentRequest,
    responses(
        (status = 200, description = "Generated content", body = RoutedResponse),
        (status = 400, description = "Invalid or rejected request", body = ErrorResponse),
        (status = 502, description = "Provider failed", body = ErrorResponse)
    ),
    tag = "routing"
)]
pub async fn generate_content(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<GenerateContentRequest>,
) -> Result<Json<RoutedResponse>, ApiError> {
    validate_prompt(&body.request.prompt)?;
    if let Some(system_prompt) = &body.request.system_prompt {
        validate_prompt(system_prompt)?;
    }
    let request = routed(Capability::GenerateContent, &body, body.context.stream_id.clone())?;
    dispatch(&state, request).await
}

/// POST /v1/validate-request - Screen text for threats and personal data
#[utoipa::path(
    post,
    path = "/v1/validate-request",
    request_body = ValidateRequestBody,
    responses(
        (status = 200, description = "Validation outcome", body = RoutedResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "routing"
)]
pub async fn validate_request(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ValidateRequestBody>,
) -> Result<Json<RoutedResponse>, ApiError> {
    validate_prompt(&body.text)?;
    let request = routed(Capability::ValidateRequest, &body, body.context.stream_id.clone())?;
    dispatch(&state, request).await
}

/// POST /v1/route - Route a request to the agent registered for its capability
#[utoipa::path(
    post,
    path = "/v1/route",
    request_body = RoutedRequest,
    responses(
        (status = 200, description = "Agent response", body = RoutedResponse),
        (status = 400, description = "Unknown capability or invalid payload", body = ErrorResponse),
        (status = 502, description = "Agent failed", body = ErrorResponse)
    ),
    tag = "routing"
)]
pub async fn route_request(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<RoutedRequest>,
) -> Result<Json<RoutedResponse>, ApiError> {
    dispatch(&state, request).await
}

/// GET /v1/capabilities - List the capability table
#[utoipa::path(
    get,
    path = "/v1/capabilities",
    responses(
        (status = 200, description = "Registered capabilities", body = ListResponse<CapabilityInfo>)
    ),
    tag = "routing"
)]
pub async fn list_capabilities(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Json<ListResponse<CapabilityInfo>> {
    Json(state.orchestrator.capabilities().into())
}
