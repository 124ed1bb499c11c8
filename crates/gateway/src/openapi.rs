// OpenAPI specification
//
// Served by the gateway (Swagger UI) and exported by the export-openapi binary.

use phoenix_core::{
    Capability, CapabilityInfo, ComplianceStatus, Event, Finding, FindingCategory,
    GenerationRequest, GenerationResponse, RoutedRequest, RoutedResponse, ThreatLevel, TokenUsage,
    ValidationOutcome,
};
use phoenix_flywheel::{FlywheelSummary, Pattern};
use phoenix_guardian::{ComplianceReport, SecurityThreat};
use utoipa::OpenApi;

use crate::api::{self, ErrorResponse, ListResponse};
use crate::HealthResponse;

/// OpenAPI documentation for the Phoenix gateway
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health,
        api::events::publish_event,
        api::events::poll_events,
        api::events::list_streams,
        api::routing::generate_content,
        api::routing::validate_request,
        api::routing::route_request,
        api::routing::list_capabilities,
        api::insights::flywheel_summary,
        api::insights::list_threats,
        api::insights::compliance_report,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            Event,
            ListResponse<Event>,
            ListResponse<String>,
            api::events::PublishEventRequest,
            api::events::PublishEventResponse,
            GenerationRequest, GenerationResponse, TokenUsage,
            ValidationOutcome, Finding, FindingCategory, ThreatLevel, ComplianceStatus,
            api::routing::GenerateContentRequest,
            api::routing::ValidateRequestBody,
            api::routing::InteractionContext,
            Capability, CapabilityInfo, RoutedRequest, RoutedResponse,
            ListResponse<CapabilityInfo>,
            FlywheelSummary, Pattern,
            SecurityThreat, ComplianceReport,
            ListResponse<SecurityThreat>,
        )
    ),
    tags(
        (name = "health", description = "Liveness and configuration"),
        (name = "events", description = "Event publishing and polling"),
        (name = "routing", description = "Capability routing to AI and validation agents"),
        (name = "insights", description = "Flywheel and guardian agent state")
    ),
    info(
        title = "Phoenix Gateway API",
        version = "0.3.0",
        description = "Event layer, capability routing and agent insights for Phoenix apps",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn to_json() -> Result<String, serde_json::Error> {
        ApiDoc::openapi().to_pretty_json()
    }
}
