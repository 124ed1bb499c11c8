// Agent insight routes: flywheel summary and guardian audit trail

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use phoenix_core::ServiceError;
use phoenix_flywheel::FlywheelSummary;
use phoenix_guardian::{ComplianceReport, SecurityThreat};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::common::{ApiError, ErrorResponse, ListResponse};
use crate::auth::AuthUser;
use crate::state::AppState;

const DEFAULT_THREAT_LIMIT: usize = 50;
const MAX_THREAT_LIMIT: usize = 500;

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct ThreatsQuery {
    /// Maximum number of threats, newest first (default 50, max 500)
    pub limit: Option<usize>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flywheel/summary", get(flywheel_summary))
        .route("/v1/guardian/threats", get(list_threats))
        .route("/v1/guardian/compliance/:stream_id", get(compliance_report))
}

/// GET /v1/flywheel/summary - Patterns learned so far
#[utoipa::path(
    get,
    path = "/v1/flywheel/summary",
    responses((status = 200, description = "Flywheel summary", body = FlywheelSummary)),
    tag = "insights"
)]
pub async fn flywheel_summary(_user: AuthUser, State(state): State<AppState>) -> Json<FlywheelSummary> {
    Json(state.flywheel.summary())
}

/// GET /v1/guardian/threats - Recent security threats
#[utoipa::path(
    get,
    path = "/v1/guardian/threats",
    params(ThreatsQuery),
    responses((status = 200, description = "Threats, newest first", body = ListResponse<SecurityThreat>)),
    tag = "insights"
)]
pub async fn list_threats(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ThreatsQuery>,
) -> Json<ListResponse<SecurityThreat>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_THREAT_LIMIT)
        .min(MAX_THREAT_LIMIT);
    Json(state.guardian.threats(limit).into())
}

/// GET /v1/guardian/compliance/{stream_id} - Compliance report for a stream
#[utoipa::path(
    get,
    path = "/v1/guardian/compliance/{stream_id}",
    params(("stream_id" = String, Path, description = "Stream (aggregate) id")),
    responses(
        (status = 200, description = "Compliance report", body = ComplianceReport),
        (status = 404, description = "Stream never assessed", body = ErrorResponse)
    ),
    tag = "insights"
)]
pub async fn compliance_report(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
) -> Result<Json<ComplianceReport>, ApiError> {
    state
        .guardian
        .compliance_report(&stream_id)
        .map(Json)
        .ok_or_else(|| {
            ServiceError::not_found(format!("no events assessed for stream {stream_id}")).into()
        })
}
