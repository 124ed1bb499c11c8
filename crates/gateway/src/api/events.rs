// Event stream HTTP routes
// The store is the source of truth; these routes publish to it and poll it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use phoenix_core::store::DEFAULT_PAGE_SIZE;
use phoenix_core::{Event, Payload};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{ApiError, ErrorResponse, ListResponse};
use super::validation::{
    validate_event_type, validate_payload, validate_stream_id, ValidationError, MAX_POLL_LIMIT,
};
use crate::auth::AuthUser;
use crate::state::AppState;

/// Request to publish an event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishEventRequest {
    /// Event type tag
    #[schema(example = "LetterGenerated")]
    pub event_type: String,
    /// Event payload (JSON object)
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Payload,
}

/// Identity and position of a published event
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishEventResponse {
    pub event_id: Uuid,
    pub stream_id: String,
    pub version: i64,
}

/// Query parameters for event polling
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct PollQuery {
    /// Return events with version greater than this (default 0)
    #[serde(default)]
    pub since_version: i64,
    /// Maximum number of events (default 100, max 1000)
    pub limit: Option<usize>,
    /// Only return events of this type
    pub event_type: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/streams", get(list_streams))
        .route(
            "/v1/streams/:stream_id/events",
            get(poll_events).post(publish_event),
        )
}

/// POST /v1/streams/{stream_id}/events - Publish an event
#[utoipa::path(
    post,
    path = "/v1/streams/{stream_id}/events",
    params(("stream_id" = String, Path, description = "Stream (aggregate) id")),
    request_body = PublishEventRequest,
    responses(
        (status = 201, description = "Event published", body = PublishEventResponse),
        (status = 400, description = "Invalid event", body = ErrorResponse),
        (status = 503, description = "Event store unavailable", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn publish_event(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
    Json(req): Json<PublishEventRequest>,
) -> Result<(StatusCode, Json<PublishEventResponse>), ApiError> {
    validate_stream_id(&stream_id)?;
    validate_event_type(&req.event_type)?;
    validate_payload(&req.payload)?;

    let event = state
        .events
        .publish(&stream_id, &req.event_type, req.payload)
        .await?;

    tracing::debug!(
        stream_id = %event.stream_id,
        version = event.version,
        event_type = %event.event_type,
        "Event published via API"
    );

    Ok((
        StatusCode::CREATED,
        Json(PublishEventResponse {
            event_id: event.event_id,
            stream_id: event.stream_id,
            version: event.version,
        }),
    ))
}

/// GET /v1/streams/{stream_id}/events - Poll events in version order
#[utoipa::path(
    get,
    path = "/v1/streams/{stream_id}/events",
    params(
        ("stream_id" = String, Path, description = "Stream (aggregate) id"),
        PollQuery
    ),
    responses(
        (status = 200, description = "Events after since_version", body = ListResponse<Event>),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 503, description = "Event store unavailable", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn poll_events(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
    Query(query): Query<PollQuery>,
) -> Result<Json<ListResponse<Event>>, ApiError> {
    validate_stream_id(&stream_id)?;
    if query.since_version < 0 {
        return Err(ValidationError::Invalid("since_version must not be negative").into());
    }
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if limit == 0 || limit > MAX_POLL_LIMIT {
        return Err(ValidationError::Invalid("limit must be between 1 and 1000").into());
    }

    let events = state
        .events
        .list(
            &stream_id,
            query.since_version,
            limit,
            query.event_type.as_deref(),
        )
        .await?;

    Ok(Json(events.into()))
}

/// GET /v1/streams - List known stream ids
#[utoipa::path(
    get,
    path = "/v1/streams",
    responses(
        (status = 200, description = "Stream ids", body = ListResponse<String>),
        (status = 503, description = "Event store unavailable", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn list_streams(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<String>>, ApiError> {
    let streams = state.events.streams().await?;
    Ok(Json(streams.into()))
}
