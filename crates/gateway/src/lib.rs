// Phoenix Gateway Library
// Decision: Shared by the server binary, CLI tools and in-process router tests

pub mod api;
pub mod auth;
pub mod config;
pub mod consumers;
pub mod openapi;
pub mod services;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use crate::openapi::ApiDoc;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the event store is unreachable
    pub status: &'static str,
    pub version: &'static str,
    pub storage: &'static str,
    pub auth_mode: &'static str,
}

/// GET /health - Liveness (unauthenticated)
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service status", body = HealthResponse)),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.store().health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Event store health check failed");
            "degraded"
        }
    };
    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        storage: state.storage_backend,
        auth_mode: state.auth.mode.as_str(),
    })
}

/// Build the full HTTP application: health, prefixed API routes, Swagger UI,
/// CORS (when origins are configured) and request tracing
pub fn build_app(state: AppState, config: &GatewayConfig) -> Router {
    let api_routes = build_router_with_prefix(api::routes(), &config.api_prefix);

    let app = Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let cors_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let app = if cors_origins.is_empty() {
        app
    } else {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]),
        )
    };

    app.layer(TraceLayer::new_for_http())
}

/// Nest routes under an optional API prefix
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
