// Public API routes and types

pub mod common;
pub mod events;
pub mod insights;
pub mod routing;
pub mod validation;

pub use common::{ApiError, ErrorResponse, ListResponse};

use axum::Router;

use crate::state::AppState;

/// All /v1 routes (auth enforced per handler)
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(events::routes())
        .merge(routing::routes())
        .merge(insights::routes())
}
