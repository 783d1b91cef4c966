mod download;
mod health;
mod metrics;
mod tools;
mod webhook;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::cors;
use crate::error::ApiError;
use crate::models::Envelope;
use crate::rate_limit;
use crate::state::AppState;

pub use download::record_download;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use tools::{create_tool, get_tool, list_tools};
pub use webhook::tool_created;

/// Full application router.
///
/// Layer order, outermost first: request tracing, CORS (preflight answers
/// here), metrics, then the per-client rate limiter on the `/tools` routes.
pub fn router(state: AppState) -> Router {
    let tools = Router::new()
        .route("/tools", get(list_tools).post(create_tool).fallback(method_not_allowed))
        .route("/tools/{id}", get(get_tool).fallback(method_not_allowed))
        .route(
            "/tools/{id}/download",
            post(record_download).fallback(method_not_allowed),
        )
        .route_layer(from_fn_with_state(state.clone(), rate_limit::enforce));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/tool-created", post(tool_created).fallback(method_not_allowed))
        .merge(tools)
        .fallback(not_found)
        .layer(from_fn(crate::metrics::track))
        .layer(from_fn_with_state(state.clone(), cors::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(Envelope::failure("Not Found")))
}
