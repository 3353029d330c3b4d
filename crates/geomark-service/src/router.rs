//! Axum router construction for the query service.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled for browser map clients and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the query service.
///
/// The router includes:
/// - `POST /put` -- upsert one marker
/// - `GET /list` -- rectangle query
/// - `POST /reset` -- remove every marker
/// - `GET /health` -- liveness and marker count
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/put", post(handlers::put_marker))
        .route("/list", get(handlers::list_markers))
        .route("/reset", post(handlers::reset_markers))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
