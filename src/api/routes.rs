//! API Routes
//!
//! Configures the Axum router with the diagnostics endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, stats_handler, AppState};

/// Creates the diagnostics router.
///
/// # Endpoints
/// - `GET /stats` - Cache statistics and cluster snapshot
/// - `GET /health` - Backend liveness
///
/// # Middleware
/// - CORS: Allows any origin, GET only
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
