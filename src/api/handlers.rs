//! API Handlers
//!
//! HTTP request handlers for the diagnostics endpoints.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::cache::CacheManager;
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, StatsResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache manager
    pub cache: Arc<CacheManager>,
}

impl AppState {
    /// Creates a new AppState around the given manager.
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }
}

/// Handler for GET /stats
///
/// Returns counters, hit ratio and the latest cluster snapshot.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let statistics = state.cache.get_statistics().await;
    let lifecycle = state.cache.state().await;
    Json(StatsResponse::new(statistics, lifecycle))
}

/// Handler for GET /health
///
/// Pings the backend; answers 503 when it does not respond.
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    state
        .cache
        .ping()
        .await
        .map_err(|e| CacheError::Unavailable(e.to_string()))?;

    Ok(Json(HealthResponse::healthy(state.cache.state().await)))
}
