//! HTTP routes
//!
//! - `POST /sync`: run one synchronization pass, answer with the run report
//! - `POST /debug`: connectivity probe against both APIs
//! - `GET /health`: liveness

use axum::{
    body::Bytes,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use leadsync_engine::{IdempotencyTracker, SyncConfig};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

use crate::config::CorsConfig;
use crate::error::AppError;
use crate::middleware;

mod probe;
mod sync;

pub use probe::ProbeRequest;
pub use sync::SyncRequest;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncConfig>,
    pub tracker: IdempotencyTracker,
}

impl AppState {
    pub fn new(sync: SyncConfig, tracker: IdempotencyTracker) -> Self {
        Self {
            sync: Arc::new(sync),
            tracker,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sync", post(sync::run_sync))
        .route("/debug", post(probe::run_probe))
        .with_state(state)
        // Apply layers from innermost to outermost
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "dedup": state.tracker.is_enabled(),
    }))
}

/// Decode an optional JSON body; an empty body yields the default value
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
}
