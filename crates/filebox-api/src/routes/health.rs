//! Health check endpoint for load balancers and container probes.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    storage: String,
}

/// Health check router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    // Reuses the store's readiness gate, so this is a no-op once the container exists.
    let storage_ok = match state.store.ready().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = ?e, "Object storage not ready");
            false
        }
    };

    Json(HealthResponse {
        status: if storage_ok {
            "healthy".into()
        } else {
            "degraded".into()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: if storage_ok { "ready".into() } else { "unavailable".into() },
    })
}
