//! # filebox-api
//!
//! REST API layer for Filebox. Validates file requests and forwards them to
//! the configured [`FileStore`].

pub mod routes;

use axum::Router;
use filebox_common::config::FilesConfig;
use filebox_storage::FileStore;
use std::sync::Arc;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Object storage gateway (S3/MinIO or local filesystem).
    pub store: Arc<dyn FileStore>,
    /// Upload limits and allowed content types.
    pub files: Arc<FilesConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn FileStore>, files: FilesConfig) -> Self {
        Self {
            store,
            files: Arc::new(files),
        }
    }
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::files::router(state.files.max_request_bytes))
        .merge(routes::health::router());

    Router::new()
        .nest("/api", api_routes)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
