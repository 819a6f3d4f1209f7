//! API Routes
//!
//! HTTP endpoints of the extractor:
//! - `/` - Upload page
//! - `/api/extract` - Run one extraction cycle (multipart form)
//! - `/api/extract/stream` - Same, answer streamed as server-sent events
//! - `/api/health` - Health check

pub mod extract;
pub mod health;
pub mod ui;

use axum::{extract::DefaultBodyLimit, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let max_upload_bytes = state.config.server.max_upload_bytes;
    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(extract::router(state.clone()))
        .merge(health::router(state))
        .merge(ui::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
