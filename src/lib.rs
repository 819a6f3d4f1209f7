// Oxidized Extract - ask a language model questions about an uploaded document

pub mod config;
pub mod types;
pub mod models;
pub mod extraction;
pub mod llm;
pub mod agents;
pub mod cycle;
pub mod routes;
pub mod middleware;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
