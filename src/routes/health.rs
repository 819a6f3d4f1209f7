use axum::{extract::State, routing::get, Json, Router};

use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let llm = state.cycle.agent().llm();

    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        provider: llm.provider_name().to_string(),
        model: state.cycle.agent().model().to_string(),
        credential_configured: llm.has_credentials(),
    };

    Json(response)
}
