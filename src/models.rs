use std::sync::Arc;

use crate::agents::QueryAgent;
use crate::config::Config;
use crate::cycle::{CycleOutcome, ExtractionCycle};
use crate::extraction::DocumentKind;
use crate::llm::{LLMProviderConfig, LLM};
use crate::types::AppResult;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cycle: Arc<ExtractionCycle>,
}

impl AppState {
    /// Wire the provider, the query agent and the extraction cycle from configuration.
    pub fn new(config: Config) -> AppResult<Self> {
        let llm = LLM::new(LLMProviderConfig {
            name: config.llm.provider.clone(),
            api_key: config.llm.api_key.clone(),
            base_url: config.llm.base_url.clone(),
        })?;
        let agent = QueryAgent::new(
            Arc::new(llm),
            config.llm.model.clone(),
            config.generation.clone(),
        );
        let cycle = ExtractionCycle::new(Arc::new(agent), config.upload.temp_dir.clone());

        Ok(Self {
            config,
            cycle: Arc::new(cycle),
        })
    }
}

// API Request/Response types

/// Response of `POST /api/extract`
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ExtractionResponse {
    pub cycle_id: uuid::Uuid,
    pub filename: String,
    pub document_kind: DocumentKind,
    pub extracted_chars: usize,
    /// The model's answer, rendered as-is by the page
    pub answer: String,
}

impl From<CycleOutcome> for ExtractionResponse {
    fn from(outcome: CycleOutcome) -> Self {
        Self {
            cycle_id: outcome.cycle_id,
            filename: outcome.document.filename,
            document_kind: outcome.document.document_kind,
            extracted_chars: outcome.document.extracted_chars,
            answer: outcome.answer,
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub provider: String,
    pub model: String,
    pub credential_configured: bool,
}
