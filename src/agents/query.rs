//! Query Agent
//!
//! Sends the extracted document and the user's instruction to the model and
//! collects the streamed answer.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info};

use crate::llm::{FragmentStream, LLM};
use crate::types::{AppResult, GenerationConfig, LLMMessage, LLMRequest};

pub struct QueryAgent {
    llm: Arc<LLM>,
    model: String,
    generation: GenerationConfig,
}

impl QueryAgent {
    pub fn new(llm: Arc<LLM>, model: impl Into<String>, generation: GenerationConfig) -> Self {
        Self {
            llm,
            model: model.into(),
            generation,
        }
    }

    pub fn llm(&self) -> &LLM {
        &self.llm
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Two user turns: the document first, then the instruction.
    pub fn build_request(&self, document_text: &str, user_query: &str) -> LLMRequest {
        LLMRequest {
            model: self.model.clone(),
            messages: vec![LLMMessage::user(document_text), LLMMessage::user(user_query)],
            generation: self.generation.clone(),
        }
    }

    /// Stream the answer fragment by fragment.
    pub async fn stream(&self, document_text: &str, user_query: &str) -> AppResult<FragmentStream> {
        let request = self.build_request(document_text, user_query);
        debug!(
            model = %request.model,
            document_chars = document_text.chars().count(),
            query_chars = user_query.chars().count(),
            "Dispatching extraction query"
        );
        self.llm.stream_chat_completion(&request).await
    }

    /// Run the query and return the whole answer once the stream is drained.
    /// Any failure discards the fragments received so far.
    pub async fn generate(&self, document_text: &str, user_query: &str) -> AppResult<String> {
        let mut stream = self.stream(document_text, user_query).await?;

        let mut answer = String::new();
        let mut fragments = 0usize;
        while let Some(fragment) = stream.next().await {
            answer.push_str(&fragment?);
            fragments += 1;
        }

        info!(fragments, answer_len = answer.len(), "Generated answer");
        Ok(answer)
    }
}
