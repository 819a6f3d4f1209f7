use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::types::{AppError, AppResult, LLMRequest};

/// Ordered, finite sequence of text fragments produced by a streaming completion.
pub type FragmentStream = BoxStream<'static, AppResult<String>>;

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    /// Start a streaming completion. Errors before the first fragment are
    /// returned directly; later failures arrive as `Err` items in the stream.
    async fn stream_chat_completion(
        &self,
        api_key: &str,
        request: &LLMRequest,
    ) -> AppResult<FragmentStream>;
}

/// Configuration for an LLM provider
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: Option<String>,
    pub base_url: String,
}

pub struct LLM {
    adapter: Arc<dyn LLMAdapter>,
    api_key: Option<String>,
    provider_name: String,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let adapter: Arc<dyn LLMAdapter> = match provider.name.as_str() {
            "google" | "gemini" => Arc::new(
                crate::llm::google::GoogleAdapter::with_base_url(&provider.base_url),
            ),
            other => {
                return Err(AppError::Config(format!("Unsupported LLM provider: {}", other)))
            }
        };

        Ok(Self::with_adapter(provider.name, adapter, provider.api_key))
    }

    /// Wrap an existing adapter, e.g. a test double.
    pub fn with_adapter(
        provider_name: impl Into<String>,
        adapter: Arc<dyn LLMAdapter>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            adapter,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            provider_name: provider_name.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fails with a configuration error when no API key is available.
    pub fn ensure_credentials(&self) -> AppResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::Config(format!(
                "No API key configured for provider '{}'. Set GEMINI_API_KEY.",
                self.provider_name
            ))
        })
    }

    pub async fn stream_chat_completion(&self, request: &LLMRequest) -> AppResult<FragmentStream> {
        let api_key = self.ensure_credentials()?;
        self.adapter.stream_chat_completion(api_key, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockAdapter;
    use crate::types::{GenerationConfig, LLMMessage};

    fn request() -> LLMRequest {
        LLMRequest {
            model: "mock-model".to_string(),
            messages: vec![LLMMessage::user("hi")],
            generation: GenerationConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_never_reach_adapter() {
        let mock = Arc::new(MockAdapter::with_fragments(&["unused"]));
        let llm = LLM::with_adapter("mock", mock.clone(), Some("   ".to_string()));

        assert!(!llm.has_credentials());
        let err = llm.stream_chat_completion(&request()).await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_credentials_are_passed_to_adapter() {
        let mock = Arc::new(MockAdapter::with_fragments(&["ok"]));
        let llm = LLM::with_adapter("mock", mock.clone(), Some("key-123".to_string()));

        let _stream = llm.stream_chat_completion(&request()).await.unwrap();
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.last_api_key().as_deref(), Some("key-123"));
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let result = LLM::new(LLMProviderConfig {
            name: "openai".to_string(),
            api_key: Some("key".to_string()),
            base_url: String::new(),
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
