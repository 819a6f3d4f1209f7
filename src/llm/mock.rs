// In-process adapter used by the test suites

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::llm::provider::{FragmentStream, LLMAdapter};
use crate::types::{AppError, AppResult, LLMRequest};

#[derive(Default)]
pub struct MockAdapter {
    fragments: Vec<Result<String, String>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<LLMRequest>>,
    last_api_key: Mutex<Option<String>>,
}

impl MockAdapter {
    pub fn with_fragments(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            ..Default::default()
        }
    }

    /// Emits `fragments` and then fails mid-stream.
    pub fn failing_after(fragments: &[&str], message: &str) -> Self {
        let mut mock = Self::with_fragments(fragments);
        mock.fragments.push(Err(message.to_string()));
        mock
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<LLMRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn last_api_key(&self) -> Option<String> {
        self.last_api_key.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMAdapter for MockAdapter {
    async fn stream_chat_completion(
        &self,
        api_key: &str,
        request: &LLMRequest,
    ) -> AppResult<FragmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        *self.last_api_key.lock().unwrap() = Some(api_key.to_string());

        let items: Vec<AppResult<String>> = self
            .fragments
            .iter()
            .map(|item| match item {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(AppError::Service(message.clone())),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }
}
