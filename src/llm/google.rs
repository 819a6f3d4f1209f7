// Google Gemini adapter
// Streams completions from the Generative Language REST API as server-sent events.
// API Reference: https://ai.google.dev/api/generate-content#method:-models.streamgeneratecontent

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DEFAULT_GEMINI_BASE_URL;
use crate::llm::provider::{FragmentStream, LLMAdapter};
use crate::types::{AppError, AppResult, LLMRequest};

pub struct GoogleAdapter {
    client: Client,
    base_url: String,
}

// Request types for the Gemini API
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

// Response types; every SSE event carries one chunk
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl std::fmt::Display for GeminiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(status) = &self.status {
            write!(f, " (status: {}", status)?;
            if let Some(code) = self.code {
                write!(f, ", code: {}", code)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl GoogleAdapter {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_GEMINI_BASE_URL)
    }

    /// Point the adapter at another API root (proxies, test servers).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn stream_url(&self, model: &str) -> String {
        format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, model)
    }

    fn build_request(request: &LLMRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .map(|m| GeminiContent {
                role: Some(m.role.clone()),
                parts: vec![GeminiPart {
                    text: Some(m.content.clone()),
                }],
            })
            .collect();

        GeminiRequest {
            contents,
            generation_config: GeminiGenerationConfig {
                temperature: request.generation.temperature,
                top_p: request.generation.top_p,
                top_k: request.generation.top_k,
                max_output_tokens: request.generation.max_output_tokens,
                response_mime_type: request.generation.response_mime_type.clone(),
            },
        }
    }
}

impl Default for GoogleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMAdapter for GoogleAdapter {
    async fn stream_chat_completion(
        &self,
        api_key: &str,
        request: &LLMRequest,
    ) -> AppResult<FragmentStream> {
        let url = self.stream_url(&request.model);
        let body = Self::build_request(request);

        debug!(model = %request.model, turns = body.contents.len(), "Starting Gemini stream");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Service(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                return Err(AppError::Service(format!(
                    "Gemini API error ({}): {}",
                    status, error_response.error
                )));
            }

            return Err(AppError::Service(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| AppError::Service(format!("Gemini stream interrupted: {}", e))))
            .boxed();
        Ok(fragments(bytes))
    }
}

/// Incremental decoder for a `text/event-stream` body.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed raw bytes; returns the data payload of every event completed by them.
    /// A line that is not valid UTF-8 is a service error.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> AppResult<Vec<String>> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = decode_line(&line)?;

            if line.is_empty() {
                if let Some(event) = self.take_event() {
                    events.push(event);
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // Comments, `event:`, `id:` and `retry:` lines carry nothing we need
        }

        Ok(events)
    }

    /// Flush whatever is left once the body ends.
    pub(crate) fn finish(&mut self) -> AppResult<Option<String>> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            if let Some(value) = decode_line(&rest)?.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
        }
        Ok(self.take_event())
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}

fn decode_line(line: &[u8]) -> AppResult<&str> {
    std::str::from_utf8(line)
        .map(|l| l.trim_end_matches(['\n', '\r']))
        .map_err(|e| AppError::Service(format!("Gemini stream is not valid UTF-8: {}", e)))
}

/// Decode one event payload into its text fragment (possibly empty).
fn decode_chunk(payload: &str) -> AppResult<String> {
    let chunk: GeminiStreamChunk = serde_json::from_str(payload)
        .map_err(|e| AppError::Service(format!("Malformed Gemini stream chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(AppError::Service(format!("Gemini stream error: {}", error)));
    }

    let mut text = String::new();
    if let Some(candidate) = chunk.candidates.first() {
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                if let Some(t) = &part.text {
                    text.push_str(t);
                }
            }
        }
        match candidate.finish_reason.as_deref() {
            None | Some("STOP") | Some("MAX_TOKENS") => {}
            Some(reason) => warn!(finish_reason = reason, "Gemini stopped early"),
        }
    }
    Ok(text)
}

struct StreamState {
    bytes: BoxStream<'static, AppResult<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<AppResult<String>>,
    done: bool,
}

/// Turn the raw response body into a stream of non-empty text fragments.
/// The stream ends after the first error.
fn fragments(bytes: BoxStream<'static, AppResult<Bytes>>) -> FragmentStream {
    let state = StreamState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                    state.done = true;
                }
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            let decoded = match state.bytes.next().await {
                Some(Ok(chunk)) => state.decoder.push(&chunk),
                Some(Err(e)) => Err(e),
                None => {
                    state.done = true;
                    state.decoder.finish().map(|tail| tail.into_iter().collect())
                }
            };
            let payloads = match decoded {
                Ok(payloads) => payloads,
                Err(e) => {
                    state.pending.push_back(Err(e));
                    continue;
                }
            };

            for payload in payloads {
                match decode_chunk(&payload) {
                    Ok(text) if text.is_empty() => {}
                    item => state.pending.push_back(item),
                }
            }
        }
    })
    .boxed()
}
