use std::convert::Infallible;

use axum::{
    extract::{Multipart, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures::{stream, Stream, StreamExt};
use tracing::info;

use crate::cycle::UploadedDocument;
use crate::models::{AppState, ExtractionResponse};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/extract", post(extract))
        .route("/api/extract/stream", post(extract_stream))
        .with_state(state)
}

/// Fields of the upload form
struct ExtractionForm {
    document: Option<UploadedDocument>,
    query: String,
}

async fn read_form(mut multipart: Multipart) -> AppResult<ExtractionForm> {
    let mut document = None;
    let mut query = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Input(format!("Failed to parse multipart data: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Input(format!("Failed to read uploaded file: {}", e)))?;
                document = Some(UploadedDocument::new(filename, bytes));
            }
            "query" => {
                query = field
                    .text()
                    .await
                    .map_err(|e| AppError::Input(format!("Failed to read query: {}", e)))?;
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown form field");
            }
        }
    }

    Ok(ExtractionForm { document, query })
}

/// POST /api/extract - run one extraction cycle and return the full answer
async fn extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<ExtractionResponse>> {
    let form = read_form(multipart).await?;
    info!(
        filename = ?form.document.as_ref().map(|d| d.filename.as_str()),
        query_len = form.query.len(),
        "Extraction request received"
    );

    let outcome = state.cycle.run(form.document, &form.query).await?;
    Ok(Json(outcome.into()))
}

/// POST /api/extract/stream - same form, answer delivered as server-sent events
async fn extract_stream(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let form = read_form(multipart).await?;
    info!(query_len = form.query.len(), "Streaming extraction request received");

    let cycle = state.cycle.run_streaming(form.document, &form.query).await?;
    let cycle_id = cycle.cycle_id;

    // One event per fragment, then `done`; an `error` event ends the stream
    let events = stream::unfold(Some(cycle.fragments), move |fragments| async move {
        let mut fragments = fragments?;
        let event = match fragments.next().await {
            Some(Ok(text)) => {
                return Some((sse_text("fragment", &text), Some(fragments)));
            }
            Some(Err(e)) => {
                tracing::error!(%cycle_id, error = %e, "Answer stream failed");
                sse_text("error", &e.to_string())
            }
            None => Event::default().event("done").data(cycle_id.to_string()),
        };
        Some((event, None))
    })
    .map(Ok);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// SSE cannot carry carriage returns; newlines become separate `data:` lines
fn sse_text(event: &str, text: &str) -> Event {
    Event::default().event(event).data(text.replace('\r', ""))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;

    use super::*;
    use crate::agents::QueryAgent;
    use crate::config::Config;
    use crate::cycle::ExtractionCycle;
    use crate::extraction::DocumentKind;
    use crate::llm::mock::MockAdapter;
    use crate::llm::LLM;

    fn server(mock: Arc<MockAdapter>, api_key: Option<&str>, upload_dir: &std::path::Path) -> TestServer {
        let config = Config::from_lookup(|_| None).unwrap();
        let llm = LLM::with_adapter("mock", mock, api_key.map(String::from));
        let agent = QueryAgent::new(Arc::new(llm), config.llm.model.clone(), config.generation.clone());
        let state = AppState {
            config,
            cycle: Arc::new(ExtractionCycle::new(Arc::new(agent), upload_dir)),
        };
        TestServer::new(router(state)).unwrap()
    }

    fn form(query: &str, filename: &str, contents: &[u8]) -> MultipartForm {
        MultipartForm::new()
            .add_text("query", query.to_string())
            .add_part("file", Part::bytes(contents.to_vec()).file_name(filename.to_string()))
    }

    #[tokio::test]
    async fn test_extract_returns_answer() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockAdapter::with_fragments(&["Ja", "ne"]));
        let server = server(mock.clone(), Some("key"), dir.path());

        let response = server
            .post("/api/extract")
            .multipart(form("extract the name", "resume.txt", b"Name: Jane"))
            .await;

        response.assert_status(StatusCode::OK);
        let body: ExtractionResponse = response.json();
        assert_eq!(body.answer, "Jane");
        assert_eq!(body.filename, "resume.txt");
        assert_eq!(body.document_kind, DocumentKind::PlainText);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockAdapter::with_fragments(&["Jane"]));
        let server = server(mock.clone(), Some("key"), dir.path());

        let response = server
            .post("/api/extract")
            .multipart(form("  ", "resume.txt", b"Name: Jane"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "input_error");
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockAdapter::with_fragments(&["Jane"]));
        let server = server(mock, Some("key"), dir.path());

        let response = server
            .post("/api/extract")
            .multipart(form("extract the name", "resume.docx", b"not a docx"))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json();
        assert!(body["message"].as_str().unwrap().starts_with("Could not read this file"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_credential_is_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockAdapter::with_fragments(&["Jane"]));
        let server = server(mock.clone(), None, dir.path());

        let response = server
            .post("/api/extract")
            .multipart(form("extract the name", "resume.txt", b"Name: Jane"))
            .await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_stream_emits_fragments_then_done() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockAdapter::with_fragments(&["Ja", "ne"]));
        let server = server(mock, Some("key"), dir.path());

        let response = server
            .post("/api/extract/stream")
            .multipart(form("extract the name", "resume.txt", b"Name: Jane"))
            .await;

        response.assert_status(StatusCode::OK);
        let body = response.text();
        let ja = body.find("data: Ja").unwrap();
        let ne = body.find("data: ne").unwrap();
        let done = body.find("event: done").unwrap();
        assert!(ja < ne && ne < done);
    }

    #[tokio::test]
    async fn test_stream_failure_emits_error_event() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockAdapter::failing_after(&["Ja"], "backend unavailable"));
        let server = server(mock, Some("key"), dir.path());

        let response = server
            .post("/api/extract/stream")
            .multipart(form("extract the name", "resume.txt", b"Name: Jane"))
            .await;

        let body = response.text();
        assert!(body.contains("event: error"));
        assert!(body.contains("backend unavailable"));
        assert!(!body.contains("event: done"));
    }
}
