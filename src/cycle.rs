//! Extraction Cycle
//!
//! One user action: validate, stage the upload in a private temporary file,
//! extract its text, query the model, clean up. The temporary file is removed
//! on every exit path because it lives in a guard that deletes on drop.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::agents::QueryAgent;
use crate::extraction::{self, DocumentKind};
use crate::llm::FragmentStream;
use crate::types::{AppError, AppResult};

/// A file as received from the user.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Bytes,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn extension(&self) -> String {
        extraction::extension_of(&self.filename)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub document_kind: DocumentKind,
    pub extracted_chars: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub cycle_id: Uuid,
    pub document: DocumentSummary,
    pub answer: String,
}

/// Answer stream handed out by [`ExtractionCycle::run_streaming`].
/// The upload has already been extracted and deleted.
pub struct StreamingCycle {
    pub cycle_id: Uuid,
    pub document: DocumentSummary,
    pub fragments: FragmentStream,
}

struct PreparedCycle {
    cycle_id: Uuid,
    document: DocumentSummary,
    text: String,
}

/// Temporary copy of an upload, deleted when dropped.
struct TempUpload {
    file: NamedTempFile,
}

impl TempUpload {
    fn write(dir: &Path, extension: &str, bytes: &[u8]) -> AppResult<Self> {
        let suffix = if extension.is_empty() {
            String::new()
        } else {
            format!(".{}", extension)
        };

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| AppError::Internal(format!("failed to create temporary file: {}", e)))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| AppError::Internal(format!("failed to stage upload: {}", e)))?;

        debug!(path = %file.path().display(), bytes = bytes.len(), "Staged upload");
        Ok(Self { file })
    }

    fn path(&self) -> &Path {
        self.file.path()
    }

    fn remove(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!(path = %path.display(), "Removed staged upload"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged upload"),
        }
    }
}

pub struct ExtractionCycle {
    agent: Arc<QueryAgent>,
    upload_dir: PathBuf,
}

impl ExtractionCycle {
    pub fn new(agent: Arc<QueryAgent>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            agent,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn agent(&self) -> &QueryAgent {
        &self.agent
    }

    /// Run a full cycle and return the complete answer.
    pub async fn run(
        &self,
        document: Option<UploadedDocument>,
        user_query: &str,
    ) -> AppResult<CycleOutcome> {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("extraction_cycle", %cycle_id);

        async move {
            let prepared = self.prepare(cycle_id, document, user_query).await?;
            let answer = self.agent.generate(&prepared.text, user_query).await?;

            info!(answer_len = answer.len(), "Extraction cycle completed");
            Ok::<_, AppError>(CycleOutcome {
                cycle_id: prepared.cycle_id,
                document: prepared.document,
                answer,
            })
        }
        .instrument(span)
        .await
    }

    /// Run the cycle up to the model call and hand back the answer stream.
    pub async fn run_streaming(
        &self,
        document: Option<UploadedDocument>,
        user_query: &str,
    ) -> AppResult<StreamingCycle> {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("extraction_cycle", %cycle_id, streaming = true);

        async move {
            let prepared = self.prepare(cycle_id, document, user_query).await?;
            let fragments = self.agent.stream(&prepared.text, user_query).await?;

            Ok::<_, AppError>(StreamingCycle {
                cycle_id: prepared.cycle_id,
                document: prepared.document,
                fragments,
            })
        }
        .instrument(span)
        .await
    }

    /// Credential check, input validation and extraction. The staged upload
    /// is gone when this returns, whatever the outcome.
    async fn prepare(
        &self,
        cycle_id: Uuid,
        document: Option<UploadedDocument>,
        user_query: &str,
    ) -> AppResult<PreparedCycle> {
        self.agent.llm().ensure_credentials()?;

        let document = document
            .ok_or_else(|| AppError::Input("Please upload a document first.".to_string()))?;
        if document.bytes.is_empty() {
            return Err(AppError::Input(format!(
                "The uploaded file '{}' is empty.",
                document.filename
            )));
        }
        if user_query.trim().is_empty() {
            return Err(AppError::Input(
                "Please enter the query you want to extract.".to_string(),
            ));
        }

        let extension = document.extension();
        let document_kind = DocumentKind::from_extension(&extension);
        info!(
            filename = %document.filename,
            kind = %document_kind,
            bytes = document.bytes.len(),
            "Starting extraction cycle"
        );

        let upload = TempUpload::write(&self.upload_dir, &extension, &document.bytes)?;
        let path = upload.path().to_path_buf();
        let text = tokio::task::spawn_blocking(move || extraction::extract_file(&path))
            .await
            .map_err(|e| AppError::Internal(format!("extraction task failed: {}", e)))??;
        upload.remove();

        Ok(PreparedCycle {
            cycle_id,
            document: DocumentSummary {
                filename: document.filename,
                document_kind,
                extracted_chars: text.chars().count(),
            },
            text,
        })
    }
}
