use lopdf::Document;
use tracing::debug;

use crate::types::{AppError, AppResult};

/// Extract the text layer of every page, in page order.
///
/// Scanned documents without a text layer are rejected rather than sent to
/// the model as an empty prompt.
pub fn extract(bytes: &[u8]) -> AppResult<String> {
    let document = Document::load_mem(bytes)
        .map_err(|e| AppError::Format(format!("invalid PDF: {}", e)))?;

    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    debug!(pages = pages.len(), "Extracting PDF text layer");

    let text = document
        .extract_text(&pages)
        .map_err(|e| AppError::Format(format!("unreadable PDF text: {}", e)))?;

    if text.trim().is_empty() {
        return Err(AppError::Format("PDF has no extractable text layer".to_string()));
    }
    Ok(text)
}
