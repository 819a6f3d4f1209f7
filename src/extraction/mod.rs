//! Document Text Extraction
//!
//! Turns an uploaded file into one flat string for the model:
//! - `docx` - paragraphs joined by newlines
//! - `xls` / `xlsx` - every sheet as a labelled text table
//! - `csv` - a single text table
//! - `pdf` - the text layer of every page
//! - anything else - raw bytes decoded as UTF-8

pub mod delimited;
pub mod docx;
pub mod pdf;
pub mod spreadsheet;
pub mod table;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{AppError, AppResult};

/// Extensions offered to the user in the upload dialog
pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "docx", "xls", "xlsx", "csv", "txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Docx,
    Spreadsheet,
    Csv,
    Pdf,
    PlainText,
}

impl DocumentKind {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "docx" => DocumentKind::Docx,
            "xls" | "xlsx" => DocumentKind::Spreadsheet,
            "csv" => DocumentKind::Csv,
            "pdf" => DocumentKind::Pdf,
            _ => DocumentKind::PlainText,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Docx => write!(f, "docx"),
            DocumentKind::Spreadsheet => write!(f, "spreadsheet"),
            DocumentKind::Csv => write!(f, "csv"),
            DocumentKind::Pdf => write!(f, "pdf"),
            DocumentKind::PlainText => write!(f, "plain_text"),
        }
    }
}

/// Extension of a filename: the text after the last `.`, lower-cased.
/// `.csv` counts as a csv file; a name without a dot has no extension.
pub fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Extract the text of a document held in memory.
pub fn extract(bytes: &[u8], extension: &str) -> AppResult<String> {
    let extension = extension.to_ascii_lowercase();
    let kind = DocumentKind::from_extension(&extension);

    let text = match kind {
        DocumentKind::Docx => docx::extract(bytes)?,
        DocumentKind::Spreadsheet => spreadsheet::extract(bytes, &extension)?,
        DocumentKind::Csv => delimited::extract(bytes)?,
        DocumentKind::Pdf => pdf::extract(bytes)?,
        DocumentKind::PlainText => String::from_utf8(bytes.to_vec())
            .map_err(|e| AppError::Format(format!("file is not valid UTF-8 text: {}", e)))?,
    };

    info!(
        kind = %kind,
        input_bytes = bytes.len(),
        extracted_chars = text.chars().count(),
        "Extracted document text"
    );
    Ok(text)
}

/// Extract the text of a document on disk, dispatching on the path's extension.
pub fn extract_file(path: &Path) -> AppResult<String> {
    let bytes = std::fs::read(path).map_err(|e| {
        AppError::Internal(format!("failed to read upload {}: {}", path.display(), e))
    })?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    extract(&bytes, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_extension() {
        assert_eq!(DocumentKind::from_extension("docx"), DocumentKind::Docx);
        assert_eq!(DocumentKind::from_extension("XLSX"), DocumentKind::Spreadsheet);
        assert_eq!(DocumentKind::from_extension("xls"), DocumentKind::Spreadsheet);
        assert_eq!(DocumentKind::from_extension("csv"), DocumentKind::Csv);
        assert_eq!(DocumentKind::from_extension("pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_extension("txt"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_extension("md"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_extension(""), DocumentKind::PlainText);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("resume.DOCX"), "docx");
        assert_eq!(extension_of("archive.tar.csv"), "csv");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".csv"), "csv");
        assert_eq!(DocumentKind::from_extension(&extension_of(".CSV")), DocumentKind::Csv);
    }

    #[test]
    fn test_plain_text_passes_through_verbatim() {
        let text = "Name: Jane\r\n  Skills: Rust, SQL\n";
        assert_eq!(extract(text.as_bytes(), "txt").unwrap(), text);
    }

    #[test]
    fn test_invalid_utf8_is_format_error() {
        let err = extract(&[0x66, 0x6f, 0xff, 0xfe], "txt").unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
    }

    #[test]
    fn test_every_supported_extension_yields_text() {
        let samples: Vec<(&str, Vec<u8>)> = vec![
            ("docx", docx::tests::build_docx(&["Jane Doe", "Engineer"])),
            (
                "xlsx",
                spreadsheet::tests::build_xlsx(&[("People", vec![vec!["name"], vec!["Jane"]])]),
            ),
            ("xls", include_bytes!("fixtures/two_sheets.xls").to_vec()),
            ("csv", b"name\nJane\n".to_vec()),
            ("pdf", pdf::tests::build_pdf("Jane Doe")),
            ("txt", b"Jane Doe".to_vec()),
        ];

        for (extension, bytes) in samples {
            let text = extract(&bytes, extension).unwrap();
            assert!(!text.trim().is_empty(), "{} produced no text", extension);
            assert!(text.contains("Jane"), "{} lost its content", extension);
        }
    }

    #[test]
    fn test_extract_file_uses_path_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.CSV");
        std::fs::write(&path, "name,age\nJane,34\n").unwrap();

        let text = extract_file(&path).unwrap();
        assert!(text.contains("Jane"));
        assert!(text.contains("age"));
    }
}
