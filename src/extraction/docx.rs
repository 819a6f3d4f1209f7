use std::io::Cursor;

use docx_rust::document::{BodyContent, Paragraph, ParagraphContent, RunContent};
use docx_rust::DocxFile;

use crate::types::{AppError, AppResult};

/// Join the text of every top-level paragraph with `\n`, in document order.
pub fn extract(bytes: &[u8]) -> AppResult<String> {
    let file = DocxFile::from_reader(Cursor::new(bytes))
        .map_err(|e| AppError::Format(format!("invalid docx container: {}", e)))?;
    let docx = file
        .parse()
        .map_err(|e| AppError::Format(format!("malformed docx document: {}", e)))?;

    let paragraphs: Vec<String> = docx
        .document
        .body
        .content
        .iter()
        .filter_map(|content| match content {
            BodyContent::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for content in &paragraph.content {
        if let ParagraphContent::Run(run) = content {
            for run_content in &run.content {
                if let RunContent::Text(t) = run_content {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use docx_rust::Docx;

    pub(crate) fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.docx");

        let mut docx = Docx::default();
        for text in paragraphs {
            docx.document.push(Paragraph::default().push_text(*text));
        }
        docx.write_file(&path).unwrap();

        std::fs::read(&path).unwrap()
    }

    #[test]
    fn test_paragraphs_joined_by_newline() {
        let bytes = build_docx(&["A", "B", "C"]);
        assert_eq!(extract(&bytes).unwrap(), "A\nB\nC");
    }

    #[test]
    fn test_single_paragraph_has_no_trailing_newline() {
        let bytes = build_docx(&["Name: Jane Doe"]);
        assert_eq!(extract(&bytes).unwrap(), "Name: Jane Doe");
    }

    #[test]
    fn test_garbage_is_format_error() {
        let err = extract(b"PK but not really a docx").unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
    }
}
