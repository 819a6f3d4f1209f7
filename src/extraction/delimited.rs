use csv::ReaderBuilder;

use super::table;
use crate::types::{AppError, AppResult};

/// Render a CSV file as a single text table.
pub fn extract(bytes: &[u8]) -> AppResult<String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Format(format!("invalid CSV header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if header.is_empty() {
        return Err(AppError::Format("CSV file has no columns".to_string()));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| AppError::Format(format!("invalid CSV record {}: {}", line + 1, e)))?;
        rows.push(record.iter().map(|c| c.trim().to_string()).collect());
    }

    Ok(table::render(&header, &rows))
}
