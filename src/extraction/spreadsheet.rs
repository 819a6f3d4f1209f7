use std::io::Cursor;

use calamine::{Data, Reader, Sheets, Xls, Xlsx};
use chrono::Timelike;
use tracing::debug;

use super::table;
use crate::types::{AppError, AppResult};

/// Flatten every sheet of a workbook, in workbook order, into labelled text tables.
pub fn extract(bytes: &[u8], extension: &str) -> AppResult<String> {
    let mut workbook = open(bytes, extension)?;
    let mut text = String::new();

    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| AppError::Format(format!("unreadable sheet {:?}: {}", sheet, e)))?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
        let header = rows.next().unwrap_or_default();
        let body: Vec<Vec<String>> = rows.collect();

        debug!(sheet = %sheet, rows = body.len(), "Rendering sheet");

        text.push_str(&format!("\nSheet: {}\n", sheet));
        text.push_str(&table::render(&header, &body));
    }

    Ok(text)
}

fn open<'a>(bytes: &'a [u8], extension: &str) -> AppResult<Sheets<Cursor<&'a [u8]>>> {
    let cursor = Cursor::new(bytes);
    if extension == "xls" {
        Xls::new(cursor)
            .map(Sheets::Xls)
            .map_err(|e| AppError::Format(format!("corrupt xls workbook: {}", e)))
    } else {
        Xlsx::new(cursor)
            .map(Sheets::Xlsx)
            .map_err(|e| AppError::Format(format!("corrupt xlsx workbook: {}", e)))
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Date-formatted cells are stored as serial numbers
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.num_seconds_from_midnight() == 0 => {
                value.format("%Y-%m-%d").to_string()
            }
            Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}
