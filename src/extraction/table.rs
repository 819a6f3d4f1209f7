//! Plain-text rendering of tabular data (spreadsheets and CSV).
//!
//! The first row is the header. Columns are right-aligned to their widest
//! cell and separated by two spaces; there is no index column.

const MISSING: &str = "NaN";
const SEPARATOR: &str = "  ";

pub fn render(header: &[String], rows: &[Vec<String>]) -> String {
    let columns = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    if columns == 0 {
        return String::new();
    }

    let header: Vec<String> = (0..columns)
        .map(|idx| match header.get(idx) {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("Unnamed: {}", idx),
        })
        .collect();

    let body: Vec<Vec<&str>> = rows
        .iter()
        .map(|row| {
            (0..columns)
                .map(|idx| match row.get(idx) {
                    Some(cell) if !cell.is_empty() => cell.as_str(),
                    _ => MISSING,
                })
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(body.len() + 1);
    lines.push(render_line(header.iter().map(String::as_str), &widths));
    for row in &body {
        lines.push(render_line(row.iter().copied(), &widths));
    }
    lines.join("\n")
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:>width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
