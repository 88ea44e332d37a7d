//! Tabular view of result records

use serde_json::Value;

use crate::assembler::ResultRecord;
use crate::util::truncate_string;

/// Column order of [`rows`]
pub const COLUMNS: [&str; 8] = [
    "id",
    "timestamp",
    "outcome",
    "status",
    "error",
    "error_details",
    "request",
    "response",
];

/// Widest JSON cell before truncation
const MAX_JSON_WIDTH: usize = 60;

/// Flatten records into rows of cells ordered as [`COLUMNS`]
pub fn rows(records: &[ResultRecord]) -> Vec<Vec<String>> {
    records.iter().map(row).collect()
}

fn row(record: &ResultRecord) -> Vec<String> {
    let details = record
        .error_details()
        .map(|details| {
            details
                .iter()
                .map(|d| format!("{}: {}", d.parameter_id, d.message))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default();

    vec![
        record.id.clone(),
        record.timestamp.to_rfc3339(),
        format!("{:?}", record.outcome),
        record.status_code.to_string(),
        record.error().unwrap_or_default().to_string(),
        details,
        json_cell(&record.request),
        json_cell(&record.response),
    ]
}

fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => truncate_string(&other.to_string(), MAX_JSON_WIDTH),
    }
}

/// Render records as an aligned plain-text table
pub fn render_table(records: &[ResultRecord]) -> String {
    let rows = rows(records);

    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-");

    let mut lines = vec![format_line(&header), separator];
    lines.extend(rows.iter().map(|row| format_line(row)));
    lines.join("\n")
}
