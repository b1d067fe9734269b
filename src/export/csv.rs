//! CSV siblings of captured tables
//!
//! The header is taken from the first row's columns and every cell is
//! double-quoted, with embedded quotes doubled.

use csv::{QuoteStyle, WriterBuilder};

use crate::error::{BackupError, BackupResult};
use crate::models::record::{cell_text, Record};

/// Render rows as CSV text; an empty table renders as nothing
pub fn rows_to_csv(rows: &[Record]) -> BackupResult<Vec<u8>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let headers: Vec<&String> = first.keys().collect();

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers.iter().map(|h| h.as_str()))?;

    for row in rows {
        let cells = headers
            .iter()
            .map(|column| row.get(column.as_str()).map(cell_text).unwrap_or_default());
        writer.write_record(cells)?;
    }

    writer
        .into_inner()
        .map_err(|e| BackupError::Csv(format!("Failed to finish CSV: {}", e)))
}
