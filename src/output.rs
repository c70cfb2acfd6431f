use crate::error::{AppError, Result};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};

/// Text of a single cell, failing for anything the API did not return as a string.
///
/// `row` and `column` are zero-based; the error reports them one-based.
pub fn cell_text(row: usize, column: usize, cell: &Value) -> Result<&str> {
    cell.as_str().ok_or_else(|| AppError::DataShape {
        row: row + 1,
        column: column + 1,
        value: cell.to_string(),
    })
}

/// Echo rows to the console, tab separated.
pub fn print_rows<W: Write>(out: &mut W, rows: &[Vec<Value>]) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "No data found.")?;
        return Ok(());
    }

    for row in rows {
        let line = row
            .iter()
            .map(|cell| match cell {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(out, "{}", line)?;
    }

    Ok(())
}

/// Write rows to `path` as CSV, one record per row and no header.
#[instrument(name = "Writing CSV", skip(rows))]
pub fn write_rows(path: &Path, rows: &[Vec<Value>]) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| AppError::Output(format!("Cannot create file {:?}: {}", path, e)))?;

    write_records(file, rows)?;
    info!(rows = rows.len(), "Wrote CSV");

    Ok(())
}

fn write_records<W: Write>(sink: W, rows: &[Vec<Value>]) -> Result<()> {
    // Rows from a range may be ragged: trailing empty cells are omitted by the API
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(sink);

    for (row_idx, row) in rows.iter().enumerate() {
        let record = row
            .iter()
            .enumerate()
            .map(|(col_idx, cell)| cell_text(row_idx, col_idx, cell))
            .collect::<Result<Vec<&str>>>()?;

        writer
            .write_record(&record)
            .map_err(|e| AppError::Output(format!("Cannot write to file: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::Output(format!("Cannot flush file: {}", e)))?;

    Ok(())
}
