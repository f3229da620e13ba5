//! Export helpers: DDL scripts and fetched rows as CSV or JSON.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::info;

use crate::ddl::DdlGenerator;
use crate::row::Row;
use crate::{OrmError, Result};

/// DDL script for every object of `generator`.
pub fn export_ddl(generator: &DdlGenerator) -> Result<String> {
    generator.export()
}

pub fn export_ddl_to_file(generator: &DdlGenerator, path: impl AsRef<Path>) -> Result<()> {
    let script = generator.export()?;
    std::fs::write(path.as_ref(), script)?;
    info!(path = %path.as_ref().display(), "Exported DDL");
    Ok(())
}

/// Writes `rows` as CSV with a header line.
///
/// Columns come from the first row; later rows are written in that column
/// order and missing cells are left empty. NULL is an empty cell.
pub fn rows_to_csv<W: Write>(rows: &[Row], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    if let Some(first) = rows.first() {
        let header: Vec<&str> = first.columns().collect();
        csv.write_record(&header).map_err(csv_error)?;

        for row in rows {
            let record: Vec<String> = header
                .iter()
                .map(|column| row.get(column).map(|v| v.to_text()).unwrap_or_default())
                .collect();
            csv.write_record(&record).map_err(csv_error)?;
        }
    }

    csv.flush()?;
    Ok(())
}

pub fn rows_to_csv_string(rows: &[Row]) -> Result<String> {
    let mut buffer = Vec::new();
    rows_to_csv(rows, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| OrmError::Serialization(e.to_string()))
}

pub fn rows_to_csv_file(rows: &[Row], path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path.as_ref())?;
    rows_to_csv(rows, file)?;
    info!(path = %path.as_ref().display(), rows = rows.len(), "Exported rows as CSV");
    Ok(())
}

/// Rows as a JSON array of objects.
pub fn rows_to_json(rows: &[Row]) -> JsonValue {
    JsonValue::Array(rows.iter().map(Row::to_json).collect())
}

pub fn rows_to_json_string(rows: &[Row], pretty: bool) -> Result<String> {
    let value = rows_to_json(rows);
    let json = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(json)
}

fn csv_error(e: csv::Error) -> OrmError {
    OrmError::Serialization(format!("CSV export failed: {}", e))
}
