//! Change records, unresolved references, and record export.
//!
//! A [`ChangeRecord`] is produced for every rewritten span. Records are
//! detached from the file they describe: they hold copies of the original
//! and replacement text and stay valid after the file is written.
//!
//! Records can be exported as CSV or as JSON Lines, picked by the export
//! path's extension.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CanonError, CanonResult};
use crate::resolve::ResolveError;

/// One rewritten span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Root-relative path, forward slashes.
    pub file: String,
    /// 1-indexed line of the span start.
    pub line: u32,
    /// 1-indexed column of the span start, in characters.
    pub column: u32,
    pub original: String,
    pub replacement: String,
    /// Name of the rule that produced the change.
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A candidate reference that was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedRef {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub reference: String,
    #[serde(flatten)]
    pub reason: ResolveError,
}

// ============================================================================
// Export
// ============================================================================

/// File format for exported change records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    JsonLines,
}

impl ExportFormat {
    /// Pick a format from the path's extension. Defaults to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl") | Some("json") | Some("ndjson") => ExportFormat::JsonLines,
            _ => ExportFormat::Csv,
        }
    }
}

const CSV_HEADER: [&str; 5] = ["file", "line", "original", "replacement", "note"];

/// Write records as CSV with a header row. Fields are quoted when needed.
pub fn write_csv<W: Write>(records: &[ChangeRecord], writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{}", CSV_HEADER.join(","))?;
    for record in records {
        let line = record.line.to_string();
        let fields = [
            record.file.as_str(),
            line.as_str(),
            record.original.as_str(),
            record.replacement.as_str(),
            record.note.as_deref().unwrap_or(""),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        writeln!(writer, "{}", row.join(","))?;
    }
    Ok(())
}

/// Quote a CSV field if it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write one compact JSON object per record.
pub fn write_json_lines<W: Write>(records: &[ChangeRecord], writer: &mut W) -> io::Result<()> {
    for record in records {
        let json = serde_json::to_string(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{}", json)?;
    }
    Ok(())
}

/// Export records to `path`, creating or truncating it.
pub fn export_records(records: &[ChangeRecord], path: &Path) -> CanonResult<()> {
    let export_err = |e: io::Error| CanonError::Export {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut buf = Vec::new();
    let written = match ExportFormat::from_path(path) {
        ExportFormat::Csv => write_csv(records, &mut buf),
        ExportFormat::JsonLines => write_json_lines(records, &mut buf),
    };
    written.map_err(export_err)?;

    fs::write(path, buf).map_err(export_err)
}

// ============================================================================
// Tests
// ============================================================================
