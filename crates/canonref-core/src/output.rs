//! JSON output types for the CLI.
//!
//! Every response carries `status` first and a `schema_version` so callers
//! can detect format changes. Responses are written to stdout; logs go to
//! stderr.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{CanonError, OutputErrorCode};
use crate::record::{ChangeRecord, UnresolvedRef};
use crate::resolve::ResolveError;
use crate::run::{FileChange, FileFailure, RunMode, RunReport};

/// Current JSON schema version.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Run
// ============================================================================

/// Counts printed for every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub files_modified: usize,
    pub total_changes: usize,
    pub unresolved: usize,
    pub failures: usize,
    pub unstable: usize,
}

impl From<&RunReport> for RunSummary {
    fn from(report: &RunReport) -> Self {
        RunSummary {
            files_scanned: report.files_scanned,
            files_modified: report.files_modified,
            total_changes: report.total_changes,
            unresolved: report.unresolved.len(),
            failures: report.failures.len(),
            unstable: report.unstable.len(),
        }
    }
}

/// Response for `run` and `check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub status: String,
    pub schema_version: String,
    pub mode: RunMode,
    pub started_at: String,
    pub finished_at: String,
    pub summary: RunSummary,
    pub files: Vec<FileChange>,
    pub records: Vec<ChangeRecord>,
    pub unresolved: Vec<UnresolvedRef>,
    pub failures: Vec<FileFailure>,
    pub unstable: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_error: Option<String>,
}

impl RunResponse {
    pub fn new(report: RunReport, export_path: Option<String>) -> Self {
        RunResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            mode: report.mode,
            summary: RunSummary::from(&report),
            started_at: report.started_at,
            finished_at: report.finished_at,
            files: report.files,
            records: report.records,
            unresolved: report.unresolved,
            failures: report.failures,
            unstable: report.unstable,
            export_path: if report.export_error.is_none() {
                export_path
            } else {
                None
            },
            export_error: report.export_error,
        }
    }
}

// ============================================================================
// Resolve
// ============================================================================

/// Response for `resolve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub status: String,
    pub schema_version: String,
    pub file: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved: Option<ResolveError>,
}

impl ResolveResponse {
    pub fn new(
        file: impl Into<String>,
        reference: impl Into<String>,
        result: Result<String, ResolveError>,
    ) -> Self {
        let (canonical, unresolved) = match result {
            Ok(canonical) => (Some(canonical), None),
            Err(err) => (None, Some(err)),
        };
        ResolveResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file: file.into(),
            reference: reference.into(),
            canonical,
            unresolved,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the process exit code.
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ErrorInfo {
    pub fn from_error(err: &CanonError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            file: err.file().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(err: &CanonError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_shape() {
        let err = CanonError::invalid_root("/missing", "No such file or directory");
        let response = ErrorResponse::new(&err);
        let mut out = Vec::new();
        emit_response(&response, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["error"]["code"], 3);
        assert!(json["error"].get("file").is_none());
    }

    #[test]
    fn status_is_serialized_first() {
        let response = ResolveResponse::new("a/b.dart", "../x", Ok("p/a/x".to_string()));
        let text = serde_json::to_string(&response).unwrap();
        assert!(text.starts_with("{\"status\":\"ok\""));
        assert!(!text.contains("unresolved"));
    }

    #[test]
    fn unresolved_resolve_response() {
        let response = ResolveResponse::new(
            "a/b.dart",
            "../../x",
            Err(ResolveError::AboveRoot { ups: 2, depth: 1 }),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("canonical").is_none());
        assert_eq!(json["unresolved"]["reason"], "above_root");
    }

    #[test]
    fn run_response_drops_export_path_on_failure() {
        let mut report = RunReport {
            mode: RunMode::DryRun,
            started_at: "2026-01-01T00:00:00Z".to_string(),
            finished_at: "2026-01-01T00:00:01Z".to_string(),
            files_scanned: 2,
            files_modified: 0,
            total_changes: 0,
            records: Vec::new(),
            files: Vec::new(),
            unresolved: Vec::new(),
            failures: Vec::new(),
            unstable: Vec::new(),
            export_error: None,
        };
        let ok = RunResponse::new(report.clone(), Some("out.csv".to_string()));
        assert_eq!(ok.export_path.as_deref(), Some("out.csv"));
        assert_eq!(ok.summary.files_scanned, 2);

        report.export_error = Some("denied".to_string());
        let failed = RunResponse::new(report, Some("out.csv".to_string()));
        assert!(failed.export_path.is_none());
        assert_eq!(failed.export_error.as_deref(), Some("denied"));
    }
}
