//! Run controller: walk, rewrite, write back, report.
//!
//! A run moves through `Idle → Walking → Rewriting → Reporting → Done`.
//! Dry-run and apply share every step except write-back, so a dry run
//! reports exactly the records an apply would produce.
//!
//! ## Failure policy
//!
//! - An invalid tree root aborts before any file is read.
//! - Read, decode and write failures affect one file only: they are logged,
//!   collected in [`RunReport::failures`], and the run continues.
//! - A file whose write fails is not counted as modified.
//! - A file whose rewrite is not idempotent is reported in
//!   [`RunReport::unstable`] and is never written.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diff::unified_diff;
use crate::error::{CanonError, CanonResult};
use crate::location::TreeRoot;
use crate::record::{export_records, ChangeRecord, UnresolvedRef};
use crate::rewrite::{rewrite_file, write_back, ContentHash};
use crate::rules::RuleSet;
use crate::walk::{walk, FileFilter};

// ============================================================================
// Run Phase
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Walking,
    Rewriting,
    Reporting,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Walking => "walking",
            RunPhase::Rewriting => "rewriting",
            RunPhase::Reporting => "reporting",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Run Options and Report
// ============================================================================

/// Whether a run writes changes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    DryRun,
    Apply,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    pub verify_idempotence: bool,
    /// Where to export change records, if anywhere.
    pub export: Option<PathBuf>,
    /// Attach a unified diff to each modified file.
    pub diff: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            mode: RunMode::DryRun,
            verify_idempotence: true,
            export: None,
            diff: false,
        }
    }
}

/// Which step a per-file failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Read,
    Decode,
    Write,
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub stage: FailureStage,
    pub message: String,
}

/// A file that was (or would be) modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub file: String,
    pub changes: usize,
    pub before: ContentHash,
    pub after: ContentHash,
    /// Whether the new content was written to disk.
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: RunMode,
    /// ISO 8601 UTC timestamps.
    pub started_at: String,
    pub finished_at: String,
    pub files_scanned: usize,
    pub files_modified: usize,
    pub total_changes: usize,
    pub records: Vec<ChangeRecord>,
    pub files: Vec<FileChange>,
    pub unresolved: Vec<UnresolvedRef>,
    pub failures: Vec<FileFailure>,
    /// Files whose rewrite changes again when re-applied.
    pub unstable: Vec<String>,
    /// Set when exporting records failed; the run itself still completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_error: Option<String>,
}

impl RunReport {
    fn new(mode: RunMode) -> Self {
        let now = format_timestamp(SystemTime::now());
        RunReport {
            mode,
            started_at: now.clone(),
            finished_at: now,
            files_scanned: 0,
            files_modified: 0,
            total_changes: 0,
            records: Vec::new(),
            files: Vec::new(),
            unresolved: Vec::new(),
            failures: Vec::new(),
            unstable: Vec::new(),
            export_error: None,
        }
    }

    /// Whether the run found anything to change.
    pub fn has_changes(&self) -> bool {
        self.total_changes > 0 || !self.files.is_empty() || !self.unstable.is_empty()
    }
}

// ============================================================================
// Run Controller
// ============================================================================

/// Drives one run over a tree root.
#[derive(Debug)]
pub struct RunController<'a> {
    root: &'a TreeRoot,
    filter: &'a FileFilter,
    rules: &'a RuleSet,
    options: RunOptions,
    phase: RunPhase,
}

impl<'a> RunController<'a> {
    pub fn new(
        root: &'a TreeRoot,
        filter: &'a FileFilter,
        rules: &'a RuleSet,
        options: RunOptions,
    ) -> Self {
        RunController {
            root,
            filter,
            rules,
            options,
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!("run phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Execute the run. Only errors that stop the run as a whole are
    /// returned; per-file problems are in the report.
    pub fn run(&mut self) -> CanonResult<RunReport> {
        if self.phase != RunPhase::Idle {
            return Err(CanonError::internal(format!(
                "run controller reused in phase {}",
                self.phase
            )));
        }
        let mode = self.options.mode;
        let mut report = RunReport::new(mode);

        self.enter(RunPhase::Walking);
        let files = walk(self.root, self.filter);
        info!(
            root = %self.root.path().display(),
            files = files.len(),
            "walked tree"
        );

        self.enter(RunPhase::Rewriting);
        debug!(rules = ?self.rules.rule_names(), "rule set");
        for file in files {
            report.files_scanned += 1;
            let relative = file.location.relative();

            let result = match rewrite_file(
                &file.path,
                &file.location,
                self.rules,
                self.options.verify_idempotence,
            ) {
                Ok(result) => result,
                Err(e) => {
                    warn!("skipping {}: {}", relative, e);
                    let stage = match e {
                        CanonError::Decode { .. } => FailureStage::Decode,
                        _ => FailureStage::Read,
                    };
                    report.failures.push(FileFailure {
                        file: relative,
                        stage,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            report.unresolved.extend(result.unresolved);
            if !result.modified {
                continue;
            }

            if !result.stable {
                warn!("{}: rewrite is not idempotent, leaving file untouched", relative);
                report.unstable.push(relative);
                continue;
            }

            let mut written = false;
            if mode == RunMode::Apply {
                if let Err(e) = write_back(&file.path, &file.location, &result.new_content) {
                    warn!("{}", e);
                    report.failures.push(FileFailure {
                        file: relative,
                        stage: FailureStage::Write,
                        message: e.to_string(),
                    });
                    continue;
                }
                written = true;
                debug!(file = %relative, changes = result.records.len(), "written");
            }

            let diff = self
                .options
                .diff
                .then(|| unified_diff(&relative, &result.original, &result.new_content));
            report.files_modified += 1;
            report.total_changes += result.records.len();
            report.files.push(FileChange {
                file: relative,
                changes: result.records.len(),
                before: result.before,
                after: result.after,
                written,
                diff,
            });
            report.records.extend(result.records);
        }

        self.enter(RunPhase::Reporting);
        if let Some(path) = &self.options.export {
            match export_records(&report.records, path) {
                Ok(()) => info!("exported {} record(s) to {}", report.records.len(), path.display()),
                Err(e) => {
                    warn!("{}", e);
                    report.export_error = Some(e.to_string());
                }
            }
        }
        info!(
            scanned = report.files_scanned,
            modified = report.files_modified,
            changes = report.total_changes,
            "run complete"
        );

        report.finished_at = format_timestamp(SystemTime::now());
        self.enter(RunPhase::Done);
        Ok(report)
    }
}

/// Format a timestamp for JSON output (ISO 8601).
fn format_timestamp(time: SystemTime) -> String {
    use chrono::{DateTime, Utc};

    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Run once with a fresh controller.
pub fn execute(
    root: &TreeRoot,
    filter: &FileFilter,
    rules: &RuleSet,
    options: RunOptions,
) -> CanonResult<RunReport> {
    RunController::new(root, filter, rules, options).run()
}

// ============================================================================
// Tests
// ============================================================================
