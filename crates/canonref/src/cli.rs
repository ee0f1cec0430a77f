//! Command helpers for the canonref binary.
//!
//! Builds the effective configuration (config file plus flag overrides),
//! drives the engine, and renders the human-readable summary. JSON output
//! goes through the response types in `canonref_core::output`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use canonref_core::config::Config;
use canonref_core::error::{CanonError, CanonResult};
use canonref_core::location::FileLocation;
use canonref_core::output::ResolveResponse;
use canonref_core::resolve::resolve;
use canonref_core::run::{execute, FailureStage, RunMode, RunOptions, RunReport};

/// Default number of change records listed in the text summary.
pub const DEFAULT_MAX_SAMPLES: usize = 20;

// ============================================================================
// Configuration
// ============================================================================

/// Command-line values that override the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    /// Replaces the configured extensions when non-empty.
    pub extensions: Vec<String>,
    pub prefix: Option<String>,
    pub root_marker: Option<String>,
    /// Added to the configured exclusions.
    pub exclude: Vec<String>,
    pub no_relative_imports: bool,
    pub no_verify: bool,
}

/// Load `path`, or `canonref.toml` from the working directory, and apply
/// `overrides`.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> CanonResult<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => {
            let cwd = std::env::current_dir().map_err(|e| {
                CanonError::internal(format!("cannot determine working directory: {}", e))
            })?;
            Config::load_from_dir(&cwd)?
        }
    };

    if let Some(root) = overrides.root {
        config.set_root(root);
    }
    if !overrides.extensions.is_empty() {
        config.extensions = overrides.extensions;
    }
    if let Some(prefix) = overrides.prefix {
        config.prefix = prefix;
    }
    if overrides.root_marker.is_some() {
        config.root_marker = overrides.root_marker;
    }
    config.exclude.extend(overrides.exclude);
    if overrides.no_relative_imports {
        config.relative_imports = false;
    }
    if overrides.no_verify {
        config.verify_idempotence = false;
    }

    debug!(root = %config.root_path().display(), "configuration loaded");
    Ok(config)
}

// ============================================================================
// Operations
// ============================================================================

/// Walk, rewrite and (in apply mode) write back the configured tree.
pub fn run_tree(
    config: &Config,
    mode: RunMode,
    export: Option<PathBuf>,
    diff: bool,
) -> CanonResult<RunReport> {
    let root = config.open_root()?;
    let filter = config.file_filter()?;
    let rules = config.rule_set(&root)?;
    if rules.is_empty() {
        return Err(CanonError::invalid_args(
            "no rules enabled: relative imports are off and no rules are configured",
        ));
    }

    let options = RunOptions {
        mode,
        verify_idempotence: config.verify_idempotence,
        export,
        diff,
    };
    execute(&root, &filter, &rules, options)
}

/// Resolve one reference as if written in the file at `file`.
pub fn resolve_reference(
    config: &Config,
    file: &str,
    reference: &str,
) -> CanonResult<ResolveResponse> {
    let root = config.open_root()?;
    let location = FileLocation::from_relative(file)?;
    let namespace = config.namespace(&root)?;
    let result = resolve(&location, reference, &namespace).map(|c| c.to_string());
    Ok(ResolveResponse::new(location.relative(), reference, result))
}

/// Whether any write failed during an apply run.
pub fn has_write_failures(report: &RunReport) -> bool {
    report
        .failures
        .iter()
        .any(|f| f.stage == FailureStage::Write)
}

// ============================================================================
// Text Output
// ============================================================================

fn stage_name(stage: FailureStage) -> &'static str {
    match stage {
        FailureStage::Read => "read",
        FailureStage::Decode => "decode",
        FailureStage::Write => "write",
    }
}

/// Render the human-readable run summary.
///
/// Lists at most `max_samples` change records, then a count of the rest.
pub fn render_summary(
    report: &RunReport,
    max_samples: usize,
    out: &mut impl Write,
) -> io::Result<()> {
    match report.mode {
        RunMode::DryRun => writeln!(out, "Dry run: no files were written")?,
        RunMode::Apply => writeln!(out, "Applied changes")?,
    }
    writeln!(out, "  Files scanned:  {}", report.files_scanned)?;
    writeln!(out, "  Files modified: {}", report.files_modified)?;
    writeln!(out, "  Total changes:  {}", report.total_changes)?;

    if !report.records.is_empty() {
        writeln!(out)?;
        writeln!(out, "Changes:")?;
        for record in report.records.iter().take(max_samples) {
            writeln!(
                out,
                "  {}:{}:{}: {:?} -> {:?}",
                record.file, record.line, record.column, record.original, record.replacement
            )?;
        }
        if report.records.len() > max_samples {
            writeln!(out, "  ... and {} more", report.records.len() - max_samples)?;
        }
    }

    if !report.unresolved.is_empty() {
        writeln!(out)?;
        writeln!(out, "Unresolved references: {}", report.unresolved.len())?;
        for unresolved in report.unresolved.iter().take(max_samples) {
            writeln!(
                out,
                "  {}:{}:{}: {} ({})",
                unresolved.file,
                unresolved.line,
                unresolved.column,
                unresolved.reference,
                unresolved.reason
            )?;
        }
        if report.unresolved.len() > max_samples {
            writeln!(out, "  ... and {} more", report.unresolved.len() - max_samples)?;
        }
    }

    if !report.unstable.is_empty() {
        writeln!(out)?;
        writeln!(out, "Unstable files (left untouched):")?;
        for file in &report.unstable {
            writeln!(out, "  {}", file)?;
        }
    }

    if !report.failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failures:")?;
        for failure in &report.failures {
            writeln!(
                out,
                "  {} [{}]: {}",
                failure.file,
                stage_name(failure.stage),
                failure.message
            )?;
        }
    }

    if let Some(error) = &report.export_error {
        writeln!(out)?;
        writeln!(out, "Export failed: {}", error)?;
    }

    let diffs: Vec<&str> = report
        .files
        .iter()
        .filter_map(|f| f.diff.as_deref())
        .collect();
    if !diffs.is_empty() {
        writeln!(out)?;
        for diff in diffs {
            write!(out, "{}", diff)?;
        }
    }

    Ok(())
}

/// Render a resolve result as one line.
pub fn render_resolve(response: &ResolveResponse, out: &mut impl Write) -> io::Result<()> {
    match (&response.canonical, &response.unresolved) {
        (Some(canonical), _) => writeln!(out, "{}", canonical),
        (None, Some(reason)) => writeln!(out, "unresolved: {}", reason),
        (None, None) => writeln!(out, "unresolved"),
    }
}

// ============================================================================
// Tests
// ============================================================================
