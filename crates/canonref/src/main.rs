//! Binary entry point for the canonref CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Preview rewrites under lib/ (dry run, the default)
//! canonref run --root lib --prefix package:app
//!
//! # Write changes and export a change log
//! canonref run --apply --export changes.csv
//!
//! # Fail CI when relative references remain
//! canonref check --format json
//!
//! # Resolve a single reference
//! canonref resolve --file plugins/chat/view.dart --reference ../../core/db.dart
//! ```
//!
//! JSON responses and errors go to stdout; logs go to stderr.

mod cli;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use canonref_core::error::{CanonError, OutputErrorCode};
use canonref_core::output::{emit_response, ErrorResponse, RunResponse};
use canonref_core::run::{RunMode, RunReport};

use crate::cli::{
    has_write_failures, load_config, render_resolve, render_summary, resolve_reference, run_tree,
    Overrides, DEFAULT_MAX_SAMPLES,
};

/// Exit code for `check` when changes are pending.
const CHECK_FAILED: u8 = 1;

// ============================================================================
// CLI Structure
// ============================================================================

/// Rewrite relative cross-file references into canonical package references.
#[derive(Parser, Debug)]
#[command(
    name = "canonref",
    version,
    about = "Rewrite relative references into canonical package references"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Configuration file (default: canonref.toml in the working directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

/// Which files to process and how to resolve them.
#[derive(Args, Debug)]
struct SelectionArgs {
    /// Tree root (overrides the config file).
    #[arg(long)]
    root: Option<PathBuf>,

    /// File extension to process; repeatable.
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Namespace prefix for canonical references, e.g. `package:app`.
    #[arg(long)]
    prefix: Option<String>,

    /// Leading segment dropped from references that land at the root.
    #[arg(long)]
    root_marker: Option<String>,

    /// Root-relative glob of files to skip; repeatable.
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Disable the built-in relative import rule.
    #[arg(long)]
    no_relative_imports: bool,

    /// Skip the idempotence check on rewritten content.
    #[arg(long)]
    no_verify: bool,
}

impl SelectionArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            root: self.root,
            extensions: self.extensions,
            prefix: self.prefix,
            root_marker: self.root_marker,
            exclude: self.exclude,
            no_relative_imports: self.no_relative_imports,
            no_verify: self.no_verify,
        }
    }
}

/// How to report a run.
#[derive(Args, Debug)]
struct ReportArgs {
    /// Export change records (`.csv`, or `.jsonl` for JSON Lines).
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Include a unified diff for each modified file.
    #[arg(long)]
    diff: bool,

    /// Change records listed in the text summary.
    #[arg(long, default_value_t = DEFAULT_MAX_SAMPLES)]
    max_samples: usize,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite the tree (dry run unless `--apply` is given).
    Run {
        #[command(flatten)]
        selection: SelectionArgs,
        #[command(flatten)]
        report: ReportArgs,
        /// Write changes to disk.
        #[arg(long)]
        apply: bool,
    },
    /// Dry run that exits with code 1 when any file would change.
    Check {
        #[command(flatten)]
        selection: SelectionArgs,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Resolve one reference against a file location.
    Resolve {
        /// Root-relative path of the referring file.
        #[arg(long)]
        file: String,
        /// The relative reference, e.g. `../../core/db.dart`.
        #[arg(long)]
        reference: String,
        /// Tree root (overrides the config file).
        #[arg(long)]
        root: Option<PathBuf>,
        /// Namespace prefix.
        #[arg(long)]
        prefix: Option<String>,
        /// Leading segment dropped from references that land at the root.
        #[arg(long)]
        root_marker: Option<String>,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_json);

    match execute(cli) {
        Ok(code) => code,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::new(&err);

            // Errors go to stdout as JSON so callers parse a single stream.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<ExitCode, CanonError> {
    let config_path = cli.global.config;
    match cli.command {
        Command::Run {
            selection,
            report,
            apply,
        } => {
            let mode = if apply { RunMode::Apply } else { RunMode::DryRun };
            execute_run(config_path, selection, report, mode)
        }
        Command::Check { selection, report } => {
            execute_check(config_path, selection, report)
        }
        Command::Resolve {
            file,
            reference,
            root,
            prefix,
            root_marker,
            format,
        } => {
            let overrides = Overrides {
                root,
                prefix,
                root_marker,
                ..Overrides::default()
            };
            execute_resolve(config_path, overrides, &file, &reference, format)
        }
    }
}

// ============================================================================
// Command Executors
// ============================================================================

fn execute_run(
    config_path: Option<PathBuf>,
    selection: SelectionArgs,
    args: ReportArgs,
    mode: RunMode,
) -> Result<ExitCode, CanonError> {
    let report = run_with(config_path, selection, &args, mode)?;

    if mode == RunMode::Apply && has_write_failures(&report) {
        return Ok(ExitCode::from(OutputErrorCode::ApplyError.code()));
    }
    Ok(ExitCode::SUCCESS)
}

fn execute_check(
    config_path: Option<PathBuf>,
    selection: SelectionArgs,
    args: ReportArgs,
) -> Result<ExitCode, CanonError> {
    let report = run_with(config_path, selection, &args, RunMode::DryRun)?;

    if report.has_changes() {
        Ok(ExitCode::from(CHECK_FAILED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Run the engine and print the report in the requested format.
fn run_with(
    config_path: Option<PathBuf>,
    selection: SelectionArgs,
    args: &ReportArgs,
    mode: RunMode,
) -> Result<RunReport, CanonError> {
    let config = load_config(config_path.as_deref(), selection.into_overrides())?;
    let report = run_tree(&config, mode, args.export.clone(), args.diff)?;

    let mut stdout = io::stdout();
    let written = match args.format {
        OutputFormat::Json => {
            let export_path = args.export.as_ref().map(|p| p.display().to_string());
            emit_response(&RunResponse::new(report.clone(), export_path), &mut stdout)
        }
        OutputFormat::Text => render_summary(&report, args.max_samples, &mut stdout),
    };
    written.map_err(|e| CanonError::internal(format!("failed to write output: {}", e)))?;

    Ok(report)
}

fn execute_resolve(
    config_path: Option<PathBuf>,
    overrides: Overrides,
    file: &str,
    reference: &str,
    format: OutputFormat,
) -> Result<ExitCode, CanonError> {
    let config = load_config(config_path.as_deref(), overrides)?;
    let response = resolve_reference(&config, file, reference)?;

    let mut stdout = io::stdout();
    let written = match format {
        OutputFormat::Json => emit_response(&response, &mut stdout),
        OutputFormat::Text => render_resolve(&response, &mut stdout),
    };
    written.map_err(|e| CanonError::internal(format!("failed to write output: {}", e)))?;

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn run_defaults_to_dry_run_text() {
            let cli = Cli::try_parse_from(["canonref", "run"]).unwrap();
            match cli.command {
                Command::Run {
                    selection,
                    report,
                    apply,
                } => {
                    assert!(!apply);
                    assert!(selection.root.is_none());
                    assert!(selection.extensions.is_empty());
                    assert_eq!(report.format, OutputFormat::Text);
                    assert_eq!(report.max_samples, DEFAULT_MAX_SAMPLES);
                    assert!(!report.diff);
                }
                _ => panic!("expected Run"),
            }
            assert!(matches!(cli.global.log_level, LogLevel::Warn));
        }

        #[test]
        fn run_with_all_flags() {
            let args = [
                "canonref",
                "run",
                "--root",
                "lib",
                "--ext",
                "dart",
                "--ext",
                "ts",
                "--prefix",
                "package:Memento",
                "--apply",
                "--export",
                "out.csv",
                "--exclude",
                "**/l10n/**",
                "--diff",
                "--max-samples",
                "5",
                "--no-relative-imports",
                "--format",
                "json",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Command::Run {
                    selection,
                    report,
                    apply,
                } => {
                    assert!(apply);
                    assert_eq!(selection.root, Some(PathBuf::from("lib")));
                    assert_eq!(selection.extensions, vec!["dart", "ts"]);
                    assert_eq!(selection.prefix.as_deref(), Some("package:Memento"));
                    assert_eq!(selection.exclude, vec!["**/l10n/**"]);
                    assert!(selection.no_relative_imports);
                    assert_eq!(report.export, Some(PathBuf::from("out.csv")));
                    assert_eq!(report.max_samples, 5);
                    assert_eq!(report.format, OutputFormat::Json);
                    assert!(report.diff);
                }
                _ => panic!("expected Run"),
            }
        }

        #[test]
        fn check_rejects_apply() {
            assert!(Cli::try_parse_from(["canonref", "check", "--apply"]).is_err());
        }

        #[test]
        fn global_flags_after_subcommand() {
            let args = [
                "canonref",
                "check",
                "--config",
                "ci.toml",
                "--log-level",
                "debug",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            assert_eq!(cli.global.config, Some(PathBuf::from("ci.toml")));
            assert!(matches!(cli.global.log_level, LogLevel::Debug));
            assert!(matches!(cli.command, Command::Check { .. }));
        }

        #[test]
        fn resolve_requires_file_and_reference() {
            assert!(Cli::try_parse_from(["canonref", "resolve", "--file", "a.dart"]).is_err());

            let args = [
                "canonref",
                "resolve",
                "--file",
                "a/b/c.dart",
                "--reference",
                "../../x/y.dart",
            ];
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Command::Resolve {
                    file, reference, ..
                } => {
                    assert_eq!(file, "a/b/c.dart");
                    assert_eq!(reference, "../../x/y.dart");
                }
                _ => panic!("expected Resolve"),
            }
        }

        #[test]
        fn invalid_format_rejected() {
            assert!(Cli::try_parse_from(["canonref", "run", "--format", "yaml"]).is_err());
        }
    }
}
