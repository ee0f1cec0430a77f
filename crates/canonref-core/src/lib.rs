//! Core engine for canonref.
//!
//! This crate rewrites relative references in a source tree into canonical,
//! namespace-qualified references:
//! - Path resolution of `../` references against a file's location
//! - Rule sets: relative imports, regex patterns, ensured lines
//! - File rewriting with change records and idempotence checks
//! - Tree walking with extension and glob filters
//! - Run control for dry-run and apply modes, with record export
//! - JSON output types for CLI responses

pub mod config;
pub mod diff;
pub mod error;
pub mod location;
pub mod output;
pub mod record;
pub mod resolve;
pub mod rewrite;
pub mod rules;
pub mod run;
pub mod text;
pub mod walk;

pub use error::{CanonError, CanonResult, OutputErrorCode};
pub use location::{FileLocation, TreeRoot};
pub use resolve::{resolve, CanonicalRef, Namespace, ResolveError};
pub use rules::{Rule, RuleSet};
pub use run::{execute, RunController, RunMode, RunOptions, RunReport};
