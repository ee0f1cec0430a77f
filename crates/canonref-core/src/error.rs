//! Error types and exit-code mapping for canonref.
//!
//! `CanonError` is the single error type surfaced by the engine. Per-file
//! problems (decode failures, write failures) are carried as values inside
//! the run report instead of aborting the run; only errors that prevent the
//! run from starting are returned through `Result` at the top level.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad flags, bad config, bad glob or regex)
//! - `3`: Resolution errors (invalid tree root, file outside the root)
//! - `4`: Apply errors (failed to write changes)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable numeric codes used as process exit codes and in JSON error output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed configuration).
    InvalidArguments = 2,
    /// The tree root or a file location could not be resolved.
    ResolutionError = 3,
    /// Failed to write changes back to disk.
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum CanonError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The tree root does not exist or is not a directory.
    #[error("invalid tree root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// A file path does not lie under the tree root.
    #[error("{path} is outside tree root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// A glob or regex in the configuration failed to compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The configuration file could not be read or parsed.
    #[error("config error: {message}")]
    Config { message: String },

    /// Reading a file failed.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File content is not valid UTF-8.
    #[error("failed to decode {path} as UTF-8: {reason}")]
    Decode { path: String, reason: String },

    /// Writing a rewritten file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Exporting change records failed.
    #[error("failed to export change records to {path}: {message}")]
    Export { path: PathBuf, message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&CanonError> for OutputErrorCode {
    fn from(err: &CanonError) -> Self {
        match err {
            CanonError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            CanonError::InvalidPattern { .. } => OutputErrorCode::InvalidArguments,
            CanonError::Config { .. } => OutputErrorCode::InvalidArguments,
            CanonError::InvalidRoot { .. } => OutputErrorCode::ResolutionError,
            CanonError::OutsideRoot { .. } => OutputErrorCode::ResolutionError,
            CanonError::Read { .. } => OutputErrorCode::ResolutionError,
            CanonError::Decode { .. } => OutputErrorCode::ResolutionError,
            CanonError::Write { .. } => OutputErrorCode::ApplyError,
            CanonError::Export { .. } => OutputErrorCode::ApplyError,
            CanonError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<CanonError> for OutputErrorCode {
    fn from(err: CanonError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl CanonError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        CanonError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create an invalid root error.
    pub fn invalid_root(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CanonError::InvalidRoot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        CanonError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        CanonError::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        CanonError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }

    /// The file this error is about, when it concerns a single file.
    pub fn file(&self) -> Option<&str> {
        match self {
            CanonError::Read { path, .. }
            | CanonError::Decode { path, .. }
            | CanonError::Write { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result alias used across the engine.
pub type CanonResult<T> = Result<T, CanonError>;

// ============================================================================
// Tests
// ============================================================================
