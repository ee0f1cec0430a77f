//! Single-file rewriting.
//!
//! [`rewrite_file`] reads a file, applies a rule set, and reports what would
//! change. It never writes. [`write_back`] is the only function in the crate
//! that modifies a source file, and the run controller calls it only in
//! apply mode for files whose content actually changed.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CanonError, CanonResult};
use crate::location::FileLocation;
use crate::record::{ChangeRecord, UnresolvedRef};
use crate::rules::RuleSet;

// ============================================================================
// Content Hash
// ============================================================================

/// SHA-256 of file content, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Rewrite Result
// ============================================================================

/// Outcome of rewriting one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub location: FileLocation,
    /// `true` exactly when `new_content` differs from `original`.
    pub modified: bool,
    pub original: String,
    pub new_content: String,
    pub records: Vec<ChangeRecord>,
    pub unresolved: Vec<UnresolvedRef>,
    pub before: ContentHash,
    pub after: ContentHash,
    /// `false` when applying the rule set to `new_content` changes it again.
    pub stable: bool,
}

/// Apply `rules` to `original` without touching the filesystem.
pub fn rewrite_content(
    original: &str,
    location: &FileLocation,
    rules: &RuleSet,
    verify_idempotence: bool,
) -> RewriteResult {
    let output = rules.apply(original, location);
    let modified = output.content != original;

    let stable = if modified && verify_idempotence {
        rules.apply(&output.content, location).content == output.content
    } else {
        true
    };

    RewriteResult {
        location: location.clone(),
        modified,
        before: ContentHash::compute(original.as_bytes()),
        after: ContentHash::compute(output.content.as_bytes()),
        original: original.to_string(),
        new_content: output.content,
        records: output.records,
        unresolved: output.unresolved,
        stable,
    }
}

/// Read `path` as UTF-8 and rewrite its content.
pub fn rewrite_file(
    path: &Path,
    location: &FileLocation,
    rules: &RuleSet,
    verify_idempotence: bool,
) -> CanonResult<RewriteResult> {
    let bytes = fs::read(path).map_err(|source| CanonError::Read {
        path: location.relative(),
        source,
    })?;
    let original = String::from_utf8(bytes).map_err(|e| CanonError::Decode {
        path: location.relative(),
        reason: e.utf8_error().to_string(),
    })?;
    Ok(rewrite_content(&original, location, rules, verify_idempotence))
}

/// Replace the file at `path` with `content`.
///
/// Writes a sibling temp file and renames it over the target, so a reader
/// never sees a half-written file. A symlink is resolved first and its
/// target is replaced; the link itself stays a link.
pub fn write_back(path: &Path, location: &FileLocation, content: &str) -> CanonResult<()> {
    write_through_links(path, content.as_bytes()).map_err(|source| CanonError::Write {
        path: location.relative(),
        source,
    })
}

fn write_through_links(path: &Path, content: &[u8]) -> io::Result<()> {
    let is_link = fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());
    if is_link {
        atomic_write(&fs::canonicalize(path)?, content)
    } else {
        atomic_write(path, content)
    }
}

fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let pid = std::process::id();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        pid,
        timestamp
    ));
    fs::write(&temp_path, content)?;

    // Keep the original file's mode bits.
    let permissions = match fs::metadata(path) {
        Ok(metadata) => fs::set_permissions(&temp_path, metadata.permissions()),
        Err(_) => Ok(()),
    };
    let result = permissions.and_then(|_| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

// ============================================================================
// Tests
// ============================================================================
