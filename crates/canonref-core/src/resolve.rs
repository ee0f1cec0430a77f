//! Path resolution: relative references to canonical references.
//!
//! Resolution is stack based. The stack starts as the referencing file's
//! directory segments; each leading `../` pops one segment, and the
//! remainder's segments are pushed. Popping an empty stack means the
//! reference points above the tree root and is unresolvable.
//!
//! Everything in this module is pure: no I/O, no global state.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::FileLocation;

/// A reference that starts with one or more go-up markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeRef<'a> {
    /// Number of leading `../` markers.
    pub ups: usize,
    /// Everything after the markers.
    pub remainder: &'a str,
}

impl<'a> RelativeRef<'a> {
    /// Split a reference into go-up markers and remainder.
    ///
    /// Returns `None` when the reference has no leading marker; such
    /// references are never rewrite candidates.
    pub fn parse(reference: &'a str) -> Option<Self> {
        let mut ups = 0;
        let mut rest = reference;
        loop {
            if let Some(next) = rest.strip_prefix("../") {
                ups += 1;
                rest = next;
            } else if rest == ".." {
                ups += 1;
                rest = "";
                break;
            } else {
                break;
            }
        }
        (ups > 0).then_some(RelativeRef {
            ups,
            remainder: rest,
        })
    }
}

/// Namespace that canonical references are joined onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Prefix such as `package:app`.
    pub prefix: String,
    /// Leading remainder segment that names the root directory itself and is
    /// dropped when the reference lands back at the root (`lib` for `lib/`).
    pub root_marker: Option<String>,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Namespace {
            prefix: prefix.into().trim_end_matches('/').to_string(),
            root_marker: None,
        }
    }

    pub fn with_root_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        self.root_marker = (!marker.is_empty()).then_some(marker);
        self
    }

    fn join(&self, segments: &[&str]) -> CanonicalRef {
        if segments.is_empty() {
            CanonicalRef(self.prefix.clone())
        } else {
            CanonicalRef(format!("{}/{}", self.prefix, segments.join("/")))
        }
    }
}

/// A namespace-prefixed, root-relative reference. Never contains `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalRef(String);

impl CanonicalRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a reference was not resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ResolveError {
    /// The reference has no leading `../` and is not a candidate.
    #[error("reference is not relative")]
    NotRelative,

    /// The reference climbs past the tree root.
    #[error("reference climbs {ups} level(s) from a file {depth} directory level(s) deep")]
    AboveRoot { ups: usize, depth: usize },
}

/// Resolve `reference`, written in the file at `location`, to a canonical
/// reference under `namespace`.
pub fn resolve(
    location: &FileLocation,
    reference: &str,
    namespace: &Namespace,
) -> Result<CanonicalRef, ResolveError> {
    let parsed = RelativeRef::parse(reference).ok_or(ResolveError::NotRelative)?;
    let depth = location.dir_depth();
    let above_root = || ResolveError::AboveRoot {
        ups: parsed.ups,
        depth,
    };

    let mut stack: Vec<&str> = location.dirs().iter().map(String::as_str).collect();
    for _ in 0..parsed.ups {
        stack.pop().ok_or_else(above_root)?;
    }

    let mut segments: Vec<&str> = parsed
        .remainder
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if stack.is_empty() && segments.len() > 1 {
        if let Some(marker) = namespace.root_marker.as_deref() {
            if segments[0] == marker {
                segments.remove(0);
            }
        }
    }

    for segment in segments {
        if segment == ".." {
            stack.pop().ok_or_else(above_root)?;
        } else {
            stack.push(segment);
        }
    }

    Ok(namespace.join(&stack))
}

// ============================================================================
// Tests
// ============================================================================
