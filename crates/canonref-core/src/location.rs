//! Tree root and file locations.
//!
//! A [`TreeRoot`] is the canonicalized directory every processed file must
//! live under. A [`FileLocation`] is a file's position relative to that root:
//! the directory segments between root and file, plus the filename. Paths
//! are always rendered with forward slashes so output is identical across
//! platforms.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CanonError, CanonResult};

// ============================================================================
// Tree Root
// ============================================================================

/// Canonical absolute directory that anchors resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRoot {
    path: PathBuf,
    name: String,
}

impl TreeRoot {
    /// Open a tree root, canonicalizing the path.
    ///
    /// Fails if the path does not exist or is not a directory. This is the
    /// only check that aborts a run, and it happens before any file is read.
    pub fn open(path: impl AsRef<Path>) -> CanonResult<Self> {
        let path = path.as_ref();
        let canonical = path
            .canonicalize()
            .map_err(|e| CanonError::invalid_root(path, e.to_string()))?;
        if !canonical.is_dir() {
            return Err(CanonError::invalid_root(path, "not a directory"));
        }
        let name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(TreeRoot {
            path: canonical,
            name,
        })
    }

    /// Absolute path of the root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component of the root (e.g. `lib`). Empty for `/`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of a location under this root.
    pub fn join(&self, location: &FileLocation) -> PathBuf {
        let mut path = self.path.clone();
        for dir in location.dirs() {
            path.push(dir);
        }
        path.push(location.file_name());
        path
    }
}

// ============================================================================
// File Location
// ============================================================================

/// A file's position relative to the tree root.
///
/// `dirs` excludes the filename; a file directly under the root has no
/// directory segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileLocation {
    dirs: Vec<String>,
    file_name: String,
}

impl FileLocation {
    /// Build a location for `path`, which may be absolute or root-relative.
    ///
    /// Returns `OutsideRoot` for any path that escapes the root, including
    /// relative paths that use `..`.
    pub fn new(root: &TreeRoot, path: &Path) -> CanonResult<Self> {
        let outside = || CanonError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.path().to_path_buf(),
        };

        let relative = if path.is_absolute() {
            match path.strip_prefix(root.path()) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => {
                    // The walker yields canonical paths, but callers may pass a
                    // symlinked spelling of the same directory.
                    let canonical = path.canonicalize().map_err(|_| outside())?;
                    canonical
                        .strip_prefix(root.path())
                        .map_err(|_| outside())?
                        .to_path_buf()
                }
            }
        } else {
            path.to_path_buf()
        };

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(outside()),
            }
        }

        let file_name = segments.pop().ok_or_else(outside)?;
        Ok(FileLocation {
            dirs: segments,
            file_name,
        })
    }

    /// Build a location from a forward-slash relative path such as
    /// `plugins/foo/bar.dart`.
    pub fn from_relative(relative: &str) -> CanonResult<Self> {
        let mut segments = Vec::new();
        for segment in relative.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(CanonError::invalid_args(format!(
                        "relative location '{}' escapes the tree root",
                        relative
                    )))
                }
                s => segments.push(s.to_string()),
            }
        }
        let file_name = segments.pop().ok_or_else(|| {
            CanonError::invalid_args(format!("relative location '{}' has no file name", relative))
        })?;
        Ok(FileLocation {
            dirs: segments,
            file_name,
        })
    }

    /// Directory segments between the root and the file.
    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Number of directory segments.
    pub fn dir_depth(&self) -> usize {
        self.dirs.len()
    }

    /// Root-relative path with forward slashes.
    pub fn relative(&self) -> String {
        if self.dirs.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.dirs.join("/"), self.file_name)
        }
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative())
    }
}

// ============================================================================
// Tests
// ============================================================================
