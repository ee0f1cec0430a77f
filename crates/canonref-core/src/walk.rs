//! Tree walking: enumerate candidate files under a tree root.
//!
//! Files are selected by extension and filtered by exclusions:
//! - Hidden directories and a fixed set of build/tool directories are never
//!   entered.
//! - User exclusion globs are matched against the root-relative path with
//!   forward slashes (e.g. `**/l10n/**`, `**/*.backup`).
//!
//! Output is sorted by relative path so runs are deterministic regardless of
//! directory iteration order. When symlinks are followed, a file reachable
//! through several paths is listed once, preferring the path that does not
//! go through a link.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{CanonError, CanonResult};
use crate::location::{FileLocation, TreeRoot};

/// Directories that are never walked.
const DEFAULT_EXCLUDE_DIRS: &[&str] = &["node_modules", "build", "target", "__pycache__"];

/// Which files under the root are candidates.
#[derive(Debug)]
pub struct FileFilter {
    extensions: Vec<String>,
    exclusions: GlobSet,
    follow_symlinks: bool,
}

impl FileFilter {
    /// Build a filter. Extensions may be given with or without a leading dot;
    /// an empty list accepts every file.
    pub fn new(extensions: &[String], exclude: &[String]) -> CanonResult<Self> {
        Ok(FileFilter {
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect(),
            exclusions: build_glob_set(exclude)?,
            follow_symlinks: false,
        })
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether a root-relative file path passes the extension and glob filters.
    pub fn accepts(&self, relative: &str) -> bool {
        if self.exclusions.is_match(relative) {
            return false;
        }
        if self.extensions.is_empty() {
            return true;
        }
        Path::new(relative)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want == ext))
    }
}

/// Build a GlobSet from a list of pattern strings.
fn build_glob_set(patterns: &[String]) -> CanonResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| CanonError::invalid_pattern(pattern, e))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CanonError::invalid_pattern("<combined>", e))
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || DEFAULT_EXCLUDE_DIRS.contains(&&*name)
}

/// A file selected by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    pub path: PathBuf,
    pub location: FileLocation,
}

/// Enumerate candidate files under `root`, sorted by relative path.
///
/// Entries that cannot be read (permission errors, broken links) are logged
/// and skipped.
pub fn walk(root: &TreeRoot, filter: &FileFilter) -> Vec<WalkedFile> {
    // (physical path, reached through a link, file)
    let mut candidates: Vec<(PathBuf, bool, WalkedFile)> = Vec::new();

    for entry in WalkDir::new(root.path())
        .follow_links(filter.follow_symlinks)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let location = match FileLocation::new(root, entry.path()) {
            Ok(location) => location,
            Err(e) => {
                warn!("skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let relative = location.relative();
        if !filter.accepts(&relative) {
            debug!(file = %relative, "filtered out");
            continue;
        }

        let path = entry.into_path();
        let physical = if filter.follow_symlinks {
            fs::canonicalize(&path).unwrap_or_else(|_| path.clone())
        } else {
            path.clone()
        };
        let via_link = physical != path;
        candidates.push((physical, via_link, WalkedFile { path, location }));
    }

    candidates.sort_by(|a, b| {
        (&a.0, a.1, a.2.location.relative()).cmp(&(&b.0, b.1, b.2.location.relative()))
    });
    let mut files: Vec<WalkedFile> = Vec::with_capacity(candidates.len());
    let mut last: Option<PathBuf> = None;
    for (physical, _, file) in candidates {
        if last.as_ref() == Some(&physical) {
            debug!(file = %file.location.relative(), "already listed through another path");
            continue;
        }
        last = Some(physical);
        files.push(file);
    }

    files.sort_by(|a, b| a.location.relative().cmp(&b.location.relative()));
    debug!(
        files = files.len(),
        extensions = ?filter.extensions(),
        "walk complete"
    );
    files
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn relatives(files: &[WalkedFile]) -> Vec<String> {
        files.iter().map(|f| f.location.relative()).collect()
    }

    fn dart() -> Vec<String> {
        vec!["dart".to_string()]
    }

    #[test]
    fn selects_by_extension_in_sorted_order() {
        let temp = TempDir::new().unwrap();
        for rel in ["z.dart", "a/b.dart", "a/notes.txt", "m/n/o.dart"] {
            touch(temp.path(), rel);
        }
        let root = TreeRoot::open(temp.path()).unwrap();
        let filter = FileFilter::new(&dart(), &[]).unwrap();

        let files = walk(&root, &filter);
        assert_eq!(relatives(&files), vec!["a/b.dart", "m/n/o.dart", "z.dart"]);
        assert!(files.iter().all(|f| f.path.is_absolute()));
    }

    #[test]
    fn skips_hidden_and_tool_directories() {
        let temp = TempDir::new().unwrap();
        for rel in [".dart_tool/x.dart", "build/y.dart", ".git/z.dart", "src/keep.dart"] {
            touch(temp.path(), rel);
        }
        let root = TreeRoot::open(temp.path()).unwrap();
        let filter = FileFilter::new(&dart(), &[]).unwrap();

        assert_eq!(relatives(&walk(&root, &filter)), vec!["src/keep.dart"]);
    }

    #[test]
    fn user_globs_exclude_files() {
        let temp = TempDir::new().unwrap();
        for rel in ["plugins/chat/l10n/chat.dart", "plugins/chat/view.dart", "old.dart.backup"] {
            touch(temp.path(), rel);
        }
        let root = TreeRoot::open(temp.path()).unwrap();
        let filter = FileFilter::new(&[], &["**/l10n/**".to_string(), "**/*.backup".to_string()])
            .unwrap();

        assert_eq!(relatives(&walk(&root, &filter)), vec!["plugins/chat/view.dart"]);
    }

    #[test]
    fn extension_with_leading_dot() {
        let filter = FileFilter::new(&[".dart".to_string()], &[]).unwrap();
        assert!(filter.accepts("a/b.dart"));
        assert!(!filter.accepts("a/b.darts"));
        assert!(!filter.accepts("Makefile"));
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let err = FileFilter::new(&[], &["[".to_string()]).unwrap_err();
        assert!(matches!(err, CanonError::InvalidPattern { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn linked_file_is_listed_once() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/b/real.dart");
        std::os::unix::fs::symlink(
            temp.path().join("a/b/real.dart"),
            temp.path().join("a/b/link.dart"),
        )
        .unwrap();
        let root = TreeRoot::open(temp.path()).unwrap();

        let following = FileFilter::new(&dart(), &[]).unwrap().follow_symlinks(true);
        assert_eq!(relatives(&walk(&root, &following)), vec!["a/b/real.dart"]);

        let not_following = FileFilter::new(&dart(), &[]).unwrap();
        assert_eq!(relatives(&walk(&root, &not_following)), vec!["a/b/real.dart"]);
    }

    #[cfg(unix)]
    #[test]
    fn linked_directory_is_walked_once() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "shared/util.dart");
        std::os::unix::fs::symlink(temp.path().join("shared"), temp.path().join("alias"))
            .unwrap();
        let root = TreeRoot::open(temp.path()).unwrap();

        let filter = FileFilter::new(&dart(), &[]).unwrap().follow_symlinks(true);
        assert_eq!(relatives(&walk(&root, &filter)), vec!["shared/util.dart"]);
    }

    #[test]
    fn hidden_root_is_still_walked() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), ".hidden/a.dart");
        let root = TreeRoot::open(temp.path().join(".hidden")).unwrap();
        let filter = FileFilter::new(&dart(), &[]).unwrap();
        assert_eq!(relatives(&walk(&root, &filter)), vec!["a.dart"]);
    }
}
