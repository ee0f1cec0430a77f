//! Configuration handling for canonref
//!
//! Settings come from a `canonref.toml` file; the CLI overrides individual
//! fields. A relative `root` in a config file is resolved against the
//! directory containing that file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CanonError, CanonResult};
use crate::location::TreeRoot;
use crate::resolve::Namespace;
use crate::rules::{ContextSpec, EnsureLineRule, PatternRule, RelativeImportRule, RuleSet, Scope};
use crate::walk::FileFilter;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "canonref.toml";

/// canonref configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tree root to rewrite
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// File extensions to process, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Namespace prefix for canonical references
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Leading segment dropped from references that land at the root.
    /// Defaults to the root directory's name.
    #[serde(default)]
    pub root_marker: Option<String>,

    /// Glob patterns (root-relative) for files to skip
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Include the built-in relative import rule
    #[serde(default = "default_true")]
    pub relative_imports: bool,

    /// Re-apply rules to rewritten content and refuse to write unstable files
    #[serde(default = "default_true")]
    pub verify_idempotence: bool,

    #[serde(default)]
    pub follow_symlinks: bool,

    /// Context key derivation for location-sensitive rules
    #[serde(default)]
    pub context: ContextSpec,

    /// Additional rules, applied after the relative import rule
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

/// A configured rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    /// Regex replacement
    Pattern {
        name: String,
        pattern: String,
        #[serde(default)]
        replacement: String,
        #[serde(default)]
        scope: Scope,
        #[serde(default)]
        note: Option<String>,
    },
    /// Insert a line when a trigger matches and the line is missing
    EnsureLine {
        name: String,
        trigger: String,
        line: String,
        #[serde(default)]
        anchor: Option<String>,
    },
}

fn default_root() -> PathBuf {
    PathBuf::from("lib")
}

fn default_extensions() -> Vec<String> {
    vec!["dart".to_string()]
}

fn default_prefix() -> String {
    "package:app".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            extensions: default_extensions(),
            prefix: default_prefix(),
            root_marker: None,
            exclude: Vec::new(),
            relative_imports: true,
            verify_idempotence: true,
            follow_symlinks: false,
            context: ContextSpec::default(),
            rules: Vec::new(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CanonResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CanonError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::parse(&content)?;
        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> CanonResult<Self> {
        toml::from_str(content)
            .map_err(|e| CanonError::config(format!("failed to parse config: {}", e)))
    }

    /// Load `canonref.toml` from `dir`, or defaults if there is none
    pub fn load_from_dir(dir: &Path) -> CanonResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Config {
                base_dir: dir.to_path_buf(),
                ..Config::default()
            })
        }
    }

    /// Override the tree root. Relative paths stay relative to the process
    /// working directory.
    pub fn set_root(&mut self, root: PathBuf) {
        self.root = root;
        self.base_dir = PathBuf::from(".");
    }

    /// The root path, resolved against the config file's directory
    pub fn root_path(&self) -> PathBuf {
        if self.root.is_absolute() {
            self.root.clone()
        } else {
            self.base_dir.join(&self.root)
        }
    }

    pub fn open_root(&self) -> CanonResult<TreeRoot> {
        TreeRoot::open(self.root_path())
    }

    /// The namespace references resolve into. The prefix must not be empty.
    pub fn namespace(&self, root: &TreeRoot) -> CanonResult<Namespace> {
        if self.prefix.trim_end_matches('/').is_empty() {
            return Err(CanonError::config("prefix must not be empty"));
        }
        let marker = self
            .root_marker
            .clone()
            .unwrap_or_else(|| root.name().to_string());
        Ok(Namespace::new(self.prefix.clone()).with_root_marker(marker))
    }

    pub fn file_filter(&self) -> CanonResult<FileFilter> {
        Ok(FileFilter::new(&self.extensions, &self.exclude)?.follow_symlinks(self.follow_symlinks))
    }

    /// Compile the configured rules into a rule set.
    pub fn rule_set(&self, root: &TreeRoot) -> CanonResult<RuleSet> {
        let mut set = RuleSet::new(self.namespace(root)?).with_context(self.context.clone());
        if self.relative_imports {
            set.push(RelativeImportRule::new());
        }
        for rule in &self.rules {
            match rule {
                RuleConfig::Pattern {
                    name,
                    pattern,
                    replacement,
                    scope,
                    note,
                } => {
                    let mut compiled =
                        PatternRule::new(name.clone(), pattern, replacement.clone())?
                            .with_scope(*scope);
                    if let Some(note) = note {
                        compiled = compiled.with_note(note.clone());
                    }
                    set.push(compiled);
                }
                RuleConfig::EnsureLine {
                    name,
                    trigger,
                    line,
                    anchor,
                } => {
                    let mut compiled = EnsureLineRule::new(name.clone(), trigger, line.clone())?;
                    if let Some(anchor) = anchor {
                        compiled = compiled.with_anchor(anchor)?;
                    }
                    set.push(compiled);
                }
            }
        }
        Ok(set)
    }
}
