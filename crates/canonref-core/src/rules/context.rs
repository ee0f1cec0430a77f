//! Context key derivation from a file's location.
//!
//! Some rewrites depend on where a file lives, for example a translation
//! key prefix that is the name of the plugin directory containing the file.
//! A [`ContextSpec`] describes how to derive that key. Derivation is total:
//! every location gets a key, falling back to `default`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::location::FileLocation;

/// Default key when nothing more specific applies.
pub const DEFAULT_CONTEXT_KEY: &str = "app";

/// How to derive a context key from a file location.
///
/// Checked in order:
/// 1. The directory segment right after the first `anchor` directory,
///    mapped through `aliases` when present.
/// 2. The first `classes` entry whose directory name appears anywhere in
///    the file's directory segments.
/// 3. `default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSpec {
    pub anchor: Option<String>,
    pub default: String,
    pub aliases: BTreeMap<String, String>,
    pub classes: Vec<(String, String)>,
}

impl Default for ContextSpec {
    fn default() -> Self {
        ContextSpec {
            anchor: None,
            default: DEFAULT_CONTEXT_KEY.to_string(),
            aliases: BTreeMap::new(),
            classes: Vec::new(),
        }
    }
}

impl ContextSpec {
    /// Keys derived from the directory after `anchor`.
    pub fn anchored(anchor: impl Into<String>) -> Self {
        ContextSpec {
            anchor: Some(anchor.into()),
            ..ContextSpec::default()
        }
    }

    pub fn with_alias(mut self, dir: impl Into<String>, key: impl Into<String>) -> Self {
        self.aliases.insert(dir.into(), key.into());
        self
    }

    pub fn with_class(mut self, dir: impl Into<String>, key: impl Into<String>) -> Self {
        self.classes.push((dir.into(), key.into()));
        self
    }

    pub fn with_default(mut self, key: impl Into<String>) -> Self {
        self.default = key.into();
        self
    }

    /// Derive the context key for `location`.
    pub fn derive(&self, location: &FileLocation) -> String {
        let dirs = location.dirs();

        if let Some(anchor) = self.anchor.as_deref() {
            if let Some(idx) = dirs.iter().position(|d| d == anchor) {
                if let Some(name) = dirs.get(idx + 1) {
                    return self.aliases.get(name).unwrap_or(name).clone();
                }
            }
        }

        self.classes
            .iter()
            .find(|(dir, _)| dirs.iter().any(|d| d == dir))
            .map(|(_, key)| key.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(path: &str) -> FileLocation {
        FileLocation::from_relative(path).unwrap()
    }

    #[test]
    fn directory_after_anchor() {
        let spec = ContextSpec::anchored("plugins");
        assert_eq!(spec.derive(&loc("plugins/foo/bar.ext")), "foo");
        assert_eq!(spec.derive(&loc("plugins/foo/deep/er/bar.ext")), "foo");
    }

    #[test]
    fn no_anchor_falls_back_to_default() {
        let spec = ContextSpec::anchored("plugins");
        assert_eq!(spec.derive(&loc("other/bar.ext")), "app");
        assert_eq!(spec.derive(&loc("bar.ext")), "app");
    }

    #[test]
    fn file_directly_in_anchor_has_no_plugin() {
        let spec = ContextSpec::anchored("plugins").with_default("core");
        assert_eq!(spec.derive(&loc("plugins/registry.ext")), "core");
    }

    #[test]
    fn aliases_rename_directories() {
        let spec = ContextSpec::anchored("plugins").with_alias("calendar_album", "calendarAlbum");
        assert_eq!(
            spec.derive(&loc("plugins/calendar_album/view.ext")),
            "calendarAlbum"
        );
        assert_eq!(spec.derive(&loc("plugins/todo/view.ext")), "todo");
    }

    #[test]
    fn classes_apply_in_declared_order() {
        let spec = ContextSpec::anchored("plugins")
            .with_class("screens", "screens")
            .with_class("widgets", "app");
        assert_eq!(spec.derive(&loc("screens/home/page.ext")), "screens");
        assert_eq!(spec.derive(&loc("widgets/screens/x.ext")), "screens");
        assert_eq!(spec.derive(&loc("widgets/button.ext")), "app");
        assert_eq!(spec.derive(&loc("plugins/chat/screens/x.ext")), "chat");
    }

    #[test]
    fn deserializes_from_toml_shape() {
        let spec: ContextSpec = toml::from_str(
            r#"
            anchor = "plugins"
            aliases = { calendar_album = "calendarAlbum" }
            classes = [["screens", "screens"]]
            "#,
        )
        .unwrap();
        assert_eq!(spec.default, "app");
        assert_eq!(spec.derive(&loc("screens/a.ext")), "screens");
    }
}
