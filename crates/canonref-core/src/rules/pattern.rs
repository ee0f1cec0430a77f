//! Configurable regex replacement rules.
//!
//! Replacement templates use the `regex` crate's expansion syntax (`$1`,
//! `${name}`, `$$` for a literal dollar) plus two placeholders filled in
//! before expansion:
//!
//! - `{context}`: the context key derived from the file's location
//! - `{prefix}`: the namespace prefix

use regex::Regex;

use crate::error::{CanonError, CanonResult};
use crate::rules::{Edit, Rule, RuleContext, RuleOutcome, Scope};
use crate::text::Span;

#[derive(Debug, Clone)]
pub struct PatternRule {
    name: String,
    regex: Regex,
    template: String,
    scope: Scope,
    note: Option<String>,
}

impl PatternRule {
    /// Compile a pattern rule. Fails with `InvalidPattern` on a bad regex.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        template: impl Into<String>,
    ) -> CanonResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| CanonError::invalid_pattern(pattern, e))?;
        Ok(PatternRule {
            name: name.into(),
            regex,
            template: template.into(),
            scope: Scope::Line,
            note: None,
        })
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    fn template_for(&self, ctx: &RuleContext<'_>) -> String {
        self.template
            .replace("{context}", &ctx.context_key.replace('$', "$$"))
            .replace("{prefix}", &ctx.namespace.prefix.replace('$', "$$"))
    }
}

impl Rule for PatternRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn find(&self, text: &str, ctx: &RuleContext<'_>) -> RuleOutcome {
        let template = self.template_for(ctx);
        let edits = self
            .regex
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let mut replacement = String::new();
                caps.expand(&template, &mut replacement);
                let edit = Edit::new(Span::new(whole.start(), whole.end()), replacement);
                Some(match &self.note {
                    Some(note) => edit.with_note(note.clone()),
                    None => edit,
                })
            })
            .collect();
        RuleOutcome {
            edits,
            skipped: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::FileLocation;
    use crate::resolve::Namespace;
    use crate::rules::{ContextSpec, RuleSet};

    fn loc(path: &str) -> FileLocation {
        FileLocation::from_relative(path).unwrap()
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = PatternRule::new("bad", "(unclosed", "").unwrap_err();
        assert!(matches!(err, CanonError::InvalidPattern { .. }));
    }

    #[test]
    fn expands_captures_and_context() {
        let rule = PatternRule::new(
            "localizations",
            r"\w+Localizations\.of\(context\)\.(\w+)",
            "'{context}_$1'.tr",
        )
        .unwrap();
        let set = RuleSet::new(Namespace::new("package:app"))
            .with_context(ContextSpec::anchored("plugins"))
            .with_rule(rule);

        let content = "Text(ChatLocalizations.of(context).title),\n";
        let out = set.apply(content, &loc("plugins/chat/view.dart"));
        assert_eq!(out.content, "Text('chat_title'.tr),\n");
        assert_eq!(out.records[0].column, 6);
    }

    #[test]
    fn dollar_in_context_key_is_literal() {
        let rule = PatternRule::new("k", "KEY", "{context}").unwrap();
        let set = RuleSet::new(Namespace::new("p"))
            .with_context(ContextSpec::default().with_default("a$1b"))
            .with_rule(rule);
        let out = set.apply("KEY", &loc("f.dart"));
        assert_eq!(out.content, "a$1b");
    }

    #[test]
    fn content_scope_removes_whole_lines() {
        let rule = PatternRule::new(
            "drop-import",
            r"import 'package:app/l10n/app_localizations\.dart';\s*\n",
            "",
        )
        .unwrap()
        .with_scope(Scope::Content)
        .with_note("remove stale localization import");
        let set = RuleSet::new(Namespace::new("package:app")).with_rule(rule);

        let content = "import 'a.dart';\nimport 'package:app/l10n/app_localizations.dart';\n\nvoid main() {}\n";
        let out = set.apply(content, &loc("f.dart"));
        assert_eq!(out.content, "import 'a.dart';\nvoid main() {}\n");
        assert_eq!(out.records[0].line, 2);
        assert_eq!(
            out.records[0].note.as_deref(),
            Some("remove stale localization import")
        );
    }

    #[test]
    fn prefix_placeholder() {
        let rule = PatternRule::new("pkg", r"PKG/(\w+)", "{prefix}/$1").unwrap();
        let set = RuleSet::new(Namespace::new("package:app")).with_rule(rule);
        let out = set.apply("PKG/x", &loc("f.dart"));
        assert_eq!(out.content, "package:app/x");
    }
}
