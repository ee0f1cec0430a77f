//! Relative import directives to canonical package references.
//!
//! Matches `import`, `export`, `part` and `part of` directives whose quoted
//! path starts with `../`, resolves the path against the file's location and
//! rewrites the directive to use the canonical reference. Quote style,
//! keywords, whitespace and anything after the closing quote are left as
//! they were.
//!
//! A directive must start its line or follow a `;`, so mentions inside
//! comments and string literals are not rewritten.

use std::sync::LazyLock;

use regex::Regex;

use crate::resolve::{resolve, RelativeRef, ResolveError};
use crate::rules::{Edit, Rule, RuleContext, RuleOutcome, Skipped};
use crate::text::Span;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|;)\s*(import|export|part)(\s+(?:of\s+)?)(['"])(\.\./[^'"]*)(['"])"#)
        .unwrap()
});

/// Rewrites relative `import`/`export`/`part` directives.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeImportRule;

impl RelativeImportRule {
    pub const NAME: &'static str = "relative-import";

    pub fn new() -> Self {
        RelativeImportRule
    }
}

impl Rule for RelativeImportRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn find(&self, text: &str, ctx: &RuleContext<'_>) -> RuleOutcome {
        let mut outcome = RuleOutcome::default();

        for caps in DIRECTIVE.captures_iter(text) {
            let (Some(keyword), Some(space), Some(open), Some(path), Some(close)) = (
                caps.get(1),
                caps.get(2),
                caps.get(3),
                caps.get(4),
                caps.get(5),
            ) else {
                continue;
            };
            if open.as_str() != close.as_str() {
                continue;
            }

            let span = Span::new(keyword.start(), close.end());
            match resolve(ctx.location, path.as_str(), ctx.namespace) {
                Ok(canonical) => {
                    let replacement = format!(
                        "{}{}{}{}{}",
                        keyword.as_str(),
                        space.as_str(),
                        open.as_str(),
                        canonical,
                        close.as_str()
                    );
                    outcome
                        .edits
                        .push(Edit::new(span, replacement).with_note(format!(
                            "{} level(s) up from {}",
                            RelativeRef::parse(path.as_str()).map_or(0, |r| r.ups),
                            ctx.location
                        )));
                }
                Err(ResolveError::NotRelative) => {}
                Err(error) => outcome.skipped.push(Skipped {
                    span,
                    reference: path.as_str().to_string(),
                    error,
                }),
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::FileLocation;
    use crate::resolve::Namespace;
    use crate::rules::RuleSet;

    fn set() -> RuleSet {
        RuleSet::new(Namespace::new("package:app").with_root_marker("lib"))
            .with_rule(RelativeImportRule::new())
    }

    fn loc(path: &str) -> FileLocation {
        FileLocation::from_relative(path).unwrap()
    }

    #[test]
    fn rewrites_relative_import_preserving_rest_of_line() {
        let content = "import '../../core/util.dart' show helper; // keep\n";
        let out = set().apply(content, &loc("a/b/c.dart"));
        assert_eq!(
            out.content,
            "import 'package:app/core/util.dart' show helper; // keep\n"
        );
        assert_eq!(out.records.len(), 1);
        let record = &out.records[0];
        assert_eq!(record.original, "import '../../core/util.dart'");
        assert_eq!(record.replacement, "import 'package:app/core/util.dart'");
        assert_eq!(record.rule, RelativeImportRule::NAME);
        assert_eq!((record.line, record.column), (1, 1));
    }

    #[test]
    fn double_quotes_and_export_and_part() {
        let content = "export \"../x.dart\";\npart '../y.dart';\n";
        let out = set().apply(content, &loc("a/b.dart"));
        assert_eq!(
            out.content,
            "export \"package:app/x.dart\";\npart 'package:app/y.dart';\n"
        );
    }

    #[test]
    fn above_root_reference_is_left_untouched() {
        let content = "import '../../../x/y.dart';\n";
        let out = set().apply(content, &loc("a/b/c.dart"));
        assert_eq!(out.content, content);
        assert!(out.records.is_empty());
        assert_eq!(out.unresolved.len(), 1);
        assert_eq!(out.unresolved[0].reference, "../../../x/y.dart");
    }

    #[test]
    fn non_relative_imports_are_ignored() {
        let content = "import 'package:flutter/material.dart';\nimport 'local.dart';\nimport './x.dart';\n";
        let out = set().apply(content, &loc("a/b.dart"));
        assert_eq!(out.content, content);
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn mismatched_quotes_are_not_candidates() {
        let content = "import '../x.dart\";\n";
        let out = set().apply(content, &loc("a/b.dart"));
        assert_eq!(out.content, content);
    }

    #[test]
    fn rewriting_twice_is_a_no_op() {
        let content = "import '../../x/y.dart';\nimport '../z.dart';\n";
        let location = loc("a/b/c.dart");
        let once = set().apply(content, &location);
        let twice = set().apply(&once.content, &location);
        assert_eq!(once.content, twice.content);
        assert!(twice.records.is_empty());
    }

    #[test]
    fn root_marker_in_remainder_is_not_doubled() {
        let content = "import '../lib/util.dart';\n";
        let out = set().apply(content, &loc("screens/home.dart"));
        assert_eq!(out.content, "import 'package:app/util.dart';\n");
    }

    #[test]
    fn part_of_directive() {
        let content = "part of '../library.dart';\n";
        let out = set().apply(content, &loc("src/parts/p.dart"));
        assert_eq!(out.content, "part of 'package:app/src/library.dart';\n");
        assert_eq!(out.records[0].original, "part of '../library.dart'");
    }

    #[test]
    fn indented_directive() {
        let content = "  import '../x.dart';\n";
        let out = set().apply(content, &loc("a/b.dart"));
        assert_eq!(out.content, "  import 'package:app/x.dart';\n");
        assert_eq!(out.records[0].column, 3);
    }

    #[test]
    fn mentions_in_comments_are_left_alone() {
        let content = "// TODO: drop import '../old.dart' later\n/* export '../x.dart' */\n";
        let out = set().apply(content, &loc("a/b/c.dart"));
        assert_eq!(out.content, content);
        assert!(out.records.is_empty());
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn mentions_in_string_literals_are_left_alone() {
        let content = "const s = \"export '../x'\";\nfinal t = 'import \"../y.dart\"';\n";
        let out = set().apply(content, &loc("a/b/c.dart"));
        assert_eq!(out.content, content);
        assert!(out.records.is_empty());
    }

    #[test]
    fn several_directives_on_one_line() {
        let content = "import '../a.dart'; import '../b.dart';\n";
        let out = set().apply(content, &loc("x/f.dart"));
        assert_eq!(
            out.content,
            "import 'package:app/a.dart'; import 'package:app/b.dart';\n"
        );
        assert_eq!(out.records[1].column, 21);
    }
}
