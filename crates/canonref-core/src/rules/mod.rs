//! Rewrite rules and ordered rule sets.
//!
//! A [`Rule`] finds spans in text and says what to replace them with. It
//! never mutates anything itself; the [`RuleSet`] applies each rule's edits
//! in declaration order, so every rule sees the output of the rules before
//! it. Within one rule, edits are applied back to front so earlier byte
//! offsets stay valid.
//!
//! Rules run either per line (the line ending is not part of the text the
//! rule sees, and is always preserved) or over the whole content.

pub mod context;
pub mod ensure;
pub mod import;
pub mod pattern;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::location::FileLocation;
use crate::record::{ChangeRecord, UnresolvedRef};
use crate::resolve::{Namespace, ResolveError};
use crate::text::{LineIndex, Span};

pub use context::ContextSpec;
pub use ensure::EnsureLineRule;
pub use import::RelativeImportRule;
pub use pattern::PatternRule;

// ============================================================================
// Rule Interface
// ============================================================================

/// Granularity a rule matches at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Matched against each line, without its line ending.
    #[default]
    Line,
    /// Matched against the whole file content.
    Content,
}

/// Everything a rule may consult besides the text itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub location: &'a FileLocation,
    pub namespace: &'a Namespace,
    pub context_key: &'a str,
}

/// One replacement proposed by a rule. An empty span is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
    pub note: Option<String>,
}

impl Edit {
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        Edit {
            span,
            replacement: replacement.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A candidate the rule matched but could not rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub span: Span,
    pub reference: String,
    pub error: ResolveError,
}

/// What a rule found in one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    pub edits: Vec<Edit>,
    pub skipped: Vec<Skipped>,
}

/// A rewrite rule: match predicate plus transform.
///
/// `find` must be pure. For the rule set to be idempotent, a rule's
/// replacement text must not match the rule again.
pub trait Rule: fmt::Debug + Send + Sync {
    /// Stable name used in change records.
    fn name(&self) -> &str;

    fn scope(&self) -> Scope {
        Scope::Line
    }

    fn find(&self, text: &str, ctx: &RuleContext<'_>) -> RuleOutcome;
}

// ============================================================================
// Rule Set
// ============================================================================

/// Result of applying a rule set to one file's content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSetOutput {
    pub content: String,
    pub records: Vec<ChangeRecord>,
    pub unresolved: Vec<UnresolvedRef>,
}

/// An ordered list of rules sharing a namespace and context spec.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
    namespace: Namespace,
    context: ContextSpec,
}

impl RuleSet {
    pub fn new(namespace: Namespace) -> Self {
        RuleSet {
            rules: Vec::new(),
            namespace,
            context: ContextSpec::default(),
        }
    }

    pub fn with_context(mut self, context: ContextSpec) -> Self {
        self.context = context;
        self
    }

    pub fn push(&mut self, rule: impl Rule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.push(rule);
        self
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Apply every rule in order to `content`.
    ///
    /// Record positions refer to the text as the producing rule saw it.
    pub fn apply(&self, content: &str, location: &FileLocation) -> RuleSetOutput {
        let context_key = self.context.derive(location);
        let ctx = RuleContext {
            location,
            namespace: &self.namespace,
            context_key: &context_key,
        };
        let file = location.relative();

        let mut current = content.to_string();
        let mut records = Vec::new();
        let mut unresolved = Vec::new();

        for rule in &self.rules {
            let outcome = match rule.scope() {
                Scope::Content => rule.find(&current, &ctx),
                Scope::Line => find_per_line(rule.as_ref(), &current, &ctx),
            };

            let index = LineIndex::new(&current);
            for skipped in outcome.skipped {
                let (line, column) = index.position(skipped.span.start);
                debug!(file = %file, line, reference = %skipped.reference, "unresolved: {}", skipped.error);
                unresolved.push(UnresolvedRef {
                    file: file.clone(),
                    line,
                    column,
                    reference: skipped.reference,
                    reason: skipped.error,
                });
            }

            let edits = disjoint(
                outcome
                    .edits
                    .into_iter()
                    .filter(|e| current[e.span.start..e.span.end] != e.replacement)
                    .collect(),
            );
            if edits.is_empty() {
                continue;
            }

            for edit in &edits {
                let (line, column) = index.position(edit.span.start);
                records.push(ChangeRecord {
                    file: file.clone(),
                    line,
                    column,
                    original: current[edit.span.start..edit.span.end].to_string(),
                    replacement: edit.replacement.clone(),
                    rule: rule.name().to_string(),
                    note: edit.note.clone(),
                });
            }

            let mut next = current.clone();
            for edit in edits.iter().rev() {
                next.replace_range(edit.span.start..edit.span.end, &edit.replacement);
            }
            current = next;
        }

        RuleSetOutput {
            content: current,
            records,
            unresolved,
        }
    }
}

/// Run a line-scoped rule over each line, translating spans back to
/// content offsets.
fn find_per_line(rule: &dyn Rule, content: &str, ctx: &RuleContext<'_>) -> RuleOutcome {
    let mut outcome = RuleOutcome::default();
    let mut offset = 0;
    for raw in content.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        let found = rule.find(line, ctx);
        outcome.edits.extend(found.edits.into_iter().map(|mut e| {
            e.span = e.span.offset(offset);
            e
        }));
        outcome.skipped.extend(found.skipped.into_iter().map(|mut s| {
            s.span = s.span.offset(offset);
            s
        }));
        offset += raw.len();
    }
    outcome
}

/// Sort edits by position and drop any that overlap an earlier one.
fn disjoint(mut edits: Vec<Edit>) -> Vec<Edit> {
    edits.sort_by_key(|e| (e.span.start, e.span.end));
    let mut kept: Vec<Edit> = Vec::with_capacity(edits.len());
    for edit in edits {
        if let Some(last) = kept.last() {
            let touching_insert = edit.span.is_empty() && edit.span.start == last.span.end;
            if edit.span.start < last.span.end || touching_insert {
                continue;
            }
        }
        kept.push(edit);
    }
    kept
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Replaces every occurrence of a literal, used to exercise the set
    /// mechanics independently of the real rules.
    #[derive(Debug)]
    struct Literal {
        from: &'static str,
        to: &'static str,
        scope: Scope,
    }

    impl Rule for Literal {
        fn name(&self) -> &str {
            "literal"
        }

        fn scope(&self) -> Scope {
            self.scope
        }

        fn find(&self, text: &str, ctx: &RuleContext<'_>) -> RuleOutcome {
            let to = self.to.replace("{context}", ctx.context_key);
            RuleOutcome {
                edits: text
                    .match_indices(self.from)
                    .map(|(i, m)| Edit::new(Span::new(i, i + m.len()), to.clone()))
                    .collect(),
                skipped: Vec::new(),
            }
        }
    }

    fn loc(path: &str) -> FileLocation {
        FileLocation::from_relative(path).unwrap()
    }

    #[test]
    fn rules_apply_in_declaration_order() {
        let set = RuleSet::new(Namespace::new("p"))
            .with_rule(Literal {
                from: "a",
                to: "b",
                scope: Scope::Line,
            })
            .with_rule(Literal {
                from: "b",
                to: "c",
                scope: Scope::Line,
            });
        let out = set.apply("a b\n", &loc("x.ext"));
        assert_eq!(out.content, "c c\n");
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.records[0].rule, "literal");
    }

    #[test]
    fn line_endings_are_preserved() {
        let set = RuleSet::new(Namespace::new("p")).with_rule(Literal {
            from: "x",
            to: "yy",
            scope: Scope::Line,
        });
        let out = set.apply("x\r\nz\nx", &loc("f.ext"));
        assert_eq!(out.content, "yy\r\nz\nyy");
        assert_eq!(out.records[1].line, 3);
        assert_eq!(out.records[1].column, 1);
    }

    #[test]
    fn context_key_reaches_rules() {
        let set = RuleSet::new(Namespace::new("p"))
            .with_context(ContextSpec::anchored("plugins"))
            .with_rule(Literal {
                from: "KEY",
                to: "{context}",
                scope: Scope::Content,
            });
        let out = set.apply("KEY", &loc("plugins/chat/a.ext"));
        assert_eq!(out.content, "chat");
    }

    #[test]
    fn no_match_leaves_content_identical() {
        let set = RuleSet::new(Namespace::new("p")).with_rule(Literal {
            from: "zzz",
            to: "q",
            scope: Scope::Line,
        });
        let content = "line one\nline two\n";
        let out = set.apply(content, &loc("f.ext"));
        assert_eq!(out.content, content);
        assert!(out.records.is_empty());
    }

    #[test]
    fn overlapping_edits_keep_the_first() {
        let edits = vec![
            Edit::new(Span::new(4, 8), "b"),
            Edit::new(Span::new(0, 5), "a"),
            Edit::new(Span::new(5, 5), "insert"),
            Edit::new(Span::new(9, 10), "c"),
        ];
        let kept = disjoint(edits);
        let starts: Vec<_> = kept.iter().map(|e| e.span.start).collect();
        assert_eq!(starts, vec![0, 9]);
    }
}
