//! Insert a required line when content needs it.
//!
//! Typical use: after rewriting calls to an API, make sure the file imports
//! the package that provides it. The rule fires only when `trigger` matches
//! and no line equal to `line` (ignoring surrounding whitespace) exists, so
//! running it again is a no-op.

use regex::{Regex, RegexBuilder};

use crate::error::{CanonError, CanonResult};
use crate::rules::{Edit, Rule, RuleContext, RuleOutcome, Scope};
use crate::text::Span;

/// Lines after which the required line is inserted, by default imports.
pub const DEFAULT_ANCHOR: &str = r"^[ \t]*import\s";

#[derive(Debug, Clone)]
pub struct EnsureLineRule {
    name: String,
    trigger: Regex,
    line: String,
    anchor: Regex,
}

impl EnsureLineRule {
    pub fn new(name: impl Into<String>, trigger: &str, line: impl Into<String>) -> CanonResult<Self> {
        Ok(EnsureLineRule {
            name: name.into(),
            trigger: compile(trigger)?,
            line: line.into(),
            anchor: compile(DEFAULT_ANCHOR)?,
        })
    }

    /// Insert after the last line matching `anchor` instead of the last import.
    pub fn with_anchor(mut self, anchor: &str) -> CanonResult<Self> {
        self.anchor = compile(anchor)?;
        Ok(self)
    }

    fn present(&self, text: &str) -> bool {
        let wanted = self.line.trim();
        text.lines().any(|l| l.trim() == wanted)
    }
}

fn compile(pattern: &str) -> CanonResult<Regex> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|e| CanonError::invalid_pattern(pattern, e))
}

impl Rule for EnsureLineRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Scope {
        Scope::Content
    }

    fn find(&self, text: &str, _ctx: &RuleContext<'_>) -> RuleOutcome {
        if !self.trigger.is_match(text) || self.present(text) {
            return RuleOutcome::default();
        }

        let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let edit = match self.anchor.find_iter(text).last() {
            Some(anchor) => match text[anchor.start()..].find('\n') {
                Some(nl) => {
                    let at = anchor.start() + nl + 1;
                    Edit::new(Span::new(at, at), format!("{}{}", self.line, eol))
                }
                None => Edit::new(
                    Span::new(text.len(), text.len()),
                    format!("{}{}{}", eol, self.line, eol),
                ),
            },
            None => Edit::new(Span::new(0, 0), format!("{}{}", self.line, eol)),
        };

        RuleOutcome {
            edits: vec![edit.with_note(format!("ensure `{}`", self.line.trim()))],
            skipped: Vec::new(),
        }
    }
}
