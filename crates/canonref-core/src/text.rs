//! Text position utilities.
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count Unicode scalar values, not bytes

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shift both ends forward by `delta` bytes.
    pub fn offset(self, delta: usize) -> Self {
        Span::new(self.start + delta, self.end + delta)
    }
}

/// Precomputed line starts for repeated offset lookups in one document.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    content: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(content: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex { content, starts }
    }

    /// Convert a byte offset to a 1-indexed `(line, col)`.
    ///
    /// Offsets past the end clamp to the end of content.
    pub fn position(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.content.len());
        let line_idx = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.starts[line_idx];
        let col = self.content[line_start..]
            .char_indices()
            .take_while(|(i, _)| line_start + i < offset)
            .count();
        (line_idx as u32 + 1, col as u32 + 1)
    }
}

// ============================================================================
// Tests
// ============================================================================
