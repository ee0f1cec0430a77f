//! Unified diff previews.
//!
//! Line alignment is greedy: matching lines are paired in order, and on a
//! mismatch a short look-ahead window decides between an insertion, a
//! deletion, or a one-line replacement. Rewrites change few lines and never
//! reorder them, which keeps this accurate for preview purposes.

/// Lines of unchanged context around each change.
const CONTEXT: usize = 2;

/// How far ahead to search for a resynchronizing line.
const LOOKAHEAD: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

fn align(old: &[&str], new: &[&str]) -> Vec<Op> {
    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    let (mut i, mut j) = (0, 0);

    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            ops.push(Op::Equal(i, j));
            i += 1;
            j += 1;
            continue;
        }

        let mut resolved = false;
        for k in 1..=LOOKAHEAD {
            if i + k < old.len() && old[i + k] == new[j] {
                ops.extend((i..i + k).map(Op::Delete));
                i += k;
                resolved = true;
                break;
            }
            if j + k < new.len() && old[i] == new[j + k] {
                ops.extend((j..j + k).map(Op::Insert));
                j += k;
                resolved = true;
                break;
            }
        }
        if !resolved {
            ops.push(Op::Delete(i));
            ops.push(Op::Insert(j));
            i += 1;
            j += 1;
        }
    }
    ops.extend((i..old.len()).map(Op::Delete));
    ops.extend((j..new.len()).map(Op::Insert));
    ops
}

/// Render a unified diff between two versions of `file`.
///
/// Returns an empty string when the contents have identical lines.
pub fn unified_diff(file: &str, old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let ops = align(&old_lines, &new_lines);

    let changed: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Equal(..)))
        .map(|(idx, _)| idx)
        .collect();
    if changed.is_empty() {
        return String::new();
    }

    // Merge change positions into hunk ranges over `ops`, with context.
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for &idx in &changed {
        let start = idx.saturating_sub(CONTEXT);
        let end = (idx + CONTEXT + 1).min(ops.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }

    // Old/new line cursor in effect before each op.
    let mut cursors = Vec::with_capacity(ops.len());
    let (mut o, mut n) = (0usize, 0usize);
    for op in &ops {
        cursors.push((o, n));
        match op {
            Op::Equal(..) => {
                o += 1;
                n += 1;
            }
            Op::Delete(_) => o += 1,
            Op::Insert(_) => n += 1,
        }
    }

    let mut diff = String::new();
    diff.push_str(&format!("--- a/{}\n", file));
    diff.push_str(&format!("+++ b/{}\n", file));

    for (start, end) in ranges {
        let slice = &ops[start..end];
        let old_count = slice
            .iter()
            .filter(|op| !matches!(op, Op::Insert(_)))
            .count();
        let new_count = slice
            .iter()
            .filter(|op| !matches!(op, Op::Delete(_)))
            .count();
        let (o, n) = cursors[start];
        // An empty side starts at the line before, per unified diff rules.
        let old_start = if old_count == 0 { o } else { o + 1 };
        let new_start = if new_count == 0 { n } else { n + 1 };

        diff.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start, old_count, new_start, new_count
        ));
        for op in slice {
            match *op {
                Op::Equal(i, _) => diff.push_str(&format!(" {}\n", old_lines[i])),
                Op::Delete(i) => diff.push_str(&format!("-{}\n", old_lines[i])),
                Op::Insert(j) => diff.push_str(&format!("+{}\n", new_lines[j])),
            }
        }
    }

    diff
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_has_no_diff() {
        assert_eq!(unified_diff("a.dart", "x\ny\n", "x\ny\n"), "");
    }

    #[test]
    fn single_line_replacement() {
        let old = "import '../a.dart';\n\nvoid main() {}\n";
        let new = "import 'package:app/a.dart';\n\nvoid main() {}\n";
        let diff = unified_diff("lib/b.dart", old, new);
        assert_eq!(
            diff,
            "--- a/lib/b.dart\n\
             +++ b/lib/b.dart\n\
             @@ -1,3 +1,3 @@\n\
             -import '../a.dart';\n\
             +import 'package:app/a.dart';\n \n void main() {}\n"
        );
    }

    #[test]
    fn inserted_line() {
        let old = "import 'a.dart';\nfinal t = 'x'.tr;\n";
        let new = "import 'a.dart';\nimport 'package:get/get.dart';\nfinal t = 'x'.tr;\n";
        let diff = unified_diff("f.dart", old, new);
        assert!(diff.contains("@@ -1,2 +1,3 @@\n"));
        assert!(diff.contains("+import 'package:get/get.dart';\n"));
        assert!(!diff.contains("-import"));
    }

    #[test]
    fn deleted_line() {
        let old = "a\nstale\nb\n";
        let new = "a\nb\n";
        let diff = unified_diff("f", old, new);
        assert!(diff.contains("@@ -1,3 +1,2 @@\n"));
        assert!(diff.contains("-stale\n"));
    }

    #[test]
    fn distant_changes_make_separate_hunks() {
        let old: String = (0..20).map(|i| format!("line{}\n", i)).collect();
        let new = old.replace("line1\n", "LINE1\n").replace("line18\n", "LINE18\n");
        let diff = unified_diff("f", &old, &new);
        assert_eq!(diff.matches("@@ -").count(), 2);
        assert!(diff.contains("@@ -1,4 +1,4 @@\n"));
        assert!(diff.contains("@@ -17,4 +17,4 @@\n"));
    }
}
