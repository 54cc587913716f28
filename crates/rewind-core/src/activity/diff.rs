//! Unified line diffs for edit-group summaries.
//!
//! Output follows the classic `difflib` layout: `--- title` and `+++ title`
//! headers, `@@ -a,b +c,d @@` hunk headers, then one line per entry
//! prefixed with ` `, `-` or `+`. Lines are joined with `\n` and no line
//! carries a trailing newline. Equal inputs produce an empty string.

use similar::{ChangeTag, DiffOp, TextDiff};
use std::ops::Range;

/// Context lines around each hunk, matching `diff -u`.
pub const DEFAULT_CONTEXT: usize = 3;

fn hunk_range(range: &Range<usize>) -> String {
    match range.len() {
        0 => format!("{},0", range.start),
        1 => format!("{}", range.start + 1),
        len => format!("{},{len}", range.start + 1),
    }
}

fn hunk_span(group: &[DiffOp]) -> Option<(Range<usize>, Range<usize>)> {
    let first = group.first()?;
    let last = group.last()?;
    Some((
        first.old_range().start..last.old_range().end,
        first.new_range().start..last.new_range().end,
    ))
}

/// Line diff of `before` against `after`, both labelled `title`.
#[must_use]
pub fn unified_diff(title: &str, before: &str, after: &str, context: usize) -> String {
    let old: Vec<&str> = before.split('\n').collect();
    let new: Vec<&str> = after.split('\n').collect();
    let diff = TextDiff::from_slices(&old, &new);

    let groups = diff.grouped_ops(context);
    if groups.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        format!("--- {title}").trim().to_owned(),
        format!("+++ {title}").trim().to_owned(),
    ];
    for group in &groups {
        let Some((old_span, new_span)) = hunk_span(group) else {
            continue;
        };
        lines.push(format!(
            "@@ -{} +{} @@",
            hunk_range(&old_span),
            hunk_range(&new_span)
        ));
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Equal => ' ',
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                };
                lines.push(format!("{sign}{}", change.value()));
            }
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_have_no_diff() {
        assert_eq!(unified_diff("a.txt", "x\ny", "x\ny", DEFAULT_CONTEXT), "");
    }

    #[test]
    fn single_line_change() {
        let diff = unified_diff("doc1", "a\nb", "a\nd", DEFAULT_CONTEXT);
        assert_eq!(diff, "--- doc1\n+++ doc1\n@@ -1,2 +1,2 @@\n a\n-b\n+d");
    }

    #[test]
    fn distant_changes_get_separate_hunks() {
        let before: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
        let mut after = before.clone();
        after[1] = "changed 1".into();
        after[18] = "changed 18".into();
        let diff = unified_diff("f", &before.join("\n"), &after.join("\n"), DEFAULT_CONTEXT);
        assert_eq!(diff.matches("@@ -").count(), 2);
        assert!(diff.contains("@@ -1,5 +1,5 @@"));
        assert!(diff.contains("@@ -16,5 +16,5 @@"));
    }

    #[test]
    fn insertion_into_empty_document() {
        let diff = unified_diff("new.rs", "", "fn main() {}", DEFAULT_CONTEXT);
        assert_eq!(diff, "--- new.rs\n+++ new.rs\n@@ -1 +1 @@\n-\n+fn main() {}");
    }
}
