//! Edit application
//!
//! Inserting a line shifts every line below it, so edits are applied from the
//! highest anchor to the lowest. Each anchor then still points at the same line
//! of the original text when its edit is applied.

use crate::fix::planner::{Edit, EditBatch, EditKind};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Apply a batch to `text`; edits with out-of-range anchors are skipped
pub fn apply(text: &str, batch: &EditBatch) -> String {
    apply_tracked(text, batch).0
}

/// Apply a batch and report the edits that were applied, in application order
pub fn apply_tracked<'b>(text: &str, batch: &'b EditBatch) -> (String, Vec<&'b Edit>) {
    if batch.is_empty() {
        return (text.to_string(), Vec::new());
    }

    let crlf = text.contains("\r\n");
    let mut lines: Vec<Cow<'_, str>> = text.split('\n').map(Cow::Borrowed).collect();
    let line_count = lines.len();

    // Highest anchor first; equal anchors in reverse so they end up in batch order.
    let mut order: Vec<(usize, &Edit)> = batch.iter().enumerate().collect();
    order.sort_by(|a, b| {
        b.1.anchor_line
            .cmp(&a.1.anchor_line)
            .then_with(|| b.0.cmp(&a.0))
    });

    let mut applied = Vec::with_capacity(order.len());
    for (_, edit) in order {
        if edit.anchor_line == 0 || edit.anchor_line > line_count {
            warn!(
                "Skipping edit anchored at line {} (text has {} lines)",
                edit.anchor_line, line_count
            );
            continue;
        }

        match edit.kind {
            EditKind::InsertAfterLine => {
                let inserted = if crlf {
                    Cow::Owned(format!("{}\r", edit.inserted_text))
                } else {
                    Cow::Borrowed(edit.inserted_text.as_str())
                };
                lines.insert(edit.anchor_line, inserted);
            }
        }
        applied.push(edit);
    }

    debug!("Applied {} of {} edit(s)", applied.len(), batch.len());
    (lines.join("\n"), applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(anchor_line: usize, text: &str) -> Edit {
        Edit {
            anchor_line,
            inserted_text: text.to_string(),
            kind: EditKind::InsertAfterLine,
            description: format!("insert after {}", anchor_line),
        }
    }

    #[test]
    fn test_empty_batch_is_identity() {
        let text = "a\r\nb\n";
        assert_eq!(apply(text, &EditBatch::new()), text);
    }

    #[test]
    fn test_anchors_refer_to_original_lines() {
        let text = "l1\nl2\nl3\nl4";
        let batch: EditBatch = vec![insert(1, "after-1"), insert(3, "after-3")]
            .into_iter()
            .collect();

        assert_eq!(apply(text, &batch), "l1\nafter-1\nl2\nl3\nafter-3\nl4");
    }

    #[test]
    fn test_equal_anchors_keep_batch_order() {
        let text = "a\nb";
        let batch: EditBatch = vec![insert(1, "first"), insert(1, "second")]
            .into_iter()
            .collect();

        let (patched, applied) = apply_tracked(text, &batch);
        assert_eq!(patched, "a\nfirst\nsecond\nb");
        assert_eq!(applied.len(), 2);
    }

    #[test]
    fn test_out_of_range_anchors_are_skipped() {
        let text = "a\nb";
        let batch: EditBatch = vec![insert(0, "zero"), insert(2, "end"), insert(9, "far")]
            .into_iter()
            .collect();

        let (patched, applied) = apply_tracked(text, &batch);
        assert_eq!(patched, "a\nb\nend");
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].anchor_line, 2);
    }

    #[test]
    fn test_crlf_is_preserved() {
        let text = "def f():\r\n    pass\r\n";
        let batch: EditBatch = vec![insert(1, "    \"\"\"f function.\"\"\"")].into_iter().collect();

        assert_eq!(
            apply(text, &batch),
            "def f():\r\n    \"\"\"f function.\"\"\"\r\n    pass\r\n"
        );
    }
}
