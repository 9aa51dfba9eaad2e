//! Span-based text edits
//!
//! Edits address byte ranges of the original text. They are collected
//! independently and spliced in a single pass, so every byte outside an edit
//! is copied through unchanged.

use std::ops::Range;

use crate::error::SchemaDiffError;

/// Replace `span` of the original text with `replacement`.
///
/// An empty span is an insertion; an empty replacement is a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Range<usize>,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(span: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at..at, text)
    }

    pub fn delete(span: Range<usize>) -> Self {
        Self::replace(span, String::new())
    }
}

/// Apply `edits` to `text` in offset order.
///
/// Insertions at the same offset keep the order they were collected in.
/// Edits whose spans overlap, or that fall outside the text, are rejected.
pub fn apply_edits(text: &str, mut edits: Vec<TextEdit>) -> Result<String, SchemaDiffError> {
    edits.sort_by_key(|e| (e.span.start, e.span.end));

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in &edits {
        if edit.span.start < cursor || edit.span.end < edit.span.start || edit.span.end > text.len() {
            return Err(SchemaDiffError::OverlappingEdits {
                offset: edit.span.start,
            });
        }
        out.push_str(&text[cursor..edit.span.start]);
        out.push_str(&edit.replacement);
        cursor = edit.span.end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_edits_in_offset_order() {
        let text = "abcdef";
        let edits = vec![
            TextEdit::replace(4..5, "E"),
            TextEdit::delete(0..1),
            TextEdit::insert(2, "+"),
            TextEdit::insert(2, "-"),
        ];
        assert_eq!(apply_edits(text, edits).unwrap(), "b+-cdEf");
    }

    #[test]
    fn test_no_edits_is_identity() {
        let text = "CREATE TABLE t (a int);\n";
        assert_eq!(apply_edits(text, Vec::new()).unwrap(), text);
    }

    #[test]
    fn test_overlapping_edits_rejected() {
        let edits = vec![TextEdit::replace(0..3, "x"), TextEdit::replace(2..4, "y")];
        assert!(matches!(
            apply_edits("abcdef", edits),
            Err(SchemaDiffError::OverlappingEdits { offset: 2 })
        ));
    }

    #[test]
    fn test_insert_at_edge_of_replacement_is_allowed() {
        let edits = vec![TextEdit::replace(1..3, "X"), TextEdit::insert(3, "!")];
        assert_eq!(apply_edits("abcd", edits).unwrap(), "aX!d");
    }
}
