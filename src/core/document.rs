//! Document text helpers.
//!
//! Windowing is measured in grapheme clusters so a bounded prefix never
//! splits a character (or a combining sequence) in half.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Matches paragraph identifier markers such as `[P12]`.
static PARAGRAPH_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[P(\d+)\]").ok());

/// Returns at most `max_graphemes` leading grapheme clusters of `text`.
///
/// Returns the input unchanged when it is already short enough.
#[must_use]
pub fn bounded_prefix(text: &str, max_graphemes: usize) -> &str {
    match text.grapheme_indices(true).nth(max_graphemes) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Returns `true` if `text` holds more than `limit` grapheme clusters.
#[must_use]
pub fn exceeds(text: &str, limit: usize) -> bool {
    text.graphemes(true).nth(limit).is_some()
}

/// Prefixes every non-empty paragraph with a `[P<n>]` marker (1-based).
///
/// Paragraphs are separated by blank lines. Text that already carries
/// markers is returned unchanged so annotation is idempotent.
#[must_use]
pub fn annotate_paragraphs(text: &str) -> String {
    if !paragraph_markers(text).is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + text.len() / 40);
    let mut n = 0usize;
    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }
        n += 1;
        if n > 1 {
            out.push_str("\n\n");
        }
        let _ = write!(out, "[P{n}] {trimmed}");
    }
    out
}

/// Returns the paragraph numbers of all markers found in `text`, in order.
#[must_use]
pub fn paragraph_markers(text: &str) -> Vec<u32> {
    PARAGRAPH_MARKER.as_ref().map_or_else(Vec::new, |re| {
        re.captures_iter(text)
            .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
            .collect()
    })
}
