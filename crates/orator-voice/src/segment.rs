//! Paragraph segmentation for synthesis.
//!
//! The engine handles sentence-length to paragraph-length input well, but the
//! pipeline needs independently synthesizable units so playback can start
//! before the whole text is rendered. Paragraphs (blank-line separated) are
//! the natural unit: they match how people structure text for reading aloud.

use std::sync::LazyLock;

use regex::Regex;

/// One or more blank lines, possibly containing whitespace.
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph break pattern is valid"));

/// Split text into an ordered sequence of non-empty paragraphs.
///
/// Line endings are normalized first, then the text is split at blank-line
/// boundaries and each unit is trimmed. If no boundary exists (or every unit
/// is blank), the whole trimmed text is returned as a single unit — the
/// result is never empty for non-empty input.
#[must_use]
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let paragraphs: Vec<String> = PARAGRAPH_BREAK
        .split(&normalized)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
        .collect();

    if paragraphs.is_empty() {
        vec![normalized.trim().to_string()]
    } else {
        paragraphs
    }
}
