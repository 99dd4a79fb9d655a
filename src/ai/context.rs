// SPDX-License-Identifier: MIT
//! Deterministic activity-context assembly for generation requests.
//!
//! The provider always receives a well-formed context: one fixed-format
//! block per record, blank-line separated, with explicit markers standing
//! in for missing dates, descriptions, or an empty selection.

use crate::records::ActivityRecord;

/// Rendered when the selection contains no records. The generation call
/// still proceeds — the provider is told there is nothing, rather than
/// being handed an empty string.
pub const NO_RECORDS_MARKER: &str = "(no activity records)";

const DATE_UNKNOWN_MARKER: &str = "date unknown";
const NO_DESCRIPTION_MARKER: &str = "none";

/// Resume drafts get a detail excerpt per record; interview-question
/// generation works from titles and descriptions alone.
const DETAIL_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
    Resume,
    Interview,
}

/// Render the selected records into the provider context.
pub fn build_activity_context(records: &[ActivityRecord], mode: ContextMode) -> String {
    if records.is_empty() {
        return NO_RECORDS_MARKER.to_string();
    }

    records
        .iter()
        .map(|r| render_block(r, mode))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_block(record: &ActivityRecord, mode: ContextMode) -> String {
    let date = record.date.as_deref().unwrap_or(DATE_UNKNOWN_MARKER);
    let description = record
        .description
        .as_deref()
        .unwrap_or(NO_DESCRIPTION_MARKER);

    let mut block = format!(
        "[{}] {} ({date})\ndesc: {description}",
        record.category, record.title
    );

    if mode == ContextMode::Resume {
        if let Some(content) = record.content.as_deref() {
            let excerpt: String = content.chars().take(DETAIL_EXCERPT_CHARS).collect();
            block.push_str("\ndetail: ");
            block.push_str(&excerpt);
        }
    }
    block
}

/// Count the characters of a draft after stripping all whitespace.
/// Not a token count and not a word-boundary count — the definition is
/// fixed for test reproducibility.
pub fn word_count(draft: &str) -> usize {
    draft.chars().filter(|c| !c.is_whitespace()).count()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
