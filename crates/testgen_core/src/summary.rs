use serde::{Deserialize, Serialize};

/// One candidate test case, addressed by its position in the current list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub index: usize,
    pub text: String,
}

/// Split a summary response into items.
///
/// Lines are trimmed and blank lines dropped; nothing else is normalised, so
/// numbering prefixes such as `1.` stay in the text. A blank response yields
/// an empty list.
pub fn parse_summaries(raw: &str) -> Vec<SummaryItem> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, text)| SummaryItem {
            index,
            text: text.to_string(),
        })
        .collect()
}
