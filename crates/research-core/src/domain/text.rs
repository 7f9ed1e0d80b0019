//! Small text helpers shared by the memory stores and the agents.

/// Truncate `text` to at most `max_chars` characters, appending `...` when cut.
///
/// Counts chars, not bytes, so multi-byte text is never split mid-codepoint.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Normalize query text into a topic key: trimmed, lower-cased, single spaces.
pub fn normalize_topic(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
