//! Rolling context summary over a session's most recent records.
//!
//! A summary is always derived from the history slice it is given; nothing is
//! cached, so a summary can never lag behind an append.

use serde::{Deserialize, Serialize};

use crate::domain::text::excerpt;
use crate::domain::QueryRecord;

/// Bounds applied when compacting history into a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    /// How many of the most recent records to include.
    pub size: usize,
    /// Character cap for each answer excerpt.
    pub excerpt_max_chars: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            size: 3,
            excerpt_max_chars: 200,
        }
    }
}

/// One summarized record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub sequence: u64,
    pub query: String,
    pub excerpt: String,
}

/// Compacted view of the last few records of a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextSummary {
    /// Oldest first.
    pub entries: Vec<ContextEntry>,
    /// Size of the full history the window was taken from.
    pub total_queries: usize,
}

impl ContextSummary {
    /// Summarize the tail of `history` within `window`.
    pub fn from_history(history: &[QueryRecord], window: ContextWindow) -> Self {
        let start = history.len().saturating_sub(window.size);
        let entries = history[start..]
            .iter()
            .map(|r| ContextEntry {
                sequence: r.sequence,
                query: r.query.clone(),
                excerpt: excerpt(&r.answer, window.excerpt_max_chars),
            })
            .collect();
        Self {
            entries,
            total_queries: history.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summarized queries, newest first.
    pub fn recent_queries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(|e| e.query.as_str())
    }

    /// Prompt-ready text; empty string when there is no history.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let mut out = format!(
            "Previous research in this session ({} queries):\n",
            self.total_queries
        );
        for (i, entry) in self.entries.iter().enumerate() {
            out.push_str(&format!("{}. {}: {}\n", i + 1, entry.query, entry.excerpt));
        }
        out
    }
}

impl std::fmt::Display for ContextSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
