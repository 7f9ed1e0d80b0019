//! Long-term memory bank: topic key -> accumulated synthesis excerpts.
//!
//! Unbounded by design of the contract; eviction is left to callers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::text::normalize_topic;
use crate::domain::MemoryScope;

/// One remembered excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryExcerpt {
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

/// Everything remembered about a topic, oldest excerpt first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub topic: String,
    pub excerpts: Vec<MemoryExcerpt>,
    pub created_at: DateTime<Utc>,
}

/// Derive the memory-bank key for `query`.
///
/// Under [`MemoryScope::Session`] the key is prefixed with the session so
/// knowledge stays within that session.
pub fn topic_key(query: &str, session_key: &str, scope: MemoryScope) -> String {
    let topic = normalize_topic(query);
    match scope {
        MemoryScope::Global => topic,
        MemoryScope::Session => format!("{session_key}::{topic}"),
    }
}

/// Cross-session knowledge store.
#[derive(Debug, Default)]
pub struct MemoryBank {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `excerpt` under `topic`, creating the entry on first write.
    pub fn remember(&self, topic: &str, excerpt: impl Into<String>) {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let entry = entries
            .entry(topic.to_string())
            .or_insert_with(|| MemoryEntry {
                topic: topic.to_string(),
                excerpts: Vec::new(),
                created_at: now,
            });
        entry.excerpts.push(MemoryExcerpt {
            text: excerpt.into(),
            recorded_at: now,
        });
        debug!(topic = %topic, excerpts = entry.excerpts.len(), "memory remembered");
    }

    /// Excerpts for `topic`, oldest first; empty when unknown.
    pub fn recall(&self, topic: &str) -> Vec<String> {
        self.entries
            .read()
            .get(topic)
            .map(|e| e.excerpts.iter().map(|x| x.text.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of distinct topics.
    pub fn size(&self) -> usize {
        self.entries.read().len()
    }

    pub fn entry(&self, topic: &str) -> Option<MemoryEntry> {
        self.entries.read().get(topic).cloned()
    }

    /// Known topics, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.entries.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// All entries sorted by topic, for export.
    pub fn snapshot(&self) -> Vec<MemoryEntry> {
        let mut entries: Vec<MemoryEntry> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| a.topic.cmp(&b.topic));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recall_unknown_topic_is_empty() {
        let bank = MemoryBank::new();
        assert!(bank.recall("nothing").is_empty());
        assert_eq!(bank.size(), 0);
    }

    #[test]
    fn test_repeated_topic_accumulates() {
        let bank = MemoryBank::new();
        bank.remember("quantum computing", "first");
        bank.remember("quantum computing", "second");
        bank.remember("climate", "other");
        assert_eq!(bank.recall("quantum computing"), vec!["first", "second"]);
        assert_eq!(bank.size(), 2);
        assert_eq!(bank.topics(), vec!["climate", "quantum computing"]);
    }

    #[test]
    fn test_topic_key_global_normalizes() {
        assert_eq!(
            topic_key("Quantum  Computing", "s1", MemoryScope::Global),
            topic_key("quantum computing", "s2", MemoryScope::Global)
        );
    }

    #[test]
    fn test_topic_key_session_scope_separates_sessions() {
        let a = topic_key("Quantum Computing", "s1", MemoryScope::Session);
        let b = topic_key("Quantum Computing", "s2", MemoryScope::Session);
        assert_eq!(a, "s1::quantum computing");
        assert_ne!(a, b);
    }

    #[test]
    fn test_snapshot_is_sorted_and_serializable() {
        let bank = MemoryBank::new();
        bank.remember("b", "x");
        bank.remember("a", "y");
        let snap = bank.snapshot();
        assert_eq!(snap[0].topic, "a");
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"topic\":\"b\""));
    }
}
