//! Query records: the immutable result of one completed pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fresh identifier for one pipeline run.
pub fn new_run_id() -> String {
    format!("run_{}", Uuid::new_v4().simple())
}

/// Outcome of a successful run before the session store has sequenced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    /// Run that produced this outcome; its trace events carry the same id.
    pub run_id: String,
    pub query: String,
    pub topic: String,
    pub sub_queries: Vec<String>,
    /// Snippet summaries (`"title: snippet"`), oldest sub-query first.
    pub findings: Vec<String>,
    /// Distinct source ids in first-seen order.
    pub sources: Vec<String>,
    pub answer: String,
    pub source_count: usize,
    pub duration_ms: u64,
}

impl PendingRecord {
    /// Minimal outcome carrying only the query, answer and duration.
    pub fn new(query: impl Into<String>, answer: impl Into<String>, duration_ms: u64) -> Self {
        let query = query.into();
        Self {
            run_id: new_run_id(),
            topic: crate::domain::text::normalize_topic(&query),
            query,
            sub_queries: Vec::new(),
            findings: Vec::new(),
            sources: Vec::new(),
            answer: answer.into(),
            source_count: 0,
            duration_ms,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub(crate) fn seal(self, session_key: &str, sequence: u64) -> QueryRecord {
        QueryRecord {
            session_key: session_key.to_string(),
            sequence,
            run_id: self.run_id,
            query: self.query,
            topic: self.topic,
            sub_queries: self.sub_queries,
            findings: self.findings,
            sources: self.sources,
            answer: self.answer,
            source_count: self.source_count,
            duration_ms: self.duration_ms,
            recorded_at: Utc::now(),
        }
    }
}

/// A sequenced, immutable record of one answered query.
///
/// Only [`SessionStore::append`](crate::memory::SessionStore::append) creates
/// these, which is what keeps `sequence` gap-free within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub session_key: String,
    /// 0-based position in the session history.
    pub sequence: u64,
    pub run_id: String,
    pub query: String,
    pub topic: String,
    pub sub_queries: Vec<String>,
    pub findings: Vec<String>,
    pub sources: Vec<String>,
    pub answer: String,
    pub source_count: usize,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

impl QueryRecord {
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}
