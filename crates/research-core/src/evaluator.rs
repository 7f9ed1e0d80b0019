//! Per-session evaluation reports.
//!
//! Reads the session store, the memory bank and the trace recorder; never
//! writes to any of them.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{QueryRecord, Result};
use crate::memory::{MemoryBank, SessionStore};
use crate::obs;
use crate::trace::{TraceEvent, TraceKind, TraceRecorder};

/// Summary of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub session_id: String,
    pub total_queries: usize,
    /// Stage `end` events of the runs in the session history.
    pub total_tasks_completed: usize,
    pub total_time_seconds: f64,
    pub avg_time_per_query: f64,
    /// Distinct topics in the memory bank (global across sessions).
    pub memory_entries: usize,
}

impl EvaluationReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Completed stage runs of one agent within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLatency {
    pub agent: String,
    pub runs: usize,
    pub total_ms: u64,
}

pub struct Evaluator {
    sessions: Arc<SessionStore>,
    bank: Arc<MemoryBank>,
    trace: Arc<TraceRecorder>,
}

impl Evaluator {
    pub fn new(
        sessions: Arc<SessionStore>,
        bank: Arc<MemoryBank>,
        trace: Arc<TraceRecorder>,
    ) -> Self {
        Self {
            sessions,
            bank,
            trace,
        }
    }

    /// Build the report for `session_key`.
    ///
    /// Fails with `UnknownSession` if the key was never created. An empty
    /// session yields zero totals.
    pub fn evaluate(&self, session_key: &str) -> Result<EvaluationReport> {
        let history = self.sessions.history(session_key)?;

        let total_queries = history.len();
        let total_secs: f64 = history.iter().map(|r| r.duration_secs()).sum();
        let avg = total_secs / total_queries.max(1) as f64;

        let total_tasks_completed = self.completed_stage_events(session_key, &history).len();

        let report = EvaluationReport {
            session_id: session_key.to_string(),
            total_queries,
            total_tasks_completed,
            total_time_seconds: round2(total_secs),
            avg_time_per_query: round2(avg),
            memory_entries: self.bank.size(),
        };
        obs::emit_evaluation(session_key, report.total_queries, report.avg_time_per_query);
        Ok(report)
    }

    /// Completed stage runs per agent, ordered by first appearance.
    pub fn stage_breakdown(&self, session_key: &str) -> Result<Vec<StageLatency>> {
        let history = self.sessions.history(session_key)?;

        let mut out: Vec<StageLatency> = Vec::new();
        for event in self.completed_stage_events(session_key, &history) {
            let ms = event
                .attribute("duration_ms")
                .and_then(|v| v.as_i64())
                .map(|v| v.max(0) as u64)
                .unwrap_or(0);
            match out.iter_mut().find(|s| s.agent == event.agent) {
                Some(stage) => {
                    stage.runs += 1;
                    stage.total_ms += ms;
                }
                None => out.push(StageLatency {
                    agent: event.agent.clone(),
                    runs: 1,
                    total_ms: ms,
                }),
            }
        }
        Ok(out)
    }

    /// `end` events whose run produced one of the records in `history`.
    ///
    /// Failed runs and runs dropped by `clear` never match.
    fn completed_stage_events(
        &self,
        session_key: &str,
        history: &[QueryRecord],
    ) -> Vec<TraceEvent> {
        let runs: HashSet<&str> = history.iter().map(|r| r.run_id.as_str()).collect();
        self.trace
            .for_session(session_key)
            .into_iter()
            .filter(|e| e.kind == TraceKind::End)
            .filter(|e| e.run_id().is_some_and(|id| runs.contains(id)))
            .collect()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
