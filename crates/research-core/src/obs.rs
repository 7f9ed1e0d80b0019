//! Structured log hooks for the research pipeline.
//!
//! This module provides:
//! - A run-scoped tracing span via [`run_span`]
//! - Emission functions for run lifecycle events: start, stage finish,
//!   absorbed retrieval failure, run finish, run failure, evaluation
//!
//! These are log lines only; the replayable record of a run lives in the
//! [`TraceRecorder`](crate::trace::TraceRecorder).

use tracing::{info, warn};

/// Span tagged with the session key, entered for the duration of a run.
pub fn run_span(session_key: &str) -> tracing::Span {
    tracing::info_span!("research.run", session_key = %session_key)
}

/// Emit event: run started.
pub fn emit_run_started(session_key: &str, query: &str) {
    info!(event = "run.started", session_key = %session_key, query = %query);
}

/// Emit event: a stage left its state successfully.
pub fn emit_stage_finished(session_key: &str, stage: &str, duration_ms: u64) {
    info!(
        event = "stage.finished",
        session_key = %session_key,
        stage = %stage,
        duration_ms = duration_ms,
    );
}

/// Emit event: a sub-query's retrieval failed and was absorbed (warning level).
pub fn emit_sub_query_failed(
    session_key: Option<&str>,
    sub_query: &str,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "retrieval.sub_query_failed",
        session_key = %session_key.unwrap_or("-"),
        sub_query = %sub_query,
        error = %error,
    );
}

/// Emit event: run completed and its record was appended.
pub fn emit_run_finished(session_key: &str, sequence: u64, duration_ms: u64, source_count: usize) {
    info!(
        event = "run.finished",
        session_key = %session_key,
        seq = sequence,
        duration_ms = duration_ms,
        source_count = source_count,
    );
}

/// Emit event: run aborted in `stage` (warning level).
pub fn emit_run_failed(session_key: &str, stage: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "run.failed",
        session_key = %session_key,
        stage = %stage,
        error = %error,
    );
}

/// Emit event: evaluation report computed.
pub fn emit_evaluation(session_key: &str, total_queries: usize, avg_time_per_query: f64) {
    info!(
        event = "evaluation.completed",
        session_key = %session_key,
        total_queries = total_queries,
        avg_time_per_query = avg_time_per_query,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let span = run_span("test-session");
        let _guard = span.enter();
    }
}
