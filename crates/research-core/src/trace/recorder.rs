//! Append-only trace recorder shared by every agent.
//!
//! The recorder is constructed once and handed around as an
//! `Arc<TraceRecorder>`; there is no process-global trace state. Sequence
//! assignment and the append happen under the same lock, so the stored order
//! is the sequence order even with concurrent writers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::event::{PendingEvent, TraceEvent, TraceKind, RUN_ID_ATTR};

/// Errors produced by the trace recorder.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("trace event agent name must not be empty")]
    EmptyAgent,

    #[error("trace snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for trace operations.
pub type TraceResult<T> = std::result::Result<T, TraceError>;

/// Records trace events in memory.
#[derive(Debug, Default)]
pub struct TraceRecorder {
    events: Mutex<Vec<TraceEvent>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number.
    pub fn record(&self, pending: PendingEvent) -> TraceResult<u64> {
        if pending.agent.trim().is_empty() {
            return Err(TraceError::EmptyAgent);
        }

        let event = {
            let mut events = self.events.lock();
            let event = TraceEvent {
                sequence: events.len() as u64,
                timestamp: Utc::now(),
                agent: pending.agent,
                kind: pending.kind,
                session_key: pending.session_key,
                attributes: pending.attributes,
            };
            events.push(event.clone());
            event
        };

        let session = event.session_key.as_deref().unwrap_or("-");
        match event.kind {
            TraceKind::Error => warn!(
                event = "trace.recorded",
                seq = event.sequence,
                agent = %event.agent,
                kind = %event.kind,
                session_key = %session,
                attributes = ?event.attributes,
            ),
            _ => info!(
                event = "trace.recorded",
                seq = event.sequence,
                agent = %event.agent,
                kind = %event.kind,
                session_key = %session,
                attributes = ?event.attributes,
            ),
        }
        Ok(event.sequence)
    }

    /// Snapshot of every event recorded so far.
    pub fn all(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Events tagged with `session_key`, in sequence order.
    pub fn for_session(&self, session_key: &str) -> Vec<TraceEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.belongs_to(session_key))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Serializable copy of the current trace.
    pub fn export_snapshot(&self) -> TraceSnapshot {
        let events = self.all();
        debug!(events = events.len(), "trace snapshot exported");
        TraceSnapshot {
            exported_at: Utc::now(),
            events,
        }
    }
}

/// Exported trace document; the sink is the caller's choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSnapshot {
    pub exported_at: DateTime<Utc>,
    pub events: Vec<TraceEvent>,
}

impl TraceSnapshot {
    pub fn to_json(&self) -> TraceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> TraceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// SHA-256 hex digest of the serialized event list.
    ///
    /// Independent of `exported_at`, so two exports of the same trace match.
    pub fn content_digest(&self) -> TraceResult<String> {
        use sha2::Digest as _;
        let bytes = serde_json::to_vec(&self.events)?;
        Ok(hex::encode(sha2::Sha256::digest(&bytes)))
    }
}

/// A recorder handle bound to one session and, optionally, one run.
///
/// Agents receive a scope instead of the raw recorder so every event they
/// emit carries the originating session key and a `run_id` attribute. Trace writes never fail the
/// pipeline: a rejected event is logged and dropped.
#[derive(Debug, Clone)]
pub struct TraceScope {
    recorder: Arc<TraceRecorder>,
    session_key: Option<String>,
    run_id: Option<String>,
}

impl TraceScope {
    pub fn new(recorder: Arc<TraceRecorder>, session_key: Option<&str>) -> Self {
        Self {
            recorder,
            session_key: session_key.map(str::to_string),
            run_id: None,
        }
    }

    /// Tag every event emitted through this scope with `run_id`.
    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Scope with no session tag.
    pub fn detached(recorder: Arc<TraceRecorder>) -> Self {
        Self::new(recorder, None)
    }

    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    pub fn recorder(&self) -> &Arc<TraceRecorder> {
        &self.recorder
    }

    /// Tag `pending` with this scope's session and record it.
    pub fn emit(&self, pending: PendingEvent) -> Option<u64> {
        let mut pending = pending.session(self.session_key());
        if let Some(run_id) = &self.run_id {
            pending = pending.attr(RUN_ID_ATTR, run_id.as_str());
        }
        match self.recorder.record(pending) {
            Ok(seq) => Some(seq),
            Err(e) => {
                warn!(error = %e, "dropping trace event");
                None
            }
        }
    }
}
