//! Research agent orchestration and memory engine.
//!
//! A query runs through a sequential pipeline of role-specialized agents
//! (planning, retrieval, synthesis). Each completed run is appended to a
//! per-session history, a short excerpt of the answer is kept in a
//! topic-keyed memory bank, and every stage transition is written to an
//! append-only trace that can be exported and evaluated per session.
//!
//! # Module layout
//!
//! - [`domain`]: records, config, errors, text helpers
//! - [`memory`]: `SessionStore`, `ContextSummary`, `MemoryBank`
//! - [`trace`]: `TraceRecorder`, `TraceEvent`, `TraceSnapshot`
//! - [`agents`]: `PipelineStage` and the three default stages
//! - [`orchestrator`]: `Orchestrator`, the pipeline state machine
//! - [`evaluator`]: `Evaluator`, `EvaluationReport`
//! - [`obs`], [`metrics`], [`telemetry`]: logging and counters

pub mod agents;
pub mod domain;
pub mod evaluator;
pub mod memory;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod telemetry;
pub mod trace;

pub use agents::{
    PipelineStage, PipelineState, PlanningAgent, RetrievalAgent, RunContext, StageOutput,
    SynthesisAgent, SynthesisResult,
};
pub use domain::{
    ConfigError, EngineConfig, MemoryScope, PendingRecord, QueryRecord, ResearchError, Result,
};
pub use evaluator::{EvaluationReport, Evaluator, StageLatency};
pub use memory::{ContextSummary, ContextWindow, MemoryBank, MemoryEntry, SessionStore};
pub use metrics::{Metrics, MetricsSnapshot};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, ORCHESTRATOR};
pub use telemetry::{init_tracing, LogFormat};
pub use trace::{
    PendingEvent, TraceEvent, TraceKind, TraceRecorder, TraceScope, TraceSnapshot,
};
