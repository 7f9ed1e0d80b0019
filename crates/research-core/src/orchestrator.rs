//! Sequential research pipeline driver.
//!
//! `Orchestrator::run` walks the stage list (Planning -> Retrieving ->
//! Synthesizing by default), emitting a `start` trace event on entering each
//! state and an `end` event with the stage duration on leaving it. Any stage
//! error moves the run to `Failed`: an `error` event is recorded, nothing is
//! appended to the session, and the error is returned wrapped in
//! `StageFailure` with the stage name. Every event of a run carries the same
//! `run_id` attribute, which is also stored on the resulting record.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, Instrument};
use uuid::Uuid;

use research_tools::{Renderer, RetrievalTool};

use crate::agents::{
    PipelineStage, PipelineState, PlanningAgent, RetrievalAgent, RunContext, SynthesisAgent,
};
use crate::domain::{
    new_run_id, EngineConfig, PendingRecord, QueryRecord, ResearchError, Result,
};
use crate::evaluator::Evaluator;
use crate::memory::{topic_key, ContextWindow, MemoryBank, SessionStore};
use crate::metrics::Metrics;
use crate::obs;
use crate::trace::{PendingEvent, TraceRecorder, TraceScope};

pub const ORCHESTRATOR: &str = "Orchestrator";

/// Wires the shared stores, the collaborators and the stage list together.
pub struct OrchestratorBuilder {
    config: EngineConfig,
    retrieval: Arc<dyn RetrievalTool>,
    renderer: Option<Arc<dyn Renderer>>,
    sessions: Option<Arc<SessionStore>>,
    bank: Option<Arc<MemoryBank>>,
    trace: Option<Arc<TraceRecorder>>,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Share an existing session store (its own context window applies).
    pub fn sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn memory_bank(mut self, bank: Arc<MemoryBank>) -> Self {
        self.bank = Some(bank);
        self
    }

    pub fn trace(mut self, trace: Arc<TraceRecorder>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Validate the config and assemble the default three-stage pipeline.
    pub fn build(self) -> Result<Orchestrator> {
        self.config.validate()?;
        let config = self.config;

        let sessions = self.sessions.unwrap_or_else(|| {
            Arc::new(SessionStore::new(ContextWindow {
                size: config.context_window_size,
                excerpt_max_chars: config.excerpt_max_chars,
            }))
        });
        let bank = self.bank.unwrap_or_default();
        let trace = self.trace.unwrap_or_default();

        let metrics = Arc::new(Metrics::new());

        let mut synthesizer = SynthesisAgent::new(
            Arc::clone(&bank),
            config.synthesis_highlights,
            config.excerpt_max_chars,
        )
        .with_metrics(Arc::clone(&metrics));
        if let Some(renderer) = self.renderer {
            synthesizer = synthesizer.with_renderer(renderer);
        }

        let stages: Vec<Arc<dyn PipelineStage>> = vec![
            Arc::new(PlanningAgent::new(config.max_sub_queries)),
            Arc::new(RetrievalAgent::new(
                self.retrieval,
                config.default_retrieval_results,
            )),
            Arc::new(synthesizer),
        ];

        Ok(Orchestrator {
            config,
            sessions,
            bank,
            trace,
            stages,
            metrics,
        })
    }
}

/// Drives one query at a time through the stage list.
///
/// Cheap to share behind an `Arc`; concurrent `run` calls are safe.
pub struct Orchestrator {
    config: EngineConfig,
    sessions: Arc<SessionStore>,
    bank: Arc<MemoryBank>,
    trace: Arc<TraceRecorder>,
    stages: Vec<Arc<dyn PipelineStage>>,
    metrics: Arc<Metrics>,
}

impl Orchestrator {
    pub fn builder(retrieval: Arc<dyn RetrievalTool>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config: EngineConfig::default(),
            retrieval,
            renderer: None,
            sessions: None,
            bank: None,
            trace: None,
        }
    }

    /// Orchestrator with fresh stores and the given config.
    pub fn new(config: EngineConfig, retrieval: Arc<dyn RetrievalTool>) -> Result<Self> {
        Self::builder(retrieval).config(config).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn memory_bank(&self) -> &Arc<MemoryBank> {
        &self.bank
    }

    pub fn trace(&self) -> &Arc<TraceRecorder> {
        &self.trace
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Evaluator reading this orchestrator's stores.
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(
            Arc::clone(&self.sessions),
            Arc::clone(&self.bank),
            Arc::clone(&self.trace),
        )
    }

    /// Create a session under a freshly generated key.
    pub fn open_session(&self) -> String {
        self.sessions
            .create(&format!("session_{}", Uuid::new_v4().simple()))
    }

    /// States of the configured stages, in execution order.
    pub fn stage_states(&self) -> Vec<PipelineState> {
        self.stages.iter().map(|s| s.state()).collect()
    }

    /// Insert `stage` right after the stage in state `after`.
    ///
    /// Returns `false` (and leaves the pipeline unchanged) when no stage is
    /// in that state.
    pub fn insert_stage_after(
        &mut self,
        after: &PipelineState,
        stage: Arc<dyn PipelineStage>,
    ) -> bool {
        match self.stages.iter().position(|s| &s.state() == after) {
            Some(idx) => {
                self.stages.insert(idx + 1, stage);
                true
            }
            None => false,
        }
    }

    /// Answer `query` within `session_key`, creating the session if needed.
    pub async fn run(&self, query: &str, session_key: &str) -> Result<QueryRecord> {
        self.run_pipeline(query, session_key)
            .instrument(obs::run_span(session_key))
            .await
    }

    async fn run_pipeline(&self, query: &str, session_key: &str) -> Result<QueryRecord> {
        let run_id = new_run_id();
        let scope =
            TraceScope::new(Arc::clone(&self.trace), Some(session_key)).with_run(&run_id);

        let query = query.trim();
        if query.is_empty() {
            let err = ResearchError::InvalidQuery {
                reason: "query must not be empty".to_string(),
            };
            scope.emit(
                PendingEvent::error(ORCHESTRATOR)
                    .attr("stage", "Validation")
                    .attr("error", err.to_string()),
            );
            self.metrics.inc_runs_failed();
            obs::emit_run_failed(session_key, "Validation", &err);
            return Err(err);
        }

        obs::emit_run_started(session_key, query);
        let started = Instant::now();

        self.sessions.create(session_key);
        let context = match self.sessions.context_summary(session_key) {
            Ok(context) => context,
            Err(e) => {
                let stage = PipelineState::Planning.to_string();
                return Err(self.fail_run(&scope, ORCHESTRATOR, &stage, e, 0));
            }
        };
        let topic = topic_key(query, session_key, self.config.memory_scope);
        let mut ctx = RunContext::new(query, session_key, topic, context);

        for stage in &self.stages {
            let state = stage.state();
            let stage_name = state.to_string();
            let agent = stage.agent_name();
            debug!(state = %state, agent = %agent, "entering state");

            scope.emit(PendingEvent::start(agent).attr("stage", stage_name.as_str()));
            let stage_started = Instant::now();

            match stage.execute(&ctx, &scope).await {
                Ok(output) => {
                    let duration_ms = elapsed_ms(stage_started);
                    ctx.apply(output);
                    scope.emit(
                        PendingEvent::end(agent)
                            .attr("stage", stage_name.as_str())
                            .attr("duration_ms", duration_ms),
                    );
                    obs::emit_stage_finished(session_key, &stage_name, duration_ms);
                }
                Err(e) => {
                    if let ResearchError::NoResults { attempted } = e.root() {
                        self.metrics.add_sub_query_failures(*attempted as u64);
                    }
                    let duration_ms = elapsed_ms(stage_started);
                    return Err(self.fail_run(&scope, agent, &stage_name, e, duration_ms));
                }
            }
        }

        let completed = PipelineState::Completed.to_string();
        let Some(synthesis) = ctx.synthesis.take() else {
            let e = ResearchError::EmptySnippetSet {
                query: ctx.query.clone(),
            };
            return Err(self.fail_run(&scope, ORCHESTRATOR, &completed, e, 0));
        };
        self.metrics
            .add_sub_query_failures(ctx.failed_sub_queries as u64);

        let mut sources: Vec<String> = Vec::new();
        for snippet in &ctx.snippets {
            if !sources.contains(&snippet.source_id) {
                sources.push(snippet.source_id.clone());
            }
        }

        let pending = PendingRecord {
            run_id,
            query: ctx.query.clone(),
            topic: ctx.topic.clone(),
            sub_queries: ctx.sub_queries.clone(),
            findings: ctx
                .snippets
                .iter()
                .take(self.config.findings_retained)
                .map(|s| s.summary())
                .collect(),
            sources,
            answer: synthesis.text,
            source_count: synthesis.source_count,
            duration_ms: elapsed_ms(started),
        };

        let record = match self.sessions.append(session_key, pending) {
            Ok(record) => record,
            Err(e) => {
                let duration_ms = elapsed_ms(started);
                return Err(self.fail_run(&scope, ORCHESTRATOR, &completed, e, duration_ms));
            }
        };
        self.metrics.inc_runs_completed();
        debug!(state = %PipelineState::Completed, "run completed");
        obs::emit_run_finished(
            session_key,
            record.sequence,
            record.duration_ms,
            record.source_count,
        );
        Ok(record)
    }

    /// Record a failure in `stage`: one `error` event, the failed-run
    /// counter and a warn log. Returns the error wrapped with the stage.
    fn fail_run(
        &self,
        scope: &TraceScope,
        agent: &str,
        stage: &str,
        err: ResearchError,
        duration_ms: u64,
    ) -> ResearchError {
        scope.emit(
            PendingEvent::error(agent)
                .attr("stage", stage)
                .attr("error", err.to_string())
                .attr("duration_ms", duration_ms),
        );
        self.metrics.inc_runs_failed();
        let failed = PipelineState::Failed {
            stage: stage.to_string(),
        };
        debug!(state = %failed, "run failed");
        obs::emit_run_failed(scope.session_key().unwrap_or_default(), stage, &err);
        err.in_stage(stage)
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceKind;
    use research_tools::fakes::StubRetrieval;

    fn orchestrator(stub: StubRetrieval) -> Orchestrator {
        Orchestrator::new(EngineConfig::default(), Arc::new(stub)).unwrap()
    }

    #[test]
    fn test_default_stage_order() {
        let orch = orchestrator(StubRetrieval::new(1));
        assert_eq!(
            orch.stage_states(),
            vec![
                PipelineState::Planning,
                PipelineState::Retrieving,
                PipelineState::Synthesizing,
            ]
        );
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = EngineConfig {
            max_sub_queries: 0,
            ..EngineConfig::default()
        };
        let err = Orchestrator::new(config, Arc::new(StubRetrieval::new(1)))
            .err()
            .unwrap();
        assert!(matches!(err, ResearchError::Config(_)));
    }

    #[test]
    fn test_open_session_generates_distinct_keys() {
        let orch = orchestrator(StubRetrieval::new(1));
        let a = orch.open_session();
        let b = orch.open_session();
        assert_ne!(a, b);
        assert!(a.starts_with("session_"));
        assert!(orch.sessions().contains(&a));
    }

    #[tokio::test]
    async fn test_run_emits_start_and_end_per_stage() {
        let orch = orchestrator(StubRetrieval::new(2));
        orch.run("q", "s1").await.unwrap();

        let events = orch.trace().for_session("s1");
        let kinds: Vec<_> = events.iter().map(|e| (e.agent.as_str(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("PlanningAgent", TraceKind::Start),
                ("PlanningAgent", TraceKind::End),
                ("RetrievalAgent", TraceKind::Start),
                ("RetrievalAgent", TraceKind::End),
                ("SynthesisAgent", TraceKind::Start),
                ("SynthesisAgent", TraceKind::End),
            ]
        );
        assert!(events[1].attribute("duration_ms").is_some());
        assert_eq!(orch.metrics().snapshot().runs_completed, 1);
    }

    #[tokio::test]
    async fn test_blank_query_never_enters_a_stage() {
        let stub = Arc::new(StubRetrieval::new(2));
        let orch = Orchestrator::new(EngineConfig::default(), stub.clone()).unwrap();

        let err = orch.run("   ", "s1").await.unwrap_err();
        assert!(matches!(err, ResearchError::InvalidQuery { .. }));
        assert_eq!(stub.call_count(), 0);

        let events = orch.trace().all();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, TraceKind::Error);
        assert_eq!(events[0].agent, ORCHESTRATOR);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_failed_run_logs_stage() {
        let orch = orchestrator(StubRetrieval::failing());
        let _ = orch.run("q", "s-log").await;
        assert!(logs_contain("run.failed"));
        assert!(logs_contain("Retrieving"));
    }

    #[tokio::test]
    async fn test_record_keeps_retained_findings_and_distinct_sources() {
        let config = EngineConfig {
            findings_retained: 4,
            ..EngineConfig::default()
        };
        let orch = Orchestrator::new(config, Arc::new(StubRetrieval::new(3))).unwrap();
        let record = orch.run("topic", "s1").await.unwrap();

        assert_eq!(record.source_count, 9);
        assert_eq!(record.findings.len(), 4);
        assert_eq!(record.sources.len(), 9);
        assert_eq!(record.sub_queries.len(), 3);
        assert_eq!(record.topic, "topic");
    }
}
