//! End-to-end research pipeline tests.
//!
//! Drives the full planning → retrieval → synthesis pipeline against the
//! deterministic `StubRetrieval` and checks what lands in the session store,
//! the memory bank and the trace.

use std::sync::Arc;

use async_trait::async_trait;
use research_core::{
    EngineConfig, MemoryScope, Orchestrator, PipelineStage, PipelineState, ResearchError,
    RunContext, SessionStore, StageOutput, TraceKind, TraceScope, TraceSnapshot, ORCHESTRATOR,
};
use research_tools::fakes::StubRetrieval;

fn orchestrator_with(stub: Arc<StubRetrieval>) -> Orchestrator {
    Orchestrator::new(EngineConfig::default(), stub).unwrap()
}

#[tokio::test]
async fn test_first_query_counts_every_snippet() {
    let orch = orchestrator_with(Arc::new(StubRetrieval::new(5)));

    let record = orch.run("quantum error correction", "s1").await.unwrap();

    assert_eq!(record.sequence, 0);
    assert_eq!(record.source_count, 15);
    assert!(record
        .answer
        .starts_with("Based on 15 sources, the key insights are:"));
    assert_eq!(orch.sessions().len("s1").unwrap(), 1);
    assert_eq!(orch.memory_bank().size(), 1);
}

#[tokio::test]
async fn test_second_query_builds_on_first() {
    let orch = orchestrator_with(Arc::new(StubRetrieval::new(2)));

    orch.run("rust async runtimes", "s1").await.unwrap();
    let summary = orch.sessions().context_summary("s1").unwrap();
    assert!(summary.render().contains("rust async runtimes"));

    let second = orch.run("tokio scheduler design", "s1").await.unwrap();
    assert_eq!(second.sequence, 1);
    assert!(second
        .sub_queries
        .contains(&"tokio scheduler design in context of rust async runtimes".to_string()));
    assert!(second
        .answer
        .contains("Building on earlier research into: rust async runtimes"));

    let seqs: Vec<u64> = orch
        .sessions()
        .history("s1")
        .unwrap()
        .iter()
        .map(|r| r.sequence)
        .collect();
    assert_eq!(seqs, vec![0, 1]);
}

#[tokio::test]
async fn test_all_retrievals_failing_aborts_run() {
    let stub = Arc::new(StubRetrieval::failing());
    let orch = orchestrator_with(stub.clone());

    let err = orch.run("anything", "s1").await.unwrap_err();

    assert_eq!(err.stage(), Some("Retrieving"));
    assert!(matches!(err.root(), ResearchError::NoResults { attempted: 3 }));
    assert_eq!(stub.call_count(), 3);
    assert_eq!(orch.sessions().len("s1").unwrap(), 0);
    assert_eq!(orch.memory_bank().size(), 0);

    let errors = orch
        .trace()
        .for_session("s1")
        .into_iter()
        .filter(|e| e.kind == TraceKind::Error)
        .count();
    assert!(errors >= 3, "expected >= 3 error events, got {errors}");

    let metrics = orch.metrics().snapshot();
    assert_eq!(metrics.runs_failed, 1);
    assert_eq!(metrics.sub_query_failures, 3);
}

#[tokio::test]
async fn test_partial_retrieval_failure_is_absorbed() {
    let stub = Arc::new(StubRetrieval::new(4).fail_on("edge ai latest developments"));
    let orch = orchestrator_with(stub);

    let record = orch.run("edge ai", "s1").await.unwrap();

    assert_eq!(record.source_count, 8);
    assert_eq!(orch.metrics().snapshot().sub_query_failures, 1);
    let retrieval_errors: Vec<_> = orch
        .trace()
        .for_session("s1")
        .into_iter()
        .filter(|e| e.kind == TraceKind::Error && e.agent == "RetrievalAgent")
        .collect();
    assert_eq!(retrieval_errors.len(), 1);
}

#[tokio::test]
async fn test_evaluation_after_runs() {
    let orch = orchestrator_with(Arc::new(StubRetrieval::new(1)));
    for q in ["first topic", "second topic", "first topic"] {
        orch.run(q, "s1").await.unwrap();
    }

    let report = orch.evaluator().evaluate("s1").unwrap();
    assert_eq!(report.session_id, "s1");
    assert_eq!(report.total_queries, 3);
    assert_eq!(report.total_tasks_completed, 9);
    assert_eq!(report.memory_entries, 2);

    let breakdown = orch.evaluator().stage_breakdown("s1").unwrap();
    let agents: Vec<_> = breakdown.iter().map(|s| s.agent.as_str()).collect();
    assert_eq!(agents, vec!["PlanningAgent", "RetrievalAgent", "SynthesisAgent"]);
    assert!(breakdown.iter().all(|s| s.runs == 3));
}

#[tokio::test]
async fn test_repeated_topic_recalls_previous_insight() {
    let orch = orchestrator_with(Arc::new(StubRetrieval::new(1)));
    orch.run("Solid State Batteries", "s1").await.unwrap();
    let again = orch.run("solid   state batteries", "s2").await.unwrap();

    assert!(again.answer.contains("Previous insights: "));
    assert_eq!(orch.memory_bank().size(), 1);
    assert_eq!(
        orch.memory_bank()
            .entry("solid state batteries")
            .unwrap()
            .excerpts
            .len(),
        2
    );
}

#[tokio::test]
async fn test_session_memory_scope_isolates_topics() {
    let config = EngineConfig {
        memory_scope: MemoryScope::Session,
        ..EngineConfig::default()
    };
    let orch = Orchestrator::new(config, Arc::new(StubRetrieval::new(1))).unwrap();

    orch.run("graph databases", "alpha").await.unwrap();
    let other = orch.run("graph databases", "beta").await.unwrap();

    assert!(!other.answer.contains("Previous insights"));
    assert_eq!(
        orch.memory_bank().topics(),
        vec![
            "alpha::graph databases".to_string(),
            "beta::graph databases".to_string(),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_get_dense_sequences() {
    let orch = Arc::new(orchestrator_with(Arc::new(StubRetrieval::new(2))));
    let key = orch.open_session();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let orch = Arc::clone(&orch);
            let key = key.clone();
            tokio::spawn(async move { orch.run(&format!("query {i}"), &key).await })
        })
        .collect();
    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let mut seqs: Vec<u64> = orch
        .sessions()
        .history(&key)
        .unwrap()
        .iter()
        .map(|r| r.sequence)
        .collect();
    let in_order = seqs.clone();
    seqs.sort_unstable();
    assert_eq!(seqs, in_order, "history must be ordered by sequence");
    assert_eq!(seqs, (0..16).collect::<Vec<u64>>());

    let trace_seqs: Vec<u64> = orch.trace().all().iter().map(|e| e.sequence).collect();
    assert_eq!(trace_seqs, (0..trace_seqs.len() as u64).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_trace_export_reimports_identically() {
    let orch = orchestrator_with(Arc::new(StubRetrieval::new(2)));
    orch.run("export me", "s1").await.unwrap();
    let _ = orch.run("  ", "s1").await;

    let snapshot = orch.trace().export_snapshot();
    let json = snapshot.to_json().unwrap();
    let restored = TraceSnapshot::from_json(&json).unwrap();

    assert_eq!(restored.events, orch.trace().all());
    assert_eq!(
        restored.content_digest().unwrap(),
        snapshot.content_digest().unwrap()
    );
}

/// Appends a note after synthesis without touching the existing agents.
struct VerificationStage;

#[async_trait]
impl PipelineStage for VerificationStage {
    fn state(&self) -> PipelineState {
        PipelineState::custom("Verifying")
    }

    fn agent_name(&self) -> &str {
        "VerificationAgent"
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        _scope: &TraceScope,
    ) -> research_core::Result<StageOutput> {
        let verified = ctx
            .synthesis
            .as_ref()
            .map(|s| s.source_count > 0)
            .unwrap_or(false);
        Ok(StageOutput::Annotated {
            label: "verified".to_string(),
            detail: verified.to_string(),
        })
    }
}

#[tokio::test]
async fn test_custom_stage_runs_after_synthesis() {
    let mut orch = orchestrator_with(Arc::new(StubRetrieval::new(1)));
    assert!(orch.insert_stage_after(&PipelineState::Synthesizing, Arc::new(VerificationStage)));
    assert!(!orch.insert_stage_after(
        &PipelineState::custom("Missing"),
        Arc::new(VerificationStage)
    ));
    assert_eq!(
        orch.stage_states().last(),
        Some(&PipelineState::custom("Verifying"))
    );

    orch.run("pluggable stages", "s1").await.unwrap();

    let last = orch.trace().for_session("s1").pop().unwrap();
    assert_eq!(last.agent, "VerificationAgent");
    assert_eq!(last.kind, TraceKind::End);
    assert_eq!(
        last.attribute("stage").and_then(|v| v.as_str()),
        Some("Verifying")
    );
    assert_eq!(orch.evaluator().evaluate("s1").unwrap().total_tasks_completed, 4);
}

#[tokio::test]
async fn test_failed_run_adds_no_completed_tasks() {
    let stub = StubRetrieval::new(1)
        .fail_on("bad")
        .fail_on("bad in context of good")
        .fail_on("bad latest developments");
    let orch = orchestrator_with(Arc::new(stub));

    orch.run("good", "s1").await.unwrap();
    let err = orch.run("bad", "s1").await.unwrap_err();
    assert_eq!(err.stage(), Some("Retrieving"));

    let report = orch.evaluator().evaluate("s1").unwrap();
    assert_eq!(report.total_queries, 1);
    assert_eq!(report.total_tasks_completed, 3);
    assert!(orch
        .evaluator()
        .stage_breakdown("s1")
        .unwrap()
        .iter()
        .all(|s| s.runs == 1));

    orch.sessions().clear("s1").unwrap();
    let report = orch.evaluator().evaluate("s1").unwrap();
    assert_eq!(report.total_queries, 0);
    assert_eq!(report.total_tasks_completed, 0);
}

#[tokio::test]
async fn test_every_event_of_a_run_shares_the_record_run_id() {
    let orch = orchestrator_with(Arc::new(StubRetrieval::new(1)));
    let record = orch.run("run ids", "s1").await.unwrap();

    let events = orch.trace().for_session("s1");
    assert_eq!(events.len(), 6);
    assert!(events
        .iter()
        .all(|e| e.run_id() == Some(record.run_id.as_str())));
}

/// Drops the session before the orchestrator can append to it.
struct SessionDropper {
    sessions: Arc<SessionStore>,
}

#[async_trait]
impl PipelineStage for SessionDropper {
    fn state(&self) -> PipelineState {
        PipelineState::custom("Verifying")
    }

    fn agent_name(&self) -> &str {
        "SessionDropper"
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        _scope: &TraceScope,
    ) -> research_core::Result<StageOutput> {
        self.sessions.remove(&ctx.session_key)?;
        Ok(StageOutput::Annotated {
            label: "dropped".to_string(),
            detail: ctx.session_key.clone(),
        })
    }
}

#[tokio::test]
async fn test_append_failure_is_traced_and_counted() {
    let mut orch = orchestrator_with(Arc::new(StubRetrieval::new(1)));
    let sessions = Arc::clone(orch.sessions());
    assert!(orch.insert_stage_after(
        &PipelineState::Synthesizing,
        Arc::new(SessionDropper { sessions })
    ));

    let err = orch.run("vanishing session", "s1").await.unwrap_err();

    assert_eq!(err.stage(), Some("Completed"));
    assert!(matches!(err.root(), ResearchError::UnknownSession { .. }));

    let errors: Vec<_> = orch
        .trace()
        .for_session("s1")
        .into_iter()
        .filter(|e| e.kind == TraceKind::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].agent, ORCHESTRATOR);

    let metrics = orch.metrics().snapshot();
    assert_eq!(metrics.runs_failed, 1);
    assert_eq!(metrics.runs_completed, 0);
    assert_eq!(metrics.memory_writes, orch.memory_bank().size() as u64);
    assert!(!orch.sessions().contains("s1"));
}
