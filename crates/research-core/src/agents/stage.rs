//! Stage contract shared by every agent in the pipeline.
//!
//! Each agent implements [`PipelineStage`]: it reads the per-run
//! [`RunContext`] and returns a tagged [`StageOutput`], which the orchestrator
//! folds back into the context. New stages can be inserted into the
//! orchestrator's list without touching the existing agents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use research_tools::Snippet;

use crate::domain::Result;
use crate::memory::ContextSummary;
use crate::trace::TraceScope;

/// Pipeline state machine positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Planning,
    Retrieving,
    Synthesizing,
    /// A caller-supplied stage.
    Custom { name: String },
    Completed,
    Failed { stage: String },
}

impl PipelineState {
    pub fn custom(name: impl Into<String>) -> Self {
        PipelineState::Custom { name: name.into() }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed { .. })
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Planning => write!(f, "Planning"),
            PipelineState::Retrieving => write!(f, "Retrieving"),
            PipelineState::Synthesizing => write!(f, "Synthesizing"),
            PipelineState::Custom { name } => write!(f, "{name}"),
            PipelineState::Completed => write!(f, "Completed"),
            PipelineState::Failed { stage } => write!(f, "Failed({stage})"),
        }
    }
}

/// Answer produced by the synthesis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub text: String,
    pub source_count: usize,
}

/// Typed output of a completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutput {
    Planned {
        sub_queries: Vec<String>,
    },
    Gathered {
        snippets: Vec<Snippet>,
        /// Sub-queries whose retrieval call failed and was absorbed.
        failed_sub_queries: usize,
    },
    Synthesized(SynthesisResult),
    /// Free-form note from an extension stage.
    Annotated { label: String, detail: String },
}

/// Working state of one run, threaded through the stages.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub query: String,
    pub session_key: String,
    pub topic: String,
    /// Summary of the session *before* this run.
    pub context: ContextSummary,
    pub sub_queries: Vec<String>,
    pub snippets: Vec<Snippet>,
    pub failed_sub_queries: usize,
    pub synthesis: Option<SynthesisResult>,
    pub annotations: Vec<(String, String)>,
}

impl RunContext {
    pub fn new(
        query: impl Into<String>,
        session_key: impl Into<String>,
        topic: impl Into<String>,
        context: ContextSummary,
    ) -> Self {
        Self {
            query: query.into(),
            session_key: session_key.into(),
            topic: topic.into(),
            context,
            sub_queries: Vec::new(),
            snippets: Vec::new(),
            failed_sub_queries: 0,
            synthesis: None,
            annotations: Vec::new(),
        }
    }

    /// Fold a stage's output into the context.
    pub fn apply(&mut self, output: StageOutput) {
        match output {
            StageOutput::Planned { sub_queries } => self.sub_queries = sub_queries,
            StageOutput::Gathered {
                snippets,
                failed_sub_queries,
            } => {
                self.snippets = snippets;
                self.failed_sub_queries = failed_sub_queries;
            }
            StageOutput::Synthesized(result) => self.synthesis = Some(result),
            StageOutput::Annotated { label, detail } => self.annotations.push((label, detail)),
        }
    }
}

/// A single step of the research pipeline.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// State the orchestrator is in while this stage runs.
    fn state(&self) -> PipelineState;

    /// Agent name recorded on this stage's trace events.
    fn agent_name(&self) -> &str;

    async fn execute(&self, ctx: &RunContext, scope: &TraceScope) -> Result<StageOutput>;
}
