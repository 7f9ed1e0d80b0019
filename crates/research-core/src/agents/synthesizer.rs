//! Synthesis agent: snippets + session context + long-term memory -> answer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use research_tools::{PlainRenderer, Renderer, Snippet};

use super::stage::{PipelineStage, PipelineState, RunContext, StageOutput, SynthesisResult};
use crate::domain::text::excerpt;
use crate::domain::{ResearchError, Result};
use crate::memory::{ContextSummary, MemoryBank};
use crate::metrics::Metrics;
use crate::trace::TraceScope;

pub const SYNTHESIS_AGENT: &str = "SynthesisAgent";

#[derive(Clone)]
pub struct SynthesisAgent {
    bank: Arc<MemoryBank>,
    renderer: Arc<dyn Renderer>,
    highlights: usize,
    excerpt_max_chars: usize,
    metrics: Option<Arc<Metrics>>,
}

impl std::fmt::Debug for SynthesisAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisAgent")
            .field("highlights", &self.highlights)
            .field("excerpt_max_chars", &self.excerpt_max_chars)
            .finish_non_exhaustive()
    }
}

impl SynthesisAgent {
    pub fn new(bank: Arc<MemoryBank>, highlights: usize, excerpt_max_chars: usize) -> Self {
        Self {
            bank,
            renderer: Arc::new(PlainRenderer),
            highlights,
            excerpt_max_chars,
            metrics: None,
        }
    }

    /// Count every memory-bank write in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Produce an answer and remember an excerpt of it under `topic`.
    ///
    /// The renderer only sees the findings body; the context and
    /// previous-insight lines are appended after rendering.
    ///
    /// Falls back to context-only text when `snippets` is empty; fails with
    /// `EmptySnippetSet` only when there is no context either.
    pub fn synthesize(
        &self,
        query: &str,
        snippets: &[Snippet],
        context: &ContextSummary,
        topic: &str,
    ) -> Result<SynthesisResult> {
        if snippets.is_empty() && context.is_empty() {
            return Err(ResearchError::EmptySnippetSet {
                query: query.to_string(),
            });
        }

        // Read before this run's own excerpt lands in the bank.
        let past_insights = self.bank.recall(topic);

        let body = if snippets.is_empty() {
            format!("No new sources were found for '{}'.\n", query.trim())
        } else {
            let mut body = format!(
                "Based on {} sources, the key insights are:\n",
                snippets.len()
            );
            for (i, snippet) in snippets.iter().take(self.highlights).enumerate() {
                body.push_str(&format!("{}. {}\n", i + 1, snippet.summary()));
            }
            body
        };

        let mut text = self.renderer.render(body);
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }

        if !context.is_empty() {
            let earlier: Vec<&str> = context.entries.iter().map(|e| e.query.as_str()).collect();
            text.push_str(&format!(
                "Building on earlier research into: {}\n",
                earlier.join("; ")
            ));
        }

        if let Some(first) = past_insights.first() {
            text.push_str(&format!("Previous insights: {first}\n"));
        }

        self.bank.remember(topic, excerpt(&text, self.excerpt_max_chars));
        if let Some(metrics) = &self.metrics {
            metrics.inc_memory_writes();
        }
        debug!(topic = %topic, output_length = text.len(), "synthesis completed");

        Ok(SynthesisResult {
            text,
            source_count: snippets.len(),
        })
    }
}

#[async_trait]
impl PipelineStage for SynthesisAgent {
    fn state(&self) -> PipelineState {
        PipelineState::Synthesizing
    }

    fn agent_name(&self) -> &str {
        SYNTHESIS_AGENT
    }

    async fn execute(&self, ctx: &RunContext, _scope: &TraceScope) -> Result<StageOutput> {
        let result = self.synthesize(&ctx.query, &ctx.snippets, &ctx.context, &ctx.topic)?;
        Ok(StageOutput::Synthesized(result))
    }
}
