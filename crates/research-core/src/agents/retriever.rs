//! Retrieval agent: runs each sub-query against the retrieval collaborator.
//!
//! Partial failure is tolerated. A failing sub-query contributes nothing and
//! leaves an `error` trace event; only a gather where every call failed is an
//! error.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use research_tools::{RetrievalTool, Snippet};

use super::stage::{PipelineStage, PipelineState, RunContext, StageOutput};
use crate::domain::{ResearchError, Result};
use crate::obs;
use crate::trace::{PendingEvent, TraceScope};

pub const RETRIEVAL_AGENT: &str = "RetrievalAgent";

/// Snippets plus how many sub-queries were absorbed as failures.
#[derive(Debug, Clone, PartialEq)]
pub struct GatherOutcome {
    pub snippets: Vec<Snippet>,
    pub failed: usize,
}

#[derive(Clone)]
pub struct RetrievalAgent {
    tool: Arc<dyn RetrievalTool>,
    max_results: usize,
}

impl std::fmt::Debug for RetrievalAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalAgent")
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

impl RetrievalAgent {
    pub fn new(tool: Arc<dyn RetrievalTool>, max_results: usize) -> Self {
        Self { tool, max_results }
    }

    /// Concatenated snippets in sub-query order.
    pub async fn gather(&self, sub_queries: &[String], scope: &TraceScope) -> Result<Vec<Snippet>> {
        Ok(self.gather_detailed(sub_queries, scope).await?.snippets)
    }

    /// Like [`gather`](Self::gather), also reporting absorbed failures.
    ///
    /// An empty `sub_queries` fails with `NoResults` without calling the tool.
    pub async fn gather_detailed(
        &self,
        sub_queries: &[String],
        scope: &TraceScope,
    ) -> Result<GatherOutcome> {
        if sub_queries.is_empty() {
            return Err(ResearchError::NoResults { attempted: 0 });
        }

        let mut snippets = Vec::new();
        let mut failed = 0;
        for (index, sub_query) in sub_queries.iter().enumerate() {
            match self.tool.search(sub_query, self.max_results).await {
                Ok(found) => {
                    debug!(sub_query = %sub_query, found = found.len(), "sub-query retrieved");
                    snippets.extend(found);
                }
                Err(e) => {
                    failed += 1;
                    obs::emit_sub_query_failed(scope.session_key(), sub_query, &e);
                    scope.emit(
                        PendingEvent::error(RETRIEVAL_AGENT)
                            .attr("operation", "search")
                            .attr("sub_query", sub_query.as_str())
                            .attr("index", index)
                            .attr("error", e.to_string()),
                    );
                }
            }
        }

        if failed == sub_queries.len() {
            return Err(ResearchError::NoResults { attempted: failed });
        }
        Ok(GatherOutcome { snippets, failed })
    }
}

#[async_trait]
impl PipelineStage for RetrievalAgent {
    fn state(&self) -> PipelineState {
        PipelineState::Retrieving
    }

    fn agent_name(&self) -> &str {
        RETRIEVAL_AGENT
    }

    async fn execute(&self, ctx: &RunContext, scope: &TraceScope) -> Result<StageOutput> {
        let outcome = self.gather_detailed(&ctx.sub_queries, scope).await?;
        Ok(StageOutput::Gathered {
            snippets: outcome.snippets,
            failed_sub_queries: outcome.failed,
        })
    }
}
