//! Planning agent: query + session context -> ordered sub-queries.

use async_trait::async_trait;

use super::stage::{PipelineStage, PipelineState, RunContext, StageOutput};
use crate::domain::{ResearchError, Result};
use crate::memory::ContextSummary;
use crate::trace::TraceScope;

pub const PLANNING_AGENT: &str = "PlanningAgent";

/// Builds a research plan. Deterministic: same inputs, same plan.
#[derive(Debug, Clone)]
pub struct PlanningAgent {
    max_sub_queries: usize,
}

impl PlanningAgent {
    pub fn new(max_sub_queries: usize) -> Self {
        Self {
            max_sub_queries: max_sub_queries.max(1),
        }
    }

    /// Plan sub-queries for `query`.
    ///
    /// The raw query always comes first. With prior context, a variant tying
    /// the query to the most recent different prior query follows it, then
    /// the generic variants, cut to `max_sub_queries`.
    pub fn plan(&self, query: &str, context: &ContextSummary) -> Result<Vec<String>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResearchError::InvalidQuery {
                reason: "query must not be empty".to_string(),
            });
        }

        let mut plan = vec![query.to_string()];
        if let Some(prior) = context
            .recent_queries()
            .map(str::trim)
            .find(|q| !q.eq_ignore_ascii_case(query))
        {
            plan.push(format!("{query} in context of {prior}"));
        }
        plan.push(format!("{query} latest developments"));
        plan.push(format!("{query} expert analysis"));

        plan.truncate(self.max_sub_queries);
        Ok(plan)
    }
}

impl Default for PlanningAgent {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl PipelineStage for PlanningAgent {
    fn state(&self) -> PipelineState {
        PipelineState::Planning
    }

    fn agent_name(&self) -> &str {
        PLANNING_AGENT
    }

    async fn execute(&self, ctx: &RunContext, _scope: &TraceScope) -> Result<StageOutput> {
        let sub_queries = self.plan(&ctx.query, &ctx.context)?;
        Ok(StageOutput::Planned { sub_queries })
    }
}
