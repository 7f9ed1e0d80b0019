//! Collaborator trait definitions
//!
//! These traits define the two seams the engine calls out through:
//! - `RetrievalTool`: one search call per sub-query
//! - `Renderer`: formatting applied to the synthesized text
//!
//! Retrieval is async and backend-agnostic. Timeouts are the backend's
//! responsibility; the engine never cancels a call it has started.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ToolError, ToolResult};

// ---------------------------------------------------------------------------
// Snippet
// ---------------------------------------------------------------------------

/// A single candidate source returned by a retrieval call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub title: String,
    pub snippet: String,
    /// Stable identifier of the source (usually a URL)
    pub source_id: String,
}

impl Snippet {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            source_id: source_id.into(),
        }
    }

    /// One-line finding in `"title: snippet"` form.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.title, self.snippet)
    }
}

// ---------------------------------------------------------------------------
// RetrievalTool
// ---------------------------------------------------------------------------

/// Query-to-snippets retrieval backend.
///
/// Guarantees expected by the engine:
/// - results come back in the backend's ranking order
/// - at most `max_results` snippets per call
/// - each call may fail independently of the others
#[async_trait]
pub trait RetrievalTool: Send + Sync {
    /// Search for `text`, returning at most `max_results` snippets.
    async fn search(&self, text: &str, max_results: usize) -> ToolResult<Vec<Snippet>>;
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Final formatting step applied to a synthesized answer.
pub trait Renderer: Send + Sync {
    fn render(&self, text: String) -> String;
}

/// Identity renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render(&self, text: String) -> String {
        text
    }
}

// ---------------------------------------------------------------------------
// SimulatedWebSearch
// ---------------------------------------------------------------------------

/// Deterministic web search stand-in.
///
/// Produces `max_results` structured results per query without touching the
/// network, so demos and tests behave identically on every run.
#[derive(Debug, Clone, Default)]
pub struct SimulatedWebSearch {
    base_url: Option<String>,
}

impl SimulatedWebSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different host for generated source ids.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or("https://example.com")
    }
}

#[async_trait]
impl RetrievalTool for SimulatedWebSearch {
    async fn search(&self, text: &str, max_results: usize) -> ToolResult<Vec<Snippet>> {
        if text.trim().is_empty() {
            return Err(ToolError::InvalidRequest(
                "search text must not be empty".to_string(),
            ));
        }
        debug!(query = %text, max_results, "simulated search");

        let results = (1..=max_results)
            .map(|i| Snippet {
                title: format!("Research Result {i} for: {text}"),
                snippet: format!(
                    "This source provides information about {text}. Key findings include relevant data points and analysis."
                ),
                source_id: format!("{}/result{i}", self.base_url()),
            })
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_summary_joins_title_and_text() {
        let s = Snippet::new("Title", "body text", "src-1");
        assert_eq!(s.summary(), "Title: body text");
    }

    #[test]
    fn test_plain_renderer_is_identity() {
        let out = PlainRenderer.render("unchanged".to_string());
        assert_eq!(out, "unchanged");
    }

    #[tokio::test]
    async fn test_simulated_search_returns_requested_count() {
        let tool = SimulatedWebSearch::new();
        let results = tool.search("quantum computing", 5).await.unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].title, "Research Result 1 for: quantum computing");
        assert_eq!(results[4].source_id, "https://example.com/result5");
    }

    #[tokio::test]
    async fn test_simulated_search_is_deterministic() {
        let tool = SimulatedWebSearch::new().with_base_url("https://docs.test");
        let a = tool.search("rust", 3).await.unwrap();
        let b = tool.search("rust", 3).await.unwrap();
        assert_eq!(a, b);
        assert!(a[0].source_id.starts_with("https://docs.test/"));
    }

    #[tokio::test]
    async fn test_simulated_search_rejects_blank_query() {
        let tool = SimulatedWebSearch::new();
        let err = tool.search("   ", 3).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidRequest(_)));
    }
}
