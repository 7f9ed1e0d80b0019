//! In-memory fakes for collaborator traits (testing only)
//!
//! Provides `StubRetrieval`, a scriptable `RetrievalTool` that records every
//! call and can be told which queries fail.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ToolError, ToolResult};
use crate::retrieval::{RetrievalTool, Snippet};

// ---------------------------------------------------------------------------
// StubRetrieval
// ---------------------------------------------------------------------------

/// Retrieval stub returning a fixed number of snippets per call.
///
/// `max_results` passed by the caller is ignored: the stub always returns
/// `per_query` snippets so tests can pin exact source counts.
#[derive(Debug)]
pub struct StubRetrieval {
    per_query: usize,
    fail_all: bool,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubRetrieval {
    /// Stub returning `per_query` snippets for every query.
    pub fn new(per_query: usize) -> Self {
        Self {
            per_query,
            fail_all: false,
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Stub whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new(0)
        }
    }

    /// Make calls for exactly `query` fail.
    pub fn fail_on(mut self, query: impl Into<String>) -> Self {
        self.failing.insert(query.into());
        self
    }

    /// Queries received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl RetrievalTool for StubRetrieval {
    async fn search(&self, text: &str, _max_results: usize) -> ToolResult<Vec<Snippet>> {
        self.calls.lock().push(text.to_string());

        if self.fail_all || self.failing.contains(text) {
            return Err(ToolError::SearchFailed {
                query: text.to_string(),
                reason: "stubbed failure".to_string(),
            });
        }

        Ok((0..self.per_query)
            .map(|i| Snippet {
                title: format!("{text} #{i}"),
                snippet: format!("stub finding {i} about {text}"),
                source_id: format!("stub://{text}/{i}"),
            })
            .collect())
    }
}
