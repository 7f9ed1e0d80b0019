//! Error taxonomy for the research engine.

use crate::domain::config::ConfigError;
use crate::trace::TraceError;

/// Errors produced by the pipeline, the memory stores and the evaluator.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("unknown session: {key}")]
    UnknownSession { key: String },

    #[error("no results: all {attempted} sub-queries failed")]
    NoResults { attempted: usize },

    #[error("nothing to synthesize for '{query}': no snippets and no prior context")]
    EmptySnippetSet { query: String },

    #[error("stage {stage} failed: {source}")]
    StageFailure {
        stage: String,
        #[source]
        source: Box<ResearchError>,
    },

    #[error("trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ResearchError {
    /// Wrap `self` with the name of the stage it escaped from.
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        ResearchError::StageFailure {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// Stage name for a `StageFailure`, `None` otherwise.
    pub fn stage(&self) -> Option<&str> {
        match self {
            ResearchError::StageFailure { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// The innermost error, unwrapping any `StageFailure` layers.
    pub fn root(&self) -> &ResearchError {
        match self {
            ResearchError::StageFailure { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for research engine operations.
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure_exposes_stage_and_root() {
        let err = ResearchError::NoResults { attempted: 3 }.in_stage("Retrieving");
        assert_eq!(err.stage(), Some("Retrieving"));
        assert!(matches!(err.root(), ResearchError::NoResults { attempted: 3 }));

        let msg = err.to_string();
        assert!(msg.contains("Retrieving"));
        assert!(msg.contains("all 3 sub-queries failed"));
    }

    #[test]
    fn test_plain_error_has_no_stage() {
        let err = ResearchError::UnknownSession {
            key: "s9".to_string(),
        };
        assert_eq!(err.stage(), None);
        assert!(err.to_string().contains("s9"));
        assert!(matches!(err.root(), ResearchError::UnknownSession { .. }));
    }
}
