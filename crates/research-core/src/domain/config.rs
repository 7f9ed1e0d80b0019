//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! Field names are snake_case; the camelCase spellings used by other tooling
//! (`contextWindowSize`, ...) are accepted as aliases.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors produced while loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Whether long-term memory is shared across sessions or kept per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryScope {
    #[default]
    Global,
    Session,
}

/// Tunables for the pipeline and the memory stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of most recent records included in a context summary.
    #[serde(alias = "contextWindowSize")]
    pub context_window_size: usize,
    /// Character cap for each summary excerpt and memory-bank excerpt.
    #[serde(alias = "excerptMaxChars")]
    pub excerpt_max_chars: usize,
    /// Upper bound on the planner's sub-query list.
    #[serde(alias = "maxSubQueries")]
    pub max_sub_queries: usize,
    /// `max_results` passed to the retrieval collaborator per sub-query.
    #[serde(alias = "defaultRetrievalResults")]
    pub default_retrieval_results: usize,
    /// Snippet summaries kept on each `QueryRecord`.
    #[serde(alias = "findingsRetained")]
    pub findings_retained: usize,
    /// Snippet summaries quoted in the synthesized text.
    #[serde(alias = "synthesisHighlights")]
    pub synthesis_highlights: usize,
    #[serde(alias = "memoryScope")]
    pub memory_scope: MemoryScope,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_window_size: 3,
            excerpt_max_chars: 200,
            max_sub_queries: 3,
            default_retrieval_results: 5,
            findings_retained: 5,
            synthesis_highlights: 3,
            memory_scope: MemoryScope::Global,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject values that would make the pipeline degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("context_window_size", self.context_window_size),
            ("excerpt_max_chars", self.excerpt_max_chars),
            ("max_sub_queries", self.max_sub_queries),
            ("default_retrieval_results", self.default_retrieval_results),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let c = EngineConfig::default();
        assert_eq!(c.context_window_size, 3);
        assert_eq!(c.excerpt_max_chars, 200);
        assert_eq!(c.max_sub_queries, 3);
        assert_eq!(c.default_retrieval_results, 5);
        assert_eq!(c.memory_scope, MemoryScope::Global);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let c = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(c, EngineConfig::default());
    }

    #[test]
    fn test_camel_case_aliases_are_accepted() {
        let c = EngineConfig::from_toml_str(
            "contextWindowSize = 5\nmaxSubQueries = 2\nmemory_scope = \"session\"\n",
        )
        .unwrap();
        assert_eq!(c.context_window_size, 5);
        assert_eq!(c.max_sub_queries, 2);
        assert_eq!(c.memory_scope, MemoryScope::Session);
        assert_eq!(c.excerpt_max_chars, 200);
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let err = EngineConfig::from_toml_str("context_window_size = 0").unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "context_window_size"),
            other => panic!("Expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = EngineConfig::from_toml_str("max_sub_queries = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "excerpt_max_chars = 80\n").unwrap();
        let c = EngineConfig::load(&path).unwrap();
        assert_eq!(c.excerpt_max_chars, 80);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = EngineConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
