//! Error types for research collaborators

use thiserror::Error;

/// Errors a collaborator can report for a single call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// The search backend rejected or failed the query
    #[error("Search failed for '{query}': {reason}")]
    SearchFailed { query: String, reason: String },

    /// The backend could not be reached at all
    #[error("Retrieval backend unavailable: {0}")]
    Unavailable(String),

    /// The request itself was malformed
    #[error("Invalid retrieval request: {0}")]
    InvalidRequest(String),
}

/// Result type for collaborator calls
pub type ToolResult<T> = std::result::Result<T, ToolError>;
