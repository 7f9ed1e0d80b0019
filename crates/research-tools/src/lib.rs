//! Research Tools: collaborator contracts for the research agent engine
//!
//! The engine treats retrieval and rendering as external collaborators with a
//! narrow contract. This crate defines those contracts and ships a simulated
//! web search plus in-memory fakes for tests.
//!
//! ## Key Components
//!
//! - `RetrievalTool`: query text in, ordered `Snippet`s out
//! - `Renderer`: final formatting of a synthesized answer
//! - `SimulatedWebSearch`: deterministic stand-in for a real search API
//! - `fakes::StubRetrieval`: scriptable retrieval for tests

mod error;
pub mod fakes;
pub mod retrieval;

pub use error::{ToolError, ToolResult};
pub use retrieval::{PlainRenderer, Renderer, RetrievalTool, SimulatedWebSearch, Snippet};
