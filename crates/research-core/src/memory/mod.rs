//! Memory subsystem: session history, context compaction, long-term memory.
//!
//! Session history is an arena of immutable `QueryRecord`s per session key;
//! the context summary is a pure function over its tail. The memory bank
//! accumulates synthesis excerpts per topic across sessions.

pub mod bank;
pub mod context;
pub mod session;

pub use bank::{topic_key, MemoryBank, MemoryEntry, MemoryExcerpt};
pub use context::{ContextEntry, ContextSummary, ContextWindow};
pub use session::SessionStore;
