//! Domain types shared across the engine: records, configuration, errors.

pub mod config;
pub mod error;
pub mod record;
pub mod text;

pub use config::{ConfigError, EngineConfig, MemoryScope};
pub use error::{ResearchError, Result};
pub use record::{new_run_id, PendingRecord, QueryRecord};
pub use text::{excerpt, normalize_topic};
