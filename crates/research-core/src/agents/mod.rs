//! Role-specialized research agents.
//!
//! # Module layout
//!
//! - [`stage`]: `PipelineStage`, `PipelineState`, `RunContext`, `StageOutput`
//! - [`planner`]: `PlanningAgent`
//! - [`retriever`]: `RetrievalAgent`, `GatherOutcome`
//! - [`synthesizer`]: `SynthesisAgent`

pub mod planner;
pub mod retriever;
pub mod stage;
pub mod synthesizer;

pub use planner::{PlanningAgent, PLANNING_AGENT};
pub use retriever::{GatherOutcome, RetrievalAgent, RETRIEVAL_AGENT};
pub use stage::{PipelineStage, PipelineState, RunContext, StageOutput, SynthesisResult};
pub use synthesizer::{SynthesisAgent, SYNTHESIS_AGENT};
