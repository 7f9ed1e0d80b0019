//! Structured event trace for every stage transition.
//!
//! # Module layout
//!
//! - [`event`]: `TraceEvent`, `TraceKind`, `AttributeValue`, `PendingEvent`
//! - [`recorder`]: `TraceRecorder`, `TraceScope`, `TraceSnapshot`, `TraceError`

pub mod event;
pub mod recorder;

pub use event::{
    AttributeValue, Attributes, PendingEvent, TraceEvent, TraceKind, RUN_ID_ATTR,
};
pub use recorder::{TraceError, TraceRecorder, TraceResult, TraceScope, TraceSnapshot};
