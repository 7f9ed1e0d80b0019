//! Trace event vocabulary: `TraceKind`, `AttributeValue`, `TraceEvent`, `PendingEvent`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened at a stage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Start,
    End,
    Error,
}

impl std::fmt::Display for TraceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TraceKind::Start => "start",
            TraceKind::End => "end",
            TraceKind::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Primitive attribute value carried on a trace event.
///
/// Serialized untagged, so the export reads as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{v}"),
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        AttributeValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        AttributeValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

/// Attribute map; ordered so exports are byte-stable.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Attribute naming the pipeline run an event belongs to.
pub const RUN_ID_ATTR: &str = "run_id";

/// An immutable, sequenced trace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    /// Global, strictly increasing across all sessions.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub kind: TraceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl TraceEvent {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn belongs_to(&self, session_key: &str) -> bool {
        self.session_key.as_deref() == Some(session_key)
    }

    pub fn run_id(&self) -> Option<&str> {
        self.attribute(RUN_ID_ATTR).and_then(|v| v.as_str())
    }
}

/// An event waiting for the recorder to assign its sequence and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub agent: String,
    pub kind: TraceKind,
    pub session_key: Option<String>,
    pub attributes: Attributes,
}

impl PendingEvent {
    pub fn new(agent: impl Into<String>, kind: TraceKind) -> Self {
        Self {
            agent: agent.into(),
            kind,
            session_key: None,
            attributes: Attributes::new(),
        }
    }

    pub fn start(agent: impl Into<String>) -> Self {
        Self::new(agent, TraceKind::Start)
    }

    pub fn end(agent: impl Into<String>) -> Self {
        Self::new(agent, TraceKind::End)
    }

    pub fn error(agent: impl Into<String>) -> Self {
        Self::new(agent, TraceKind::Error)
    }

    pub fn session(mut self, key: Option<&str>) -> Self {
        self.session_key = key.map(str::to_string);
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}
