use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use waterfall_protocol::SharedStr;

/// Span identifiers are opaque strings (usually 16 hex digits).
pub type SpanId = SharedStr;

/// Label carried by every synthetic gap span.
pub const GAP_DESCRIPTION: &str = "Missing instrumentation";

/// How a span came into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanKind {
    /// Reported by the instrumented application.
    Raw,
    /// The node wrapping the whole trace.
    Root,
    /// An idle interval between two siblings, inserted by the flattener.
    Gap,
}

/// A single timed operation in a trace tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub trace_id: SharedStr,
    /// Start time in fractional seconds.
    pub start_timestamp: f64,
    /// End time in fractional seconds.
    pub timestamp: f64,
    /// Operation / category label, e.g. `db.query` or `http.client`.
    pub op: Option<SharedStr>,
    pub description: Option<SharedStr>,
    pub status: Option<SharedStr>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Arbitrary metadata, passed through untouched.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    pub kind: SpanKind,
    /// Attached to the root because its own parent was not found in the trace.
    #[serde(default)]
    pub is_orphan: bool,
}

impl Span {
    /// A bare raw span; the remaining fields start out empty.
    pub fn new(
        span_id: impl Into<SpanId>,
        parent_span_id: Option<SpanId>,
        start_timestamp: f64,
        timestamp: f64,
    ) -> Self {
        Self {
            span_id: span_id.into(),
            parent_span_id,
            trace_id: SharedStr::from(""),
            start_timestamp,
            timestamp,
            op: None,
            description: None,
            status: None,
            tags: BTreeMap::new(),
            data: serde_json::Map::new(),
            kind: SpanKind::Raw,
            is_orphan: false,
        }
    }

    /// The synthetic gap covering `[start, end]`, inserted before `next`.
    pub fn gap(next: &Span, start: f64, end: f64) -> Self {
        Self {
            span_id: SpanId::from(format!("gap-{}", next.span_id)),
            parent_span_id: next.parent_span_id.clone(),
            trace_id: next.trace_id.clone(),
            start_timestamp: start,
            timestamp: end,
            op: None,
            description: Some(SharedStr::from(GAP_DESCRIPTION)),
            status: None,
            tags: BTreeMap::new(),
            data: serde_json::Map::new(),
            kind: SpanKind::Gap,
            is_orphan: next.is_orphan,
        }
    }

    pub fn with_op(mut self, op: impl Into<SharedStr>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<SharedStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn duration(&self) -> f64 {
        self.timestamp - self.start_timestamp
    }

    pub fn is_gap(&self) -> bool {
        self.kind == SpanKind::Gap
    }

    pub fn is_root(&self) -> bool {
        self.kind == SpanKind::Root
    }

    /// Display label: op and description joined by a dash, falling back to
    /// whichever is set.
    pub fn label(&self) -> String {
        match (&self.op, &self.description) {
            (Some(op), Some(desc)) => format!("{op} \u{2014} {desc}"),
            (Some(op), None) => op.to_string(),
            (None, Some(desc)) => desc.to_string(),
            (None, None) => self.span_id.to_string(),
        }
    }
}

/// One ancestor level of connector state for a rendered row.
///
/// A marker at depth `d` means the vertical connector at level `d` continues
/// past this row because a later sibling at that level is still to come.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeDepth {
    Plain(u32),
    /// The sibling chain at this level hangs off the root without a confirmed
    /// parent link; renderers draw it dashed.
    Orphan(u32),
}

impl TreeDepth {
    pub fn for_span(span: &Span, depth: u32) -> Self {
        if span.is_orphan {
            Self::Orphan(depth)
        } else {
            Self::Plain(depth)
        }
    }

    pub fn depth(self) -> u32 {
        match self {
            Self::Plain(d) | Self::Orphan(d) => d,
        }
    }

    pub fn is_orphan(self) -> bool {
        matches!(self, Self::Orphan(_))
    }
}
