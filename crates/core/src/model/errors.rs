use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use waterfall_protocol::SharedStr;

use super::span::SpanId;

/// An error event associated with a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceError {
    pub event_id: SharedStr,
    pub title: SharedStr,
    #[serde(default)]
    pub level: Option<SharedStr>,
}

/// Error events keyed by the span they occurred in. The flattener never
/// looks at this; it is handed straight to the row renderer.
#[derive(Debug, Clone, Default)]
pub struct SpanErrors {
    by_span: HashMap<SpanId, Vec<TraceError>>,
}

impl SpanErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, span_id: SpanId, error: TraceError) {
        self.by_span.entry(span_id).or_default().push(error);
    }

    pub fn for_span(&self, span_id: &str) -> &[TraceError] {
        self.by_span.get(span_id).map_or(&[], Vec::as_slice)
    }

    pub fn has_errors(&self, span_id: &str) -> bool {
        !self.for_span(span_id).is_empty()
    }

    /// Total number of error events.
    pub fn len(&self) -> usize {
        self.by_span.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_span.is_empty()
    }
}
