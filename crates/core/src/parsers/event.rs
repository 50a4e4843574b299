use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use waterfall_protocol::SharedStr;

use crate::model::{Span, SpanId, Trace};

/// Id given to the root synthesized for a bare span list.
pub const SYNTHETIC_ROOT_ID: &str = "root";

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no timestamps on the event or any of its spans")]
    MissingTimestamps,
}

/// Raw span as found in a transaction's `spans` array.
#[derive(Debug, Deserialize)]
struct RawSpan {
    span_id: SharedStr,
    #[serde(default)]
    parent_span_id: Option<SharedStr>,
    #[serde(default)]
    trace_id: Option<SharedStr>,
    start_timestamp: f64,
    timestamp: f64,
    #[serde(default)]
    op: Option<SharedStr>,
    #[serde(default)]
    description: Option<SharedStr>,
    #[serde(default)]
    status: Option<SharedStr>,
    #[serde(default)]
    tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    data: Option<serde_json::Map<String, serde_json::Value>>,
}

impl RawSpan {
    fn into_span(self, default_trace_id: &SharedStr) -> Span {
        let mut span = Span::new(
            self.span_id,
            self.parent_span_id,
            self.start_timestamp,
            self.timestamp,
        );
        span.trace_id = self.trace_id.unwrap_or_else(|| default_trace_id.clone());
        span.op = self.op;
        span.description = self.description;
        span.status = self.status;
        span.tags = self.tags.unwrap_or_default();
        span.data = self.data.unwrap_or_default();
        span
    }
}

/// `contexts.trace` of a transaction event: the root span's identity.
#[derive(Debug, Default, Deserialize)]
struct TraceContext {
    #[serde(default)]
    trace_id: Option<SharedStr>,
    #[serde(default)]
    span_id: Option<SharedStr>,
    #[serde(default)]
    parent_span_id: Option<SharedStr>,
    #[serde(default)]
    op: Option<SharedStr>,
    #[serde(default)]
    status: Option<SharedStr>,
    #[serde(default)]
    description: Option<SharedStr>,
}

#[derive(Debug, Default, Deserialize)]
struct Contexts {
    #[serde(default)]
    trace: TraceContext,
}

#[derive(Debug, Deserialize)]
struct Sdk {
    #[serde(default)]
    name: Option<String>,
}

/// Top-level transaction event.
#[derive(Debug, Deserialize)]
struct TransactionEvent {
    #[serde(default)]
    event_id: Option<SharedStr>,
    #[serde(default)]
    transaction: Option<SharedStr>,
    #[serde(default)]
    start_timestamp: Option<f64>,
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    contexts: Contexts,
    #[serde(default)]
    spans: Vec<RawSpan>,
    #[serde(default)]
    sdk: Option<Sdk>,
    #[serde(default)]
    tags: Option<TagList>,
}

/// Event tags arrive either as a map or as `[key, value]` pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagList {
    Map(BTreeMap<String, String>),
    Pairs(Vec<(String, String)>),
}

impl TagList {
    fn into_map(self) -> BTreeMap<String, String> {
        match self {
            Self::Map(map) => map,
            Self::Pairs(pairs) => pairs.into_iter().collect(),
        }
    }
}

/// Earliest start and latest end across `spans`, if there are any.
fn span_bounds(spans: &[Span]) -> Option<(f64, f64)> {
    spans.iter().fold(None, |acc, s| {
        let (start, end) = acc.unwrap_or((s.start_timestamp, s.timestamp));
        Some((start.min(s.start_timestamp), end.max(s.timestamp)))
    })
}

/// Parse a transaction event into a [`Trace`].
///
/// The root comes from `contexts.trace`, with the transaction name as its
/// description. When the event itself carries no timestamps the root spans
/// the extent of its children.
pub fn parse_event(data: &[u8]) -> Result<Trace, EventParseError> {
    let event: TransactionEvent = serde_json::from_slice(data)?;
    let ctx = event.contexts.trace;

    let trace_id = ctx
        .trace_id
        .or_else(|| event.event_id.clone())
        .unwrap_or_else(|| SharedStr::from(""));
    let spans: Vec<Span> = event
        .spans
        .into_iter()
        .map(|raw| raw.into_span(&trace_id))
        .collect();

    let (start, end) = match (event.start_timestamp, event.timestamp) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let (span_start, span_end) =
                span_bounds(&spans).ok_or(EventParseError::MissingTimestamps)?;
            (start.unwrap_or(span_start), end.unwrap_or(span_end))
        }
    };

    let root_id = ctx
        .span_id
        .unwrap_or_else(|| SpanId::from(SYNTHETIC_ROOT_ID));
    let mut root = Span::new(root_id, ctx.parent_span_id, start, end);
    root.trace_id = trace_id;
    root.op = ctx.op;
    root.status = ctx.status;
    root.description = event.transaction.or(ctx.description);
    root.tags = event.tags.map(TagList::into_map).unwrap_or_default();

    let sdk_name = event.sdk.and_then(|sdk| sdk.name);
    tracing::debug!(
        spans = spans.len(),
        sdk = sdk_name.as_deref().unwrap_or("unknown"),
        "parsed transaction event"
    );
    Ok(Trace::new(root, spans, sdk_name))
}

/// Parse a bare JSON array of spans, wrapped in a synthetic root covering
/// all of them. Spans without a parent id hang directly off that root. An
/// empty array yields a zero-width root with no children.
pub fn parse_span_array(data: &[u8]) -> Result<Trace, EventParseError> {
    let raw: Vec<RawSpan> = serde_json::from_slice(data)?;
    let trace_id = raw
        .iter()
        .find_map(|s| s.trace_id.clone())
        .unwrap_or_else(|| SharedStr::from(""));
    let root_id = SpanId::from(SYNTHETIC_ROOT_ID);

    let spans: Vec<Span> = raw
        .into_iter()
        .map(|raw| {
            let mut span = raw.into_span(&trace_id);
            if span.parent_span_id.is_none() {
                span.parent_span_id = Some(root_id.clone());
            }
            span
        })
        .collect();

    let (start, end) = span_bounds(&spans).unwrap_or((0.0, 0.0));
    let mut root = Span::new(root_id, None, start, end);
    root.trace_id = trace_id;

    Ok(Trace::new(root, spans, None))
}
