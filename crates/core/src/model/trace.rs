use std::collections::HashSet;
use std::sync::Arc;

use waterfall_protocol::SharedStr;

use super::child_lookup::ChildLookup;
use super::span::{Span, SpanId, SpanKind};

/// SDKs whose traces contain long uninstrumented stretches (idle browser
/// time), for which gap rows are noise.
const BROWSER_JS_SDKS: &[&str] = &[
    "sentry.javascript.browser",
    "sentry.javascript.react",
    "sentry.javascript.vue",
    "sentry.javascript.angular",
    "sentry.javascript.ember",
    "sentry.javascript.svelte",
    "sentry.javascript.gatsby",
    "sentry.javascript.nextjs",
    "sentry.javascript.remix",
    "sentry.javascript.sveltekit",
    "sentry.javascript.astro",
    "sentry.javascript.solid",
];

/// A parsed trace: the root span, every raw span, and the child lookup the
/// flattener walks.
#[derive(Debug, Clone)]
pub struct Trace {
    pub trace_id: SharedStr,
    pub root: Arc<Span>,
    pub spans: Vec<Arc<Span>>,
    pub child_lookup: ChildLookup,
    /// Earliest start across the root and all spans (seconds).
    pub start_timestamp: f64,
    /// Latest end across the root and all spans (seconds).
    pub end_timestamp: f64,
    pub sdk_name: Option<String>,
    /// Spans re-parented under the root because their parent was missing.
    pub orphan_count: usize,
}

impl Trace {
    /// Assemble a trace around `root`.
    ///
    /// Spans whose parent id is absent or does not name a span of this trace
    /// are flagged as orphans and attached to the root. Trace bounds widen to
    /// cover every span.
    pub fn new(mut root: Span, spans: Vec<Span>, sdk_name: Option<String>) -> Self {
        root.kind = SpanKind::Root;
        root.is_orphan = false;
        let root_id = root.span_id.clone();

        let mut known: HashSet<SpanId> = spans.iter().map(|s| s.span_id.clone()).collect();
        known.insert(root_id.clone());

        let mut start_timestamp = root.start_timestamp;
        let mut end_timestamp = root.timestamp;
        let mut child_lookup = ChildLookup::new();
        let mut orphan_count = 0;
        let mut stored = Vec::with_capacity(spans.len());

        for mut span in spans {
            let parent = match &span.parent_span_id {
                Some(parent) if known.contains(parent) => parent.clone(),
                _ => {
                    span.is_orphan = true;
                    orphan_count += 1;
                    root_id.clone()
                }
            };

            start_timestamp = start_timestamp.min(span.start_timestamp);
            end_timestamp = end_timestamp.max(span.timestamp);

            let span = Arc::new(span);
            child_lookup.push(parent, Arc::clone(&span));
            stored.push(span);
        }
        child_lookup.sort();

        if orphan_count > 0 {
            tracing::debug!(orphan_count, "attached orphan spans to the root");
        }

        Self {
            trace_id: root.trace_id.clone(),
            root: Arc::new(root),
            spans: stored,
            child_lookup,
            start_timestamp,
            end_timestamp,
            sdk_name,
            orphan_count,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_timestamp - self.start_timestamp
    }

    /// Number of spans including the root.
    pub fn span_count(&self) -> usize {
        self.spans.len() + 1
    }

    pub fn span(&self, id: &str) -> Option<&Arc<Span>> {
        if self.root.span_id == id {
            return Some(&self.root);
        }
        self.spans.iter().find(|s| s.span_id == id)
    }

    /// Root plus every raw span, in input order.
    pub fn all_spans(&self) -> impl Iterator<Item = &Arc<Span>> {
        std::iter::once(&self.root).chain(&self.spans)
    }

    /// Whether the trace was produced by a browser JavaScript SDK. Gap rows
    /// are suppressed for these traces.
    pub fn is_browser_js_sdk(&self) -> bool {
        self.sdk_name
            .as_deref()
            .is_some_and(|name| BROWSER_JS_SDKS.contains(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trace() -> Trace {
        let root = Span::new("r", None, 0.0, 1.0).with_op("pageload");
        let spans = vec![
            Span::new("b", Some("r".into()), 0.5, 0.6),
            Span::new("a", Some("r".into()), 0.0, 0.2),
            Span::new("a1", Some("a".into()), 0.05, 0.1),
            Span::new("lost", Some("missing".into()), 0.3, 1.4),
            Span::new("none", None, -0.5, 0.1),
        ];
        Trace::new(root, spans, Some("sentry.python".into()))
    }

    #[test]
    fn orphans_attach_to_root_after_attached_children() {
        let trace = sample_trace();
        assert_eq!(trace.orphan_count, 2);
        let ids: Vec<_> = trace
            .child_lookup
            .children("r")
            .iter()
            .map(|s| s.span_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "none", "lost"]);
        assert!(trace.span("lost").is_some_and(|s| s.is_orphan));
        assert!(trace.span("a").is_some_and(|s| !s.is_orphan));
    }

    #[test]
    fn bounds_cover_all_spans() {
        let trace = sample_trace();
        assert!((trace.start_timestamp + 0.5).abs() < f64::EPSILON);
        assert!((trace.end_timestamp - 1.4).abs() < f64::EPSILON);
        assert!((trace.duration() - 1.9).abs() < 1e-9);
    }

    #[test]
    fn root_is_marked_and_found() {
        let trace = sample_trace();
        assert!(trace.root.is_root());
        assert_eq!(trace.span("r").map(|s| s.kind), Some(SpanKind::Root));
        assert_eq!(trace.span_count(), 6);
        assert_eq!(trace.all_spans().count(), 6);
    }

    #[test]
    fn browser_sdk_detection() {
        let mut trace = sample_trace();
        assert!(!trace.is_browser_js_sdk());
        trace.sdk_name = Some("sentry.javascript.react".into());
        assert!(trace.is_browser_js_sdk());
        trace.sdk_name = None;
        assert!(!trace.is_browser_js_sdk());
    }
}
