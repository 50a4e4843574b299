use std::collections::HashSet;

use super::span::{Span, SpanId};
use super::trace::Trace;

/// The set of span ids that survive a search or operation filter.
///
/// Any real span whose id is absent is filtered out; gap spans never are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanFilter {
    span_ids: HashSet<SpanId>,
}

impl SpanFilter {
    pub fn from_ids(ids: impl IntoIterator<Item = SpanId>) -> Self {
        Self {
            span_ids: ids.into_iter().collect(),
        }
    }

    /// Spans whose op, description or id contains `query`, ignoring case.
    /// An empty query matches every span.
    pub fn search(trace: &Trace, query: &str) -> Self {
        let needle = query.trim().to_lowercase();
        Self::matching(trace, |span| {
            needle.is_empty()
                || [span.op.as_deref(), span.description.as_deref(), Some(span.span_id.as_str())]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&needle))
        })
    }

    /// Spans whose op is exactly one of `ops`.
    pub fn operations<S: AsRef<str>>(trace: &Trace, ops: &[S]) -> Self {
        Self::matching(trace, |span| {
            span.op
                .as_deref()
                .is_some_and(|op| ops.iter().any(|o| o.as_ref() == op))
        })
    }

    fn matching(trace: &Trace, mut keep: impl FnMut(&Span) -> bool) -> Self {
        Self::from_ids(
            trace
                .all_spans()
                .filter(|span| keep(span))
                .map(|span| span.span_id.clone()),
        )
    }

    /// Spans kept by both filters.
    pub fn intersect(&self, other: &SpanFilter) -> Self {
        Self {
            span_ids: self.span_ids.intersection(&other.span_ids).cloned().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.span_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.span_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace() -> Trace {
        let root = Span::new("root", None, 0.0, 1.0).with_op("http.server");
        Trace::new(
            root,
            vec![
                Span::new("a", Some("root".into()), 0.0, 0.2)
                    .with_op("db.query")
                    .with_description("SELECT * FROM users"),
                Span::new("b", Some("root".into()), 0.3, 0.4)
                    .with_op("http.client")
                    .with_description("GET /Users/42"),
                Span::new("c", Some("root".into()), 0.5, 0.6).with_op("db.query"),
            ],
            None,
        )
    }

    #[test]
    fn search_is_case_insensitive_over_fields() {
        let filter = SpanFilter::search(&trace(), "users");
        assert!(filter.contains("a"));
        assert!(filter.contains("b"));
        assert!(!filter.contains("c"));
        assert!(!filter.contains("root"));
    }

    #[test]
    fn empty_search_matches_everything() {
        assert_eq!(SpanFilter::search(&trace(), "  ").len(), 4);
    }

    #[test]
    fn operations_and_intersection() {
        let t = trace();
        let ops = SpanFilter::operations(&t, &["db.query"]);
        assert!(ops.contains("a") && ops.contains("c"));
        assert_eq!(ops.len(), 2);

        let both = ops.intersect(&SpanFilter::search(&t, "select"));
        assert_eq!(both, SpanFilter::from_ids([SpanId::from("a")]));
    }
}
