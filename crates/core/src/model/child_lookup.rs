use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use super::span::{Span, SpanId};

/// Maps a span id to its direct children, ordered for display.
///
/// Built once per trace. A render pass works on its own clone and drains it
/// with [`ChildLookup::take`], so each child list is handed out at most once
/// per pass even when the input contains duplicated or cyclic ids.
#[derive(Debug, Clone, Default)]
pub struct ChildLookup {
    children: HashMap<SpanId, Vec<Arc<Span>>>,
}

impl ChildLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parent: SpanId, child: Arc<Span>) {
        self.children.entry(parent).or_default().push(child);
    }

    /// Orders every child list: attached spans before orphans, then by start
    /// time. The sort is stable, so ties keep their input order.
    pub fn sort(&mut self) {
        for siblings in self.children.values_mut() {
            siblings.sort_by(|a, b| compare_siblings(a, b));
        }
    }

    pub fn children(&self, parent: &str) -> &[Arc<Span>] {
        self.children.get(parent).map_or(&[], Vec::as_slice)
    }

    /// Removes and returns the children of `parent`. `None` means the entry
    /// was never present or has already been taken.
    pub fn take(&mut self, parent: &str) -> Option<Vec<Arc<Span>>> {
        self.children.remove(parent)
    }

    pub fn contains(&self, parent: &str) -> bool {
        self.children.contains_key(parent)
    }

    /// Number of parents with at least one child.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

fn compare_siblings(a: &Span, b: &Span) -> Ordering {
    a.is_orphan
        .cmp(&b.is_orphan)
        .then_with(|| a.start_timestamp.total_cmp(&b.start_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, start: f64) -> Arc<Span> {
        Arc::new(Span::new(id, Some("p".into()), start, start + 1.0))
    }

    #[test]
    fn sort_puts_orphans_last_then_by_start() {
        let mut lookup = ChildLookup::new();
        let mut orphan = Span::new("o", Some("p".into()), 0.0, 1.0);
        orphan.is_orphan = true;
        lookup.push("p".into(), Arc::new(orphan));
        lookup.push("p".into(), span("late", 3.0));
        lookup.push("p".into(), span("early", 1.0));
        lookup.sort();

        let ids: Vec<_> = lookup.children("p").iter().map(|s| s.span_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late", "o"]);
    }

    #[test]
    fn take_drains_entry_once() {
        let mut lookup = ChildLookup::new();
        lookup.push("p".into(), span("a", 0.0));
        assert_eq!(lookup.take("p").map(|c| c.len()), Some(1));
        assert!(lookup.take("p").is_none());
        assert!(lookup.children("p").is_empty());
        assert!(lookup.is_empty());
    }
}
