use std::collections::HashSet;
use std::sync::Arc;

use crate::config::WaterfallConfig;
use crate::model::{DragController, DragHandle, SpanErrors, SpanFilter, SpanId, Trace, ViewWindow};
use crate::views::bounds::bounds_generator;
use crate::views::gap::GapPolicy;
use crate::views::waterfall::{FlattenContext, Waterfall, flatten_trace};

/// Owns everything a waterfall render depends on and caches the last
/// flattened result.
///
/// Re-flattening happens lazily in [`WaterfallView::waterfall`], and only when
/// an input changed and no window drag is in progress; during a drag the
/// cached rows are served as-is.
pub struct WaterfallView {
    trace: Arc<Trace>,
    config: WaterfallConfig,
    drag: DragController,
    filter: Option<SpanFilter>,
    collapsed: HashSet<SpanId>,
    errors: SpanErrors,
    /// Width of the timeline column in pixels.
    timeline_width: f64,
    cached: Option<Waterfall>,
    dirty: bool,
}

impl WaterfallView {
    pub fn new(trace: Arc<Trace>, config: WaterfallConfig) -> Self {
        Self {
            drag: DragController::new(config.initial_window),
            trace,
            config,
            filter: None,
            collapsed: HashSet::new(),
            errors: SpanErrors::new(),
            timeline_width: 1.0,
            cached: None,
            dirty: true,
        }
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn config(&self) -> &WaterfallConfig {
        &self.config
    }

    pub fn errors(&self) -> &SpanErrors {
        &self.errors
    }

    pub fn set_errors(&mut self, errors: SpanErrors) {
        self.errors = errors;
    }

    /// The window rows are currently laid out against: the committed one,
    /// since rows are not re-flattened mid-drag.
    pub fn window(&self) -> ViewWindow {
        self.drag.window()
    }

    /// The window the selector should draw, including an uncommitted drag.
    pub fn preview_window(&self) -> ViewWindow {
        self.drag.current()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn set_window(&mut self, window: ViewWindow) {
        if self.drag.set_window(window) {
            self.dirty = true;
        }
    }

    pub fn begin_drag(&mut self, handle: DragHandle, at: f64) {
        self.drag.begin(handle, at);
    }

    pub fn drag_to(&mut self, at: f64) -> Option<ViewWindow> {
        self.drag.update(at)
    }

    pub fn end_drag(&mut self) -> ViewWindow {
        let window = self.drag.end();
        self.dirty = true;
        tracing::debug!(start = window.start, end = window.end, "committed view window");
        window
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    pub fn set_timeline_width(&mut self, width: f64) {
        if (width - self.timeline_width).abs() > f64::EPSILON {
            self.timeline_width = width;
            self.dirty = true;
        }
    }

    pub fn set_filter(&mut self, filter: Option<SpanFilter>) {
        if self.filter != filter {
            self.filter = filter;
            self.dirty = true;
        }
    }

    pub fn filter(&self) -> Option<&SpanFilter> {
        self.filter.as_ref()
    }

    /// Fold or unfold a span's subtree. Returns whether it is now collapsed.
    pub fn toggle_collapsed(&mut self, span_id: &SpanId) -> bool {
        self.dirty = true;
        if self.collapsed.remove(span_id) {
            false
        } else {
            self.collapsed.insert(span_id.clone());
            true
        }
    }

    /// The current rows, re-flattened if needed.
    pub fn waterfall(&mut self) -> &Waterfall {
        let stale = self.dirty && !self.drag.is_dragging();
        let waterfall = match self.cached.take() {
            Some(waterfall) if !stale => waterfall,
            _ => {
                self.dirty = false;
                self.flatten()
            }
        };
        self.cached.insert(waterfall)
    }

    fn flatten(&self) -> Waterfall {
        let trace = &self.trace;
        let bounds = bounds_generator(
            trace.start_timestamp,
            trace.end_timestamp,
            self.drag.window(),
            self.timeline_width,
        );
        let gap_policy =
            GapPolicy::new(trace.is_browser_js_sdk()).with_min_duration(self.config.min_gap_secs);
        let ctx = FlattenContext::new(&bounds)
            .with_filter(self.filter.as_ref())
            .with_gap_policy(gap_policy)
            .with_collapsed(Some(&self.collapsed));
        flatten_trace(trace, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Span;

    fn view() -> WaterfallView {
        let trace = Trace::new(
            Span::new("r", None, 0.0, 1.0),
            vec![
                Span::new("a", Some("r".into()), 0.0, 0.2),
                Span::new("b", Some("r".into()), 0.8, 1.0),
            ],
            None,
        );
        WaterfallView::new(Arc::new(trace), WaterfallConfig::default())
    }

    fn hidden_ids(view: &mut WaterfallView) -> Vec<String> {
        view.waterfall()
            .span_rows()
            .filter(|r| r.is_hidden)
            .map(|r| r.span.span_id.to_string())
            .collect()
    }

    #[test]
    fn drag_does_not_reflatten_until_it_ends() {
        let mut view = view();
        assert!(hidden_ids(&mut view).is_empty());

        view.begin_drag(DragHandle::Right, 1.0);
        view.drag_to(0.5);
        assert!((view.preview_window().end - 0.5).abs() < 1e-9);
        assert!(hidden_ids(&mut view).is_empty(), "rows changed mid-drag");

        view.end_drag();
        assert_eq!(hidden_ids(&mut view), vec!["b".to_string()]);
    }

    #[test]
    fn first_render_during_drag_still_flattens() {
        let mut view = view();
        view.begin_drag(DragHandle::Window, 0.5);
        assert_eq!(view.waterfall().span_rows().count(), 3);
    }

    #[test]
    fn filter_and_collapse_mark_dirty() {
        let mut view = view();
        assert_eq!(view.waterfall().span_rows().count(), 3);

        view.set_filter(Some(SpanFilter::from_ids([SpanId::from("a")])));
        assert_eq!(
            view.waterfall().trailing.map(|m| m.to_string()).as_deref(),
            Some("1 spans filtered out")
        );

        view.set_filter(None);
        assert!(view.toggle_collapsed(&SpanId::from("r")));
        assert_eq!(view.waterfall().span_rows().count(), 1);
        assert!(!view.toggle_collapsed(&SpanId::from("r")));
        assert_eq!(view.waterfall().span_rows().count(), 3);
    }

    #[test]
    fn configured_gap_threshold_applies() {
        let mut view = view();
        assert_eq!(view.waterfall().rows().filter(|r| r.span.is_gap()).count(), 1);

        let config = WaterfallConfig {
            min_gap_secs: 1.0,
            ..WaterfallConfig::default()
        };
        let mut strict = WaterfallView::new(Arc::clone(&view.trace), config);
        assert_eq!(strict.waterfall().rows().filter(|r| r.span.is_gap()).count(), 0);
    }
}
