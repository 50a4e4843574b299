use serde::{Deserialize, Serialize};

/// Narrowest window a drag may produce, as a fraction of the trace.
pub const MIN_WINDOW_WIDTH: f64 = 0.001;

/// The visible slice of the trace, as fractions of its total duration.
///
/// Invariant: `0.0 <= start <= end <= 1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewWindow {
    pub start: f64,
    pub end: f64,
}

impl ViewWindow {
    pub fn full() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
        }
    }

    /// Orders the two bounds and clamps them into `[0, 1]`. NaN collapses to
    /// the full window.
    pub fn clamped(a: f64, b: f64) -> Self {
        if a.is_nan() || b.is_nan() {
            return Self::full();
        }
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            start: lo.clamp(0.0, 1.0),
            end: hi.clamp(0.0, 1.0),
        }
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    /// Shift the window by `delta`, keeping its width and staying in range.
    pub fn pan(&self, delta: f64) -> Self {
        let width = self.width();
        let start = (self.start + delta).clamp(0.0, 1.0 - width);
        Self {
            start,
            end: start + width,
        }
    }

    /// Scale the window width by `factor` around `anchor` (a fraction inside
    /// the window, 0 = left edge, 1 = right edge).
    pub fn zoom(&self, factor: f64, anchor: f64) -> Self {
        let width = (self.width() * factor).clamp(MIN_WINDOW_WIDTH, 1.0);
        let pivot = self.start + self.width() * anchor.clamp(0.0, 1.0);
        let start = (pivot - width * anchor.clamp(0.0, 1.0)).clamp(0.0, 1.0 - width);
        Self {
            start,
            end: start + width,
        }
    }

    /// Absolute `(start, end)` timestamps of this window within a trace.
    pub fn to_timestamps(&self, trace_start: f64, trace_end: f64) -> (f64, f64) {
        let duration = trace_end - trace_start;
        (
            trace_start + self.start * duration,
            trace_end - (1.0 - self.end) * duration,
        )
    }
}

impl Default for ViewWindow {
    fn default() -> Self {
        Self::full()
    }
}

/// Which part of the window selector is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragHandle {
    Left,
    Right,
    /// The whole window, panning it.
    Window,
}

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    handle: DragHandle,
    origin: f64,
    initial: ViewWindow,
}

/// Tracks an in-progress drag of the window selector.
///
/// While a drag is active, [`DragController::update`] yields preview windows
/// that are not committed; [`DragController::end`] commits the last preview.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    window: ViewWindow,
    preview: Option<ViewWindow>,
    active: Option<ActiveDrag>,
}

impl DragController {
    pub fn new(window: ViewWindow) -> Self {
        Self {
            window,
            preview: None,
            active: None,
        }
    }

    /// The committed window.
    pub fn window(&self) -> ViewWindow {
        self.window
    }

    /// The window to draw right now: the preview while dragging.
    pub fn current(&self) -> ViewWindow {
        self.preview.unwrap_or(self.window)
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Replace the committed window; ignored while a drag is active.
    pub fn set_window(&mut self, window: ViewWindow) -> bool {
        if self.is_dragging() {
            return false;
        }
        self.window = window;
        true
    }

    pub fn begin(&mut self, handle: DragHandle, at: f64) {
        self.active = Some(ActiveDrag {
            handle,
            origin: at,
            initial: self.window,
        });
        self.preview = Some(self.window);
    }

    /// Move the drag to `at` (a fraction of the full trace). Returns the
    /// preview window, or `None` when no drag is active.
    pub fn update(&mut self, at: f64) -> Option<ViewWindow> {
        let drag = self.active?;
        let at = at.clamp(0.0, 1.0);
        let initial = drag.initial;
        let next = match drag.handle {
            DragHandle::Left => ViewWindow {
                start: at.min(initial.end - MIN_WINDOW_WIDTH).max(0.0),
                end: initial.end,
            },
            DragHandle::Right => ViewWindow {
                start: initial.start,
                end: at.max(initial.start + MIN_WINDOW_WIDTH).min(1.0),
            },
            DragHandle::Window => initial.pan(at - drag.origin),
        };
        self.preview = Some(next);
        Some(next)
    }

    /// Finish the drag and commit the previewed window.
    pub fn end(&mut self) -> ViewWindow {
        if let Some(preview) = self.preview.take() {
            self.window = preview;
        }
        self.active = None;
        self.window
    }

    /// Abandon the drag, keeping the previously committed window.
    pub fn cancel(&mut self) {
        self.preview = None;
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn clamped_orders_and_limits() {
        let w = ViewWindow::clamped(1.2, -0.3);
        assert!(approx(w.start, 0.0) && approx(w.end, 1.0));
        let w = ViewWindow::clamped(0.7, 0.2);
        assert!(approx(w.start, 0.2) && approx(w.end, 0.7));
        assert_eq!(ViewWindow::clamped(f64::NAN, 0.5), ViewWindow::full());
    }

    #[test]
    fn pan_keeps_width_and_range() {
        let w = ViewWindow::clamped(0.2, 0.5).pan(0.9);
        assert!(approx(w.end, 1.0));
        assert!(approx(w.width(), 0.3));
        let w = ViewWindow::clamped(0.2, 0.5).pan(-0.9);
        assert!(approx(w.start, 0.0));
    }

    #[test]
    fn zoom_around_anchor() {
        let w = ViewWindow::full().zoom(0.5, 0.5);
        assert!(approx(w.start, 0.25) && approx(w.end, 0.75));
        let w = ViewWindow::full().zoom(0.0, 0.0);
        assert!(approx(w.width(), MIN_WINDOW_WIDTH));
    }

    #[test]
    fn window_to_timestamps() {
        let (s, e) = ViewWindow::clamped(0.25, 0.5).to_timestamps(10.0, 14.0);
        assert!(approx(s, 11.0) && approx(e, 12.0));
    }

    #[test]
    fn handles_cannot_cross() {
        let mut drag = DragController::new(ViewWindow::clamped(0.2, 0.6));
        drag.begin(DragHandle::Left, 0.2);
        let preview = drag.update(0.9);
        assert!(preview.is_some_and(|w| approx(w.start, 0.6 - MIN_WINDOW_WIDTH)));

        drag.cancel();
        assert_eq!(drag.window(), ViewWindow::clamped(0.2, 0.6));

        drag.begin(DragHandle::Right, 0.6);
        let preview = drag.update(0.0);
        assert!(preview.is_some_and(|w| approx(w.end, 0.2 + MIN_WINDOW_WIDTH)));
    }

    #[test]
    fn preview_is_committed_on_end() {
        let mut drag = DragController::new(ViewWindow::clamped(0.2, 0.4));
        drag.begin(DragHandle::Window, 0.3);
        drag.update(0.5);
        assert!(drag.is_dragging());
        assert!(approx(drag.current().start, 0.4));
        assert!(approx(drag.window().start, 0.2));
        assert!(!drag.set_window(ViewWindow::full()));

        let committed = drag.end();
        assert!(!drag.is_dragging());
        assert!(approx(committed.start, 0.4) && approx(committed.end, 0.6));
        assert!(drag.update(0.1).is_none());
    }
}
