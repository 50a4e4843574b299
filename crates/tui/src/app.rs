use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use waterfall_core::config::RowLayout;
use waterfall_core::model::{DragHandle, SpanId, ViewWindow};
use waterfall_core::views::{WaterfallItem, WaterfallView, line_count};

/// Logical x units per terminal column. Render commands are produced in
/// these units and divided back down when painted.
pub const UNITS_PER_COL: f64 = 4.0;

/// Rows above the waterfall: header, window selector, time axis.
pub const HEADER_ROWS: u16 = 3;
/// The window selector row, where mouse drags move the view window.
pub const SELECTOR_ROW: u16 = 1;

const PAN_STEP: f64 = 0.1;
const ZOOM_STEP: f64 = 0.8;
/// Columns from a window edge that still grab that edge.
const HANDLE_SLOP: f64 = 1.5;

/// Terminal geometry for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
    pub tree_cols: u16,
}

impl Geometry {
    pub fn new(cols: u16, rows: u16, tree_column: f64) -> Self {
        let tree_cols = (f64::from(cols) * tree_column).round() as u16;
        Self {
            cols,
            rows,
            tree_cols: tree_cols.min(cols.saturating_sub(1)),
        }
    }

    pub fn timeline_cols(&self) -> u16 {
        self.cols - self.tree_cols
    }

    /// Waterfall lines visible below the header and above the status line.
    pub fn content_rows(&self) -> u16 {
        self.rows.saturating_sub(HEADER_ROWS + 1)
    }

    /// Fraction of the full trace under a timeline column.
    pub fn column_fraction(&self, col: u16) -> f64 {
        let timeline = f64::from(self.timeline_cols().max(1));
        (f64::from(col.saturating_sub(self.tree_cols)) / timeline).clamp(0.0, 1.0)
    }
}

/// Interactive state around a [`WaterfallView`].
pub struct App {
    pub view: WaterfallView,
    /// Index into the displayed items.
    pub selected: usize,
    /// First displayed line.
    pub scroll: usize,
    pub geometry: Geometry,
}

impl App {
    pub fn new(view: WaterfallView) -> Self {
        let tree_column = view.config().layout.tree_column;
        Self {
            view,
            selected: 0,
            scroll: 0,
            geometry: Geometry::new(80, 24, tree_column),
        }
    }

    /// Row layout in terminal units: one line per row, two columns per level.
    /// The tree column is snapped to whole terminal columns.
    pub fn layout(&self) -> RowLayout {
        RowLayout {
            row_height: 1.0,
            indent: 2.0 * UNITS_PER_COL,
            tree_column: f64::from(self.geometry.tree_cols) / f64::from(self.geometry.cols.max(1)),
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.geometry = Geometry::new(cols, rows, self.view.config().layout.tree_column);
        self.view
            .set_timeline_width(f64::from(self.geometry.timeline_cols()) * UNITS_PER_COL);
    }

    /// Handle a key press. Returns `false` when the app should quit.
    pub fn on_key(&mut self, code: KeyCode) -> bool {
        let window = self.view.window();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Up | KeyCode::Char('k') => self.select(self.selected.saturating_sub(1)),
            KeyCode::Down | KeyCode::Char('j') => self.select(self.selected + 1),
            KeyCode::PageUp => {
                let page = usize::from(self.geometry.content_rows().max(1));
                self.select(self.selected.saturating_sub(page));
            }
            KeyCode::PageDown => {
                let page = usize::from(self.geometry.content_rows().max(1));
                self.select(self.selected + page);
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.view.set_window(window.pan(-window.width() * PAN_STEP));
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.view.set_window(window.pan(window.width() * PAN_STEP));
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.view.set_window(window.zoom(ZOOM_STEP, 0.5));
            }
            KeyCode::Char('-') => self.view.set_window(window.zoom(1.0 / ZOOM_STEP, 0.5)),
            KeyCode::Char('0') => self.view.set_window(ViewWindow::full()),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(id) = self.selected_span_id() {
                    let collapsed = self.view.toggle_collapsed(&id);
                    tracing::debug!(span_id = %id, collapsed, "toggled subtree");
                }
            }
            _ => {}
        }
        true
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        let at = self.geometry.column_fraction(mouse.column);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if mouse.row == SELECTOR_ROW => {
                if mouse.column >= self.geometry.tree_cols {
                    let handle = self.handle_at(at);
                    self.view.begin_drag(handle, at);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.view.drag_to(at);
            }
            MouseEventKind::Up(MouseButton::Left) if self.view.is_dragging() => {
                self.view.end_drag();
            }
            MouseEventKind::ScrollDown => self.select(self.selected + 1),
            MouseEventKind::ScrollUp => self.select(self.selected.saturating_sub(1)),
            _ => {}
        }
    }

    fn handle_at(&self, at: f64) -> DragHandle {
        let window = self.view.window();
        let slop = HANDLE_SLOP / f64::from(self.geometry.timeline_cols().max(1));
        if (at - window.start).abs() <= slop {
            DragHandle::Left
        } else if (at - window.end).abs() <= slop {
            DragHandle::Right
        } else {
            DragHandle::Window
        }
    }

    /// Move the selection, clamped to the displayed lines, and keep it on
    /// screen.
    fn select(&mut self, index: usize) {
        let lines = line_count(self.view.waterfall());
        self.selected = index.min(lines.saturating_sub(1));
        let page = usize::from(self.geometry.content_rows().max(1));
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + page {
            self.scroll = self.selected + 1 - page;
        }
    }

    /// The real span under the selection, if it is on one.
    pub fn selected_span_id(&mut self) -> Option<SpanId> {
        let selected = self.selected;
        match self.view.waterfall().displayed_items().nth(selected)? {
            WaterfallItem::Span(row) => Some(row.span.span_id.clone()),
            _ => None,
        }
    }
}
