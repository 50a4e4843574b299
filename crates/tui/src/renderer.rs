use std::collections::BTreeMap;
use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders},
};
use waterfall_core::model::ViewWindow;
use waterfall_core::views::{format_duration, render_rows, render_time_axis};
use waterfall_protocol::{RenderCommand, ThemeToken, Viewport};

use crate::app::{App, Geometry, HEADER_ROWS, SELECTOR_ROW, UNITS_PER_COL};

fn theme_to_color(token: ThemeToken) -> Color {
    match token {
        ThemeToken::Background => Color::Black,
        ThemeToken::Border => Color::DarkGray,
        ThemeToken::TextPrimary => Color::White,
        ThemeToken::TextSecondary => Color::Gray,
        ThemeToken::TextMuted => Color::DarkGray,
        ThemeToken::RootBar => Color::Rgb(120, 90, 200),
        ThemeToken::SpanBar => Color::Rgb(80, 140, 220),
        ThemeToken::GapBar => Color::Rgb(70, 70, 70),
        ThemeToken::SpanError => Color::Rgb(220, 70, 70),
        ThemeToken::Connector => Color::DarkGray,
        ThemeToken::OrphanConnector => Color::Yellow,
        ThemeToken::AxisBackground => Color::Rgb(20, 20, 20),
        ThemeToken::AxisTick => Color::DarkGray,
        ThemeToken::AxisGridline => Color::Gray,
        ThemeToken::InfoMessage => Color::LightYellow,
    }
}

fn to_col(x: f64) -> i64 {
    (x / UNITS_PER_COL).floor() as i64
}

fn to_row(y: f64) -> i64 {
    (y + 1e-6).floor() as i64
}

/// Write `text` into one line of `area`, clipped to `[area.x, limit)`.
fn put_str(buf: &mut Buffer, area: Rect, col: i64, row: i64, text: &str, limit: u16, style: Style) {
    if row < 0 || row >= i64::from(area.height) {
        return;
    }
    let y = area.y + row as u16;
    for (i, ch) in text.chars().enumerate() {
        let c = col + i as i64;
        if c < 0 {
            continue;
        }
        if c >= i64::from(limit.min(area.width)) {
            break;
        }
        buf[(area.x + c as u16, y)].set_char(ch).set_style(style);
    }
}

const UP: u8 = 1;
const DOWN: u8 = 2;
const LEFT: u8 = 4;
const RIGHT: u8 = 8;

#[derive(Default, Clone, Copy)]
struct Links {
    sides: u8,
    dashed: bool,
    orphan: bool,
}

impl Links {
    fn glyph(self) -> char {
        match (self.sides, self.dashed) {
            (s, true) if s == UP | DOWN => '┊',
            (s, true) if s & (UP | DOWN) == 0 => '┄',
            (s, _) if s == UP | DOWN => '│',
            (s, _) if s == UP | RIGHT => '└',
            (s, _) if s == UP | DOWN | RIGHT => '├',
            (s, _) if s == DOWN | RIGHT => '┌',
            (s, _) if s & (UP | DOWN) == 0 => '─',
            (UP, _) => '╵',
            (DOWN, _) => '╷',
            _ => '┼',
        }
    }
}

/// Merge connector segments into per-cell box-drawing sides.
fn collect_links(commands: &[RenderCommand]) -> BTreeMap<(i64, i64), Links> {
    let mut cells: BTreeMap<(i64, i64), Links> = BTreeMap::new();
    let mut link = |col: i64, row: i64, sides: u8, dashed: bool, orphan: bool| {
        let cell = cells.entry((col, row)).or_default();
        cell.sides |= sides;
        cell.dashed |= dashed;
        cell.orphan |= orphan;
    };

    for cmd in commands {
        let RenderCommand::DrawLine {
            from,
            to,
            color,
            dashed,
            ..
        } = cmd
        else {
            continue;
        };
        let orphan = *color == ThemeToken::OrphanConnector;
        if (from.x - to.x).abs() < f64::EPSILON {
            let (top, bottom) = (from.y.min(to.y), from.y.max(to.y));
            let row = to_row(top);
            let mut sides = 0;
            if top - row as f64 <= 0.25 {
                sides |= UP;
            }
            if bottom - row as f64 >= 0.75 {
                sides |= DOWN;
            }
            link(to_col(from.x), row, sides, *dashed, orphan);
        } else {
            let (left, right) = (to_col(from.x.min(to.x)), to_col(from.x.max(to.x)));
            let row = to_row(from.y);
            for col in left..=right {
                let mut sides = 0;
                if col > left {
                    sides |= LEFT;
                }
                if col < right {
                    sides |= RIGHT;
                }
                link(col, row, sides, *dashed, orphan);
            }
        }
    }
    cells
}

/// Paint waterfall row commands into `area`. Labels are clipped to the
/// first `tree_cols` columns; info messages may use the full width.
pub fn paint_rows(buf: &mut Buffer, area: Rect, commands: &[RenderCommand], tree_cols: u16) {
    for ((col, row), links) in collect_links(commands) {
        if links.sides == 0 {
            continue;
        }
        let token = if links.orphan {
            ThemeToken::OrphanConnector
        } else {
            ThemeToken::Connector
        };
        let style = Style::default().fg(theme_to_color(token));
        put_str(buf, area, col, row, &links.glyph().to_string(), area.width, style);
    }

    for cmd in commands {
        match cmd {
            RenderCommand::DrawText {
                position,
                text,
                color,
                ..
            } => {
                let (limit, style) = match color {
                    ThemeToken::InfoMessage => (
                        area.width,
                        Style::default()
                            .fg(theme_to_color(*color))
                            .add_modifier(Modifier::ITALIC),
                    ),
                    _ => (tree_cols, Style::default().fg(theme_to_color(*color))),
                };
                put_str(buf, area, to_col(position.x), to_row(position.y), text, limit, style);
            }
            RenderCommand::DrawRect {
                rect,
                color,
                label,
                span_id: Some(_),
                ..
            } => {
                let col = to_col(rect.x);
                let width = ((rect.w / UNITS_PER_COL).round() as usize).max(1);
                let label = label.as_deref().unwrap_or("");
                let fill: String = if width >= label.len() + 2 {
                    format!(" {label:<w$}", w = width - 1)
                } else {
                    " ".repeat(width)
                };
                let style = Style::default().fg(Color::Black).bg(theme_to_color(*color));
                put_str(buf, area, col, to_row(rect.y), &fill, area.width, style);
            }
            _ => {}
        }
    }
}

/// Paint the time axis into a single terminal line.
pub fn paint_axis(buf: &mut Buffer, area: Rect, commands: &[RenderCommand]) {
    let background = Style::default().bg(theme_to_color(ThemeToken::AxisBackground));
    for cmd in commands {
        match cmd {
            RenderCommand::DrawRect { rect, color, .. } => {
                let width = (rect.w / UNITS_PER_COL).round() as usize;
                let style = Style::default().bg(theme_to_color(*color));
                put_str(buf, area, to_col(rect.x), 0, &" ".repeat(width), area.width, style);
            }
            RenderCommand::DrawLine { from, color, .. } => {
                let glyph = if *color == ThemeToken::AxisGridline { "|" } else { "·" };
                let style = background.fg(theme_to_color(*color));
                put_str(buf, area, to_col(from.x), 0, glyph, area.width, style);
            }
            RenderCommand::DrawText {
                position,
                text,
                color,
                ..
            } => {
                let style = background.fg(theme_to_color(*color));
                put_str(buf, area, to_col(position.x), 0, text, area.width, style);
            }
            _ => {}
        }
    }
}

/// Paint the window selector: the whole trace, with the view window
/// highlighted.
pub fn paint_selector(buf: &mut Buffer, area: Rect, geometry: &Geometry, window: ViewWindow) {
    let label = format!(
        " window {:.1}%-{:.1}%",
        window.start * 100.0,
        window.end * 100.0
    );
    let text = Style::default().fg(theme_to_color(ThemeToken::TextSecondary));
    put_str(buf, area, 0, 0, &label, geometry.tree_cols, text);

    let timeline = f64::from(geometry.timeline_cols());
    let first = (window.start * timeline).floor() as u16;
    let last = ((window.end * timeline).ceil() as u16).max(first + 1);
    for i in 0..geometry.timeline_cols() {
        let inside = (first..last).contains(&i);
        let (glyph, style) = if inside {
            ("█", Style::default().fg(theme_to_color(ThemeToken::AxisGridline)))
        } else {
            ("─", Style::default().fg(theme_to_color(ThemeToken::Border)))
        };
        put_str(
            buf,
            area,
            i64::from(geometry.tree_cols + i),
            0,
            glyph,
            area.width,
            style,
        );
    }
}

fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let geometry = app.geometry;
    let layout = app.layout();
    let cols = f64::from(geometry.cols) * UNITS_PER_COL;
    let tree_units = f64::from(geometry.tree_cols) * UNITS_PER_COL;

    let trace = app.view.trace();
    let header = Block::default()
        .title(format!(
            " waterfall: {} | {} spans | ↑↓ select | ←→ pan | +/- zoom | 0 reset | enter fold | q quit ",
            trace.root.label(),
            trace.span_count()
        ))
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(header, Rect::new(0, 0, area.width, 1));

    let (view_start, view_end) = app.view.window().to_timestamps(0.0, trace.duration());
    let axis_viewport = Viewport {
        x: tree_units,
        y: 0.0,
        width: cols - tree_units,
        height: 1.0,
        dpr: 1.0,
    };
    let axis = render_time_axis(&axis_viewport, view_start, view_end);
    let preview = app.view.preview_window();

    let content_area = Rect::new(0, HEADER_ROWS, area.width, geometry.content_rows());
    let viewport = Viewport {
        x: 0.0,
        y: app.scroll as f64,
        width: cols,
        height: f64::from(geometry.content_rows()),
        dpr: 1.0,
    };
    let errors = app.view.errors().clone();
    let rows = render_rows(app.view.waterfall(), &errors, &layout, &viewport);
    let status = status_line(app, &errors);

    let buf = frame.buffer_mut();
    paint_selector(buf, Rect::new(0, SELECTOR_ROW, area.width, 1), &geometry, preview);
    paint_axis(buf, Rect::new(0, SELECTOR_ROW + 1, area.width, 1), &axis);

    let background = Block::default()
        .borders(Borders::NONE)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(background, content_area);
    let buf = frame.buffer_mut();
    paint_rows(buf, content_area, &rows, geometry.tree_cols);

    if let Some(line) = app.selected.checked_sub(app.scroll)
        && line < usize::from(content_area.height)
    {
        let row = Rect::new(0, content_area.y + line as u16, area.width, 1);
        buf.set_style(row, Style::default().add_modifier(Modifier::REVERSED));
    }

    let status_area = Rect::new(0, area.height.saturating_sub(1), area.width, 1);
    let style = Style::default().fg(Color::Gray);
    put_str(buf, status_area, 0, 0, &status, area.width, style);
}

/// Details of the selected span for the bottom line.
fn status_line(app: &mut App, errors: &waterfall_core::model::SpanErrors) -> String {
    let selected = app.selected;
    let Some(row) = app
        .view
        .waterfall()
        .displayed_items()
        .nth(selected)
        .and_then(|item| item.row())
    else {
        return String::new();
    };
    let span = &row.span;
    let mut line = format!(
        " #{} {} ({})",
        row.span_number,
        span.label(),
        format_duration(span.duration())
    );
    if let Some(status) = &span.status {
        line.push_str(&format!(" [{status}]"));
    }
    let span_errors = errors.for_span(&span.span_id);
    if let Some(first) = span_errors.first() {
        line.push_str(&format!(" | {} error(s): {}", span_errors.len(), first.title));
    }
    line
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        let size = terminal.size()?;
        if size.width != app.geometry.cols || size.height != app.geometry.rows {
            app.resize(size.width, size.height);
        }
        terminal.draw(|frame| draw(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !app.on_key(key.code) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(cols, rows) => app.resize(cols, rows),
                _ => {}
            }
        }
    }
}
