use waterfall_protocol::{Point, Rect, RenderCommand, SharedStr, TextAlign, ThemeToken, Viewport};

use crate::config::RowLayout;
use crate::model::SpanErrors;
use crate::views::info_message::InfoMessage;
use crate::views::time_axis::format_duration;
use crate::views::waterfall::{SpanRow, Waterfall, WaterfallItem};

const LABEL_PADDING: f64 = 4.0;
const CONNECTOR_WIDTH: f64 = 1.0;
const MIN_BAR_WIDTH: f64 = 1.0;
const BAR_HEIGHT_RATIO: f64 = 0.75;

/// Turn flattened rows into render commands.
///
/// Only displayed items are drawn; hidden and filtered rows have already been
/// folded into the info messages. The left `layout.tree_column` share of the
/// viewport holds connectors and labels, the rest holds the span bars, whose
/// `bounds` are taken relative to that column.
pub fn render_rows(
    waterfall: &Waterfall,
    errors: &SpanErrors,
    layout: &RowLayout,
    viewport: &Viewport,
) -> Vec<RenderCommand> {
    let tree_width = viewport.width * layout.tree_column;
    let mut commands = Vec::with_capacity(waterfall.items.len() * 4 + 2);

    commands.push(RenderCommand::BeginGroup {
        id: "waterfall".into(),
        label: Some("Span waterfall".into()),
    });

    let mut line = 0usize;
    for item in waterfall.displayed_items() {
        let top = line as f64 * layout.row_height;
        line += 1;
        if !viewport.intersects_rows(top, layout.row_height) {
            continue;
        }
        let y = top - viewport.y;
        match item {
            WaterfallItem::Info(message) => push_info(&mut commands, message, y, layout),
            WaterfallItem::Gap(row) | WaterfallItem::Span(row) => {
                push_row(&mut commands, row, errors, y, layout, tree_width, viewport.width);
            }
        }
    }

    if let Some(trailing) = &waterfall.trailing {
        let top = line as f64 * layout.row_height;
        if viewport.intersects_rows(top, layout.row_height) {
            push_info(&mut commands, trailing, top - viewport.y, layout);
        }
    }

    commands.push(RenderCommand::EndGroup);
    commands
}

/// Number of display lines the waterfall occupies, including the trailing
/// summary. Scrollbars size themselves from this.
pub fn line_count(waterfall: &Waterfall) -> usize {
    waterfall.displayed_items().count() + usize::from(waterfall.trailing.is_some())
}

fn push_info(
    commands: &mut Vec<RenderCommand>,
    message: &InfoMessage,
    y: f64,
    layout: &RowLayout,
) {
    commands.push(RenderCommand::DrawText {
        position: Point::new(LABEL_PADDING, y + layout.row_height / 2.0),
        text: SharedStr::from(message.to_string()),
        color: ThemeToken::InfoMessage,
        font_size: font_size(layout),
        align: TextAlign::Left,
    });
}

fn push_row(
    commands: &mut Vec<RenderCommand>,
    row: &SpanRow,
    errors: &SpanErrors,
    y: f64,
    layout: &RowLayout,
    tree_width: f64,
    total_width: f64,
) {
    let indent = layout.indent;
    let bottom = y + layout.row_height;
    let mid = y + layout.row_height / 2.0;

    // A marker at depth d continues the line into the depth-d span's later
    // siblings, which sits in the same column as that span's own elbow.
    for marker in &row.continuing_depths {
        let x = f64::from(marker.depth().saturating_sub(1)) * indent + indent / 2.0;
        commands.push(connector(Point::new(x, y), Point::new(x, bottom), marker.is_orphan()));
    }

    // Elbow from the parent's connector into this row.
    if row.depth > 0 {
        let parent_x = f64::from(row.depth - 1) * indent + indent / 2.0;
        let orphan = row.span.is_orphan;
        commands.push(connector(Point::new(parent_x, y), Point::new(parent_x, mid), orphan));
        commands.push(connector(
            Point::new(parent_x, mid),
            Point::new(f64::from(row.depth) * indent, mid),
            orphan,
        ));
        if !row.is_last {
            commands.push(connector(
                Point::new(parent_x, mid),
                Point::new(parent_x, bottom),
                orphan,
            ));
        }
    }

    let mut label = row.span.label();
    if row.num_children > 0 {
        let marker = if row.is_collapsed { '+' } else { '-' };
        label = format!("[{marker}{}] {label}", row.num_children);
    }
    commands.push(RenderCommand::DrawText {
        position: Point::new(f64::from(row.depth) * indent + LABEL_PADDING, mid),
        text: SharedStr::from(label),
        color: if row.span.is_gap() {
            ThemeToken::TextMuted
        } else {
            ThemeToken::TextPrimary
        },
        font_size: font_size(layout),
        align: TextAlign::Left,
    });

    let has_errors = errors.has_errors(&row.span.span_id);
    let color = if row.span.is_gap() {
        ThemeToken::GapBar
    } else if has_errors {
        ThemeToken::SpanError
    } else if row.is_root {
        ThemeToken::RootBar
    } else {
        ThemeToken::SpanBar
    };

    // Clip the bar to the timeline column.
    let start = tree_width + row.bounds.left;
    let left = start.max(tree_width);
    let right = (start + row.bounds.width.max(MIN_BAR_WIDTH)).min(total_width);
    if right > left {
        let bar_height = layout.row_height * BAR_HEIGHT_RATIO;
        let bar_top = y + (layout.row_height - bar_height) / 2.0;
        commands.push(RenderCommand::DrawRect {
            rect: Rect::new(left, bar_top, right - left, bar_height),
            color,
            border_color: has_errors.then_some(ThemeToken::Border),
            label: Some(SharedStr::from(format_duration(row.span.duration().abs()))),
            span_id: Some(row.span.span_id.clone()),
        });
    }
}

fn connector(from: Point, to: Point, orphan: bool) -> RenderCommand {
    RenderCommand::DrawLine {
        from,
        to,
        color: if orphan {
            ThemeToken::OrphanConnector
        } else {
            ThemeToken::Connector
        },
        width: CONNECTOR_WIDTH,
        dashed: orphan,
    }
}

fn font_size(layout: &RowLayout) -> f64 {
    (layout.row_height * 0.5).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Span, SpanFilter, SpanId, Trace, TraceError, ViewWindow};
    use crate::views::bounds::bounds_generator;
    use crate::views::waterfall::{FlattenContext, flatten_trace};

    fn waterfall(window: ViewWindow, filter: Option<&SpanFilter>) -> Waterfall {
        let mut orphan = Span::new("o", Some("missing".into()), 0.6, 0.7);
        orphan.op = Some("orphan.op".into());
        let trace = Trace::new(
            Span::new("r", None, 0.0, 1.0).with_op("http.server"),
            vec![
                Span::new("a", Some("r".into()), 0.0, 0.2).with_op("db"),
                Span::new("a1", Some("a".into()), 0.0, 0.1),
                Span::new("b", Some("r".into()), 0.5, 0.6).with_op("cache"),
                orphan,
            ],
            None,
        );
        let bounds = bounds_generator(0.0, 1.0, window, 600.0);
        let ctx = FlattenContext::new(&bounds).with_filter(filter);
        flatten_trace(&trace, &ctx)
    }

    fn layout() -> RowLayout {
        RowLayout {
            row_height: 20.0,
            indent: 10.0,
            tree_column: 0.4,
        }
    }

    fn rects(commands: &[RenderCommand]) -> Vec<(String, ThemeToken, Rect)> {
        commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawRect {
                    rect,
                    color,
                    span_id: Some(id),
                    ..
                } => Some((id.to_string(), *color, *rect)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn bars_are_offset_by_tree_column() {
        let wf = waterfall(ViewWindow::full(), None);
        let cmds = render_rows(&wf, &SpanErrors::new(), &layout(), &Viewport::new(1000.0, 400.0));
        let bars = rects(&cmds);

        // r, a, a1, gap, b, o
        assert_eq!(bars.len(), 6);
        assert_eq!(bars[0].1, ThemeToken::RootBar);
        assert!((bars[0].2.x - 400.0).abs() < 1e-9);
        assert!((bars[0].2.w - 600.0).abs() < 1e-9);
        assert_eq!(bars[3].1, ThemeToken::GapBar);
        assert!((bars[4].2.y - bars[3].2.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn error_spans_use_error_token() {
        let wf = waterfall(ViewWindow::full(), None);
        let mut errors = SpanErrors::new();
        errors.push(
            SpanId::from("b"),
            TraceError {
                event_id: "e1".into(),
                title: "Timeout".into(),
                level: None,
            },
        );
        let cmds = render_rows(&wf, &errors, &layout(), &Viewport::new(1000.0, 400.0));
        let b = rects(&cmds).into_iter().find(|(id, _, _)| id == "b");
        assert!(b.is_some_and(|(_, color, _)| color == ThemeToken::SpanError));
    }

    #[test]
    fn orphan_rows_draw_dashed_connectors() {
        let wf = waterfall(ViewWindow::full(), None);
        let cmds = render_rows(&wf, &SpanErrors::new(), &layout(), &Viewport::new(1000.0, 400.0));
        let dashed = cmds
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    RenderCommand::DrawLine {
                        dashed: true,
                        color: ThemeToken::OrphanConnector,
                        ..
                    }
                )
            })
            .count();
        // The orphan is the root's last child: two elbow segments, no tail.
        assert_eq!(dashed, 2);
    }

    #[test]
    fn continuing_lines_sit_in_ancestor_elbow_columns() {
        let wf = waterfall(ViewWindow::full(), None);
        let cmds = render_rows(&wf, &SpanErrors::new(), &layout(), &Viewport::new(1000.0, 400.0));
        // a1 is the third row (y 40..60): r's line down to b at x 5 runs the
        // full row, a1's own elbow at x 15 stops at the middle.
        let verticals: Vec<_> = cmds
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawLine { from, to, .. }
                    if from.x == to.x && from.y >= 40.0 && to.y <= 60.0 =>
                {
                    Some((from.x, from.y, to.y))
                }
                _ => None,
            })
            .collect();
        assert_eq!(verticals, vec![(5.0, 40.0, 60.0), (15.0, 40.0, 50.0)]);
    }

    #[test]
    fn hidden_rows_collapse_into_info_text() {
        let wf = waterfall(ViewWindow::clamped(0.45, 1.0), None);
        let cmds = render_rows(&wf, &SpanErrors::new(), &layout(), &Viewport::new(1000.0, 400.0));
        let texts: Vec<_> = cmds
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawText {
                    text,
                    color: ThemeToken::InfoMessage,
                    ..
                } => Some(text.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["2 spans out of view".to_string()]);
        assert_eq!(line_count(&wf), 5);
    }

    #[test]
    fn rows_below_viewport_are_culled() {
        let wf = waterfall(ViewWindow::full(), None);
        let mut viewport = Viewport::new(1000.0, 40.0);
        viewport.y = 20.0;
        let cmds = render_rows(&wf, &SpanErrors::new(), &layout(), &viewport);
        let ids: Vec<_> = rects(&cmds).into_iter().map(|(id, _, rect)| (id, rect.y)).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].0, "a");
        assert!(ids[0].1 < 20.0);
    }

    #[test]
    fn trailing_summary_is_drawn_last() {
        let filter = SpanFilter::from_ids(["r", "a", "a1"].map(SpanId::from));
        let wf = waterfall(ViewWindow::full(), Some(&filter));
        let cmds = render_rows(&wf, &SpanErrors::new(), &layout(), &Viewport::new(1000.0, 400.0));
        let last_text = cmds.iter().rev().find_map(|c| match c {
            RenderCommand::DrawText { text, .. } => Some(text.to_string()),
            _ => None,
        });
        assert_eq!(last_text.as_deref(), Some("2 spans filtered out"));
    }
}
