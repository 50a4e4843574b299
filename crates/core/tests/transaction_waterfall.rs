//! Integration test: parse a transaction event, flatten it under different
//! windows and filters, and render the rows to commands.

use std::sync::Arc;

use waterfall_core::model::{SpanFilter, ViewWindow};
use waterfall_core::parsers::{parse_auto, parse_span_errors};
use waterfall_core::views::{WaterfallItem, render_rows, render_time_axis};
use waterfall_core::{WaterfallConfig, views::WaterfallView};
use waterfall_protocol::{RenderCommand, ThemeToken, Viewport};

const ROOT: &str = "a1b2c3d4e5f60001";
const DB: &str = "a1b2c3d4e5f60002";
const POOL: &str = "a1b2c3d4e5f60003";
const HTTP: &str = "a1b2c3d4e5f60004";
const CACHE: &str = "a1b2c3d4e5f60005";

fn load_view() -> WaterfallView {
    let data = include_bytes!("fixtures/transaction.json");
    let trace = parse_auto(data).expect("failed to parse transaction fixture");
    let mut view = WaterfallView::new(Arc::new(trace), WaterfallConfig::default());
    view.set_timeline_width(600.0);
    view
}

/// `(kind, id-or-message)` for every displayed item.
fn displayed(view: &mut WaterfallView) -> Vec<(&'static str, String)> {
    view.waterfall()
        .displayed_items()
        .map(|item| match item {
            WaterfallItem::Info(message) => ("info", message.to_string()),
            WaterfallItem::Gap(row) => ("gap", row.span.span_id.to_string()),
            WaterfallItem::Span(row) => ("span", row.span.span_id.to_string()),
        })
        .collect()
}

#[test]
fn fixture_metadata() {
    let view = load_view();
    let trace = view.trace();
    assert_eq!(trace.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
    assert_eq!(trace.root.span_id, ROOT);
    assert_eq!(trace.root.description.as_deref(), Some("GET /api/users"));
    assert_eq!(trace.span_count(), 5);
    assert_eq!(trace.orphan_count, 1);
    assert_eq!(trace.sdk_name.as_deref(), Some("sentry.python"));
    assert!((trace.duration() - 1.0).abs() < 1e-9);
}

#[test]
fn full_window_numbers_rows_in_preorder() {
    let mut view = load_view();
    let waterfall = view.waterfall();

    let rows: Vec<_> = waterfall
        .rows()
        .map(|r| (r.span_number, r.span.span_id.to_string(), r.depth))
        .collect();
    let gap_id = format!("gap-{HTTP}");
    assert_eq!(
        rows,
        vec![
            (1, ROOT.to_string(), 0),
            (2, DB.to_string(), 1),
            (3, POOL.to_string(), 2),
            (4, gap_id, 1),
            (5, HTTP.to_string(), 1),
            (6, CACHE.to_string(), 1),
        ]
    );
    assert!(waterfall.trailing.is_none());
    assert_eq!(waterfall.next_span_number, 7);

    let cache = waterfall
        .span_rows()
        .find(|r| r.span.span_id == CACHE)
        .expect("orphan row missing");
    assert!(cache.span.is_orphan);
    assert!(cache.is_last);

    let root = waterfall.span_rows().next().expect("root row missing");
    assert!(root.is_root);
    assert_eq!(root.num_children, 3);
}

#[test]
fn zoomed_window_summarizes_hidden_spans() {
    let mut view = load_view();
    view.set_window(ViewWindow::clamped(0.45, 1.0));

    assert_eq!(
        displayed(&mut view),
        vec![
            ("span", ROOT.to_string()),
            ("info", "2 spans out of view".to_string()),
            ("gap", format!("gap-{HTTP}")),
            ("span", HTTP.to_string()),
            ("span", CACHE.to_string()),
        ]
    );
}

#[test]
fn search_filter_reports_filtered_spans() {
    let mut view = load_view();
    let filter = SpanFilter::search(view.trace(), "HTTP");
    view.set_filter(Some(filter));

    assert_eq!(
        displayed(&mut view),
        vec![
            ("span", ROOT.to_string()),
            ("info", "2 spans filtered out".to_string()),
            ("gap", format!("gap-{HTTP}")),
            ("span", HTTP.to_string()),
        ]
    );
    let trailing = view.waterfall().trailing.map(|m| m.to_string());
    assert_eq!(trailing.as_deref(), Some("1 spans filtered out"));
}

#[test]
fn errors_and_axis_render_with_theme_tokens() {
    let mut view = load_view();
    let errors =
        parse_span_errors(include_bytes!("fixtures/errors.json")).expect("failed to parse errors");
    view.set_errors(errors);

    let layout = view.config().layout;
    let viewport = Viewport::new(1000.0, 400.0);
    let errors = view.errors().clone();
    let commands = render_rows(view.waterfall(), &errors, &layout, &viewport);

    let http_color = commands.iter().find_map(|c| match c {
        RenderCommand::DrawRect {
            span_id: Some(id),
            color,
            ..
        } if *id == HTTP => Some(*color),
        _ => None,
    });
    assert_eq!(http_color, Some(ThemeToken::SpanError));

    let (start, end) = view.window().to_timestamps(0.0, view.trace().duration());
    let axis = render_time_axis(&viewport, start, end);
    assert!(axis.iter().any(|c| matches!(
        c,
        RenderCommand::DrawRect {
            color: ThemeToken::AxisBackground,
            ..
        }
    )));
}

#[test]
fn rows_serialize_with_type_tags() {
    let mut view = load_view();
    let json = serde_json::to_value(view.waterfall()).expect("serialize waterfall");
    let kinds: Vec<_> = json["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["type"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(kinds, ["span", "span", "span", "gap", "span", "span"]);
    assert_eq!(json["items"][1]["span"]["op"], "db.query");
}
