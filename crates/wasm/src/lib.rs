use std::sync::{Arc, Mutex};

use serde::Serialize;
use waterfall_core::WaterfallConfig;
use waterfall_core::model::{SpanFilter, SpanId, ViewWindow};
use waterfall_core::parsers::{parse_auto, parse_span_errors};
use waterfall_core::views::{WaterfallView, render_rows, render_time_axis};
use waterfall_protocol::Viewport;
use wasm_bindgen::prelude::*;

static TRACES: Mutex<Vec<WaterfallView>> = Mutex::new(Vec::new());

fn with_view<T>(
    handle: usize,
    f: impl FnOnce(&mut WaterfallView) -> Result<T, JsError>,
) -> Result<T, JsError> {
    let mut traces = TRACES
        .lock()
        .map_err(|_| JsError::new("trace store poisoned"))?;
    let view = traces
        .get_mut(handle)
        .ok_or_else(|| JsError::new("invalid trace handle"))?;
    f(view)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&e.to_string()))
}

/// Parse a trace (transaction event or span array) from JSON bytes, with an
/// optional config JSON. Returns a handle for later calls.
#[wasm_bindgen]
pub fn load_trace(data: &[u8], config_json: Option<String>) -> Result<usize, JsError> {
    let config = match config_json {
        Some(json) => WaterfallConfig::from_json(json.as_bytes())?,
        None => WaterfallConfig::default(),
    };
    let trace = parse_auto(data)?;
    let mut traces = TRACES
        .lock()
        .map_err(|_| JsError::new("trace store poisoned"))?;
    let handle = traces.len();
    traces.push(WaterfallView::new(Arc::new(trace), config));
    Ok(handle)
}

/// Attach span errors (`[{span_id, event_id, title, level}]`) to a trace.
/// Returns the number of error events loaded.
#[wasm_bindgen]
pub fn load_errors(handle: usize, data: &[u8]) -> Result<usize, JsError> {
    let errors = parse_span_errors(data)?;
    let count = errors.len();
    with_view(handle, |view| {
        view.set_errors(errors);
        Ok(count)
    })
}

/// Flatten the trace for a view window (fractions of the trace) and an
/// optional search query. Returns the rows and trailing summary as JSON.
#[wasm_bindgen]
pub fn flatten_rows(
    handle: usize,
    window_start: f64,
    window_end: f64,
    timeline_width: f64,
    search: Option<String>,
) -> Result<String, JsError> {
    with_view(handle, |view| {
        view.set_window(ViewWindow::clamped(window_start, window_end));
        view.set_timeline_width(timeline_width);
        let filter = search
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .map(|q| SpanFilter::search(view.trace(), q));
        view.set_filter(filter);
        to_json(view.waterfall())
    })
}

/// Render the current rows into a viewport, returning render commands as
/// JSON. Rows are laid out with the trace's configured layout.
#[wasm_bindgen]
pub fn render_waterfall(
    handle: usize,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    dpr: f64,
) -> Result<String, JsError> {
    with_view(handle, |view| {
        let layout = view.config().layout;
        let viewport = Viewport {
            x,
            y,
            width,
            height,
            dpr,
        };
        view.set_timeline_width(width * (1.0 - layout.tree_column));
        let errors = view.errors().clone();
        let commands = render_rows(view.waterfall(), &errors, &layout, &viewport);
        to_json(&commands)
    })
}

/// Render the time axis above the timeline column, returning render
/// commands as JSON.
#[wasm_bindgen]
pub fn render_axis(handle: usize, width: f64, height: f64) -> Result<String, JsError> {
    with_view(handle, |view| {
        let tree_width = width * view.config().layout.tree_column;
        let viewport = Viewport {
            x: tree_width,
            y: 0.0,
            width: width - tree_width,
            height,
            dpr: 1.0,
        };
        let (start, end) = view
            .preview_window()
            .to_timestamps(0.0, view.trace().duration());
        to_json(&render_time_axis(&viewport, start, end))
    })
}

/// Fold or unfold a span's subtree. Returns whether it is now collapsed.
#[wasm_bindgen]
pub fn toggle_collapsed(handle: usize, span_id: &str) -> Result<bool, JsError> {
    with_view(handle, |view| Ok(view.toggle_collapsed(&SpanId::from(span_id))))
}

#[derive(Debug, Serialize)]
struct TraceSummary<'a> {
    trace_id: &'a str,
    root_span_id: &'a str,
    label: String,
    span_count: usize,
    orphan_count: usize,
    start_timestamp: f64,
    end_timestamp: f64,
    duration: f64,
    sdk_name: Option<&'a str>,
    gaps_suppressed: bool,
    error_count: usize,
}

/// Trace metadata as JSON.
#[wasm_bindgen]
pub fn trace_summary(handle: usize) -> Result<String, JsError> {
    with_view(handle, |view| {
        let trace = view.trace();
        to_json(&TraceSummary {
            trace_id: &trace.trace_id,
            root_span_id: &trace.root.span_id,
            label: trace.root.label(),
            span_count: trace.span_count(),
            orphan_count: trace.orphan_count,
            start_timestamp: trace.start_timestamp,
            end_timestamp: trace.end_timestamp,
            duration: trace.duration(),
            sdk_name: trace.sdk_name.as_deref(),
            gaps_suppressed: trace.is_browser_js_sdk(),
            error_count: view.errors().len(),
        })
    })
}
