use serde::{Deserialize, Serialize};

use crate::model::ViewWindow;

/// Which branch of the bounds computation produced a [`SpanBounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundsKind {
    /// The trace has no duration; every span spans the full width.
    TraceTimestampsEqual,
    /// The window has no duration; every span spans the full width.
    InvalidViewWindow,
    /// Zero-duration span.
    TimestampsEqual,
    /// `end < start`; the bar is drawn between the swapped timestamps.
    TimestampsReversed,
    TimestampsStable,
}

/// Horizontal placement of a span bar within the timeline column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpanBounds {
    pub kind: BoundsKind,
    /// Left edge in pixels; negative when the span starts before the window.
    pub left: f64,
    pub width: f64,
    pub visible: bool,
}

/// Build the timestamp → pixel mapping for one render pass.
///
/// The returned closure takes a span's absolute `(start, end)` timestamps.
/// A span is visible when any part of it overlaps the window.
pub fn bounds_generator(
    trace_start: f64,
    trace_end: f64,
    window: ViewWindow,
    width_px: f64,
) -> impl Fn(f64, f64) -> SpanBounds {
    let trace_duration = trace_end - trace_start;
    let (view_start, view_end) = window.to_timestamps(trace_start, trace_end);
    let view_duration = view_end - view_start;

    move |start_timestamp, end_timestamp| {
        if trace_duration <= 0.0 {
            return full_width(BoundsKind::TraceTimestampsEqual, width_px);
        }
        if view_duration <= 0.0 {
            return full_width(BoundsKind::InvalidViewWindow, width_px);
        }

        let start = (start_timestamp - view_start) / view_duration;
        let end = (end_timestamp - view_start) / view_duration;

        if start_timestamp == end_timestamp {
            return SpanBounds {
                kind: BoundsKind::TimestampsEqual,
                left: start * width_px,
                width: 0.0,
                visible: (0.0..=1.0).contains(&start),
            };
        }

        let (kind, start, end) = if end_timestamp < start_timestamp {
            (BoundsKind::TimestampsReversed, end, start)
        } else {
            (BoundsKind::TimestampsStable, start, end)
        };

        SpanBounds {
            kind,
            left: start * width_px,
            width: (end - start) * width_px,
            visible: end > 0.0 && start < 1.0,
        }
    }
}

fn full_width(kind: BoundsKind, width_px: f64) -> SpanBounds {
    SpanBounds {
        kind,
        left: 0.0,
        width: width_px,
        visible: true,
    }
}
