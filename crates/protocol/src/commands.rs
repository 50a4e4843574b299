use serde::{Deserialize, Serialize};

use crate::shared_str::SharedStr;
use crate::theme::ThemeToken;
use crate::types::{Point, Rect};

/// A single, stateless render instruction.
///
/// The core emits a `Vec<RenderCommand>` for the waterfall and its time axis.
/// Renderers consume this list sequentially; each command carries all the
/// data it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Draw a filled rectangle, optionally labelled and tagged with the span
    /// it represents (for hit-testing and click-to-expand).
    DrawRect {
        rect: Rect,
        color: ThemeToken,
        border_color: Option<ThemeToken>,
        label: Option<SharedStr>,
        span_id: Option<SharedStr>,
    },

    DrawText {
        position: Point,
        text: SharedStr,
        color: ThemeToken,
        font_size: f64,
        align: TextAlign,
    },

    /// Draw a line segment. `dashed` is set for orphan connectors.
    DrawLine {
        from: Point,
        to: Point,
        color: ThemeToken,
        width: f64,
        dashed: bool,
    },

    /// Begin a logical group (the axis, the row list). Renderers may use this
    /// for batching or layer separation.
    BeginGroup {
        id: SharedStr,
        label: Option<SharedStr>,
    },

    EndGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}
