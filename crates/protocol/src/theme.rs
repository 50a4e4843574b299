use serde::{Deserialize, Serialize};

/// Semantic color tokens resolved by the renderer's active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    Background,
    Border,

    TextPrimary,
    TextSecondary,
    TextMuted,

    // Span bars
    RootBar,
    SpanBar,
    GapBar,
    SpanError,

    // Tree connectors
    Connector,
    OrphanConnector,

    // Time axis
    AxisBackground,
    AxisTick,
    AxisGridline,

    // Hidden / filtered summaries
    InfoMessage,
}
