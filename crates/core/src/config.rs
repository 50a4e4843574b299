use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ViewWindow;
use crate::views::gap::MIN_GAP_SECONDS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("min_gap_secs must be a non-negative number, got {0}")]
    InvalidGap(f64),
    #[error("layout values must be positive")]
    InvalidLayout,
}

/// Geometry of the row list, in the renderer's logical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowLayout {
    pub row_height: f64,
    /// Horizontal space per tree depth level.
    pub indent: f64,
    /// Fraction of the viewport width given to the tree/label column; the
    /// rest holds the span bars.
    pub tree_column: f64,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            row_height: 24.0,
            indent: 16.0,
            tree_column: 0.4,
        }
    }
}

/// Settings for a waterfall view. Every field has a default, so a partial
/// JSON object is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterfallConfig {
    /// Shortest idle interval between siblings that gets a gap row.
    pub min_gap_secs: f64,
    pub layout: RowLayout,
    pub initial_window: ViewWindow,
}

impl Default for WaterfallConfig {
    fn default() -> Self {
        Self {
            min_gap_secs: MIN_GAP_SECONDS,
            layout: RowLayout::default(),
            initial_window: ViewWindow::full(),
        }
    }
}

impl WaterfallConfig {
    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        let mut config: WaterfallConfig = serde_json::from_slice(data)?;
        config.initial_window =
            ViewWindow::clamped(config.initial_window.start, config.initial_window.end);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_gap_secs.is_nan() || self.min_gap_secs < 0.0 {
            return Err(ConfigError::InvalidGap(self.min_gap_secs));
        }
        let layout = &self.layout;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(layout.row_height)
            || !positive(layout.indent)
            || !(0.0..1.0).contains(&layout.tree_column)
            || layout.tree_column == 0.0
        {
            return Err(ConfigError::InvalidLayout);
        }
        Ok(())
    }
}
