//! Span tree model, trace parsers, and the view transforms that turn a trace
//! into a waterfall of rows.
//!
//! ```text
//!   event JSON ──▶ Trace ──▶ flatten_trace ──▶ Waterfall ──▶ render_rows ──▶ RenderCommand[]
//!   (parsers)      (model)    (views)           (rows)        (views)
//! ```

pub mod config;
pub mod model;
pub mod parsers;
pub mod views;

pub use config::WaterfallConfig;
pub use parsers::{ParseError, parse_auto};
