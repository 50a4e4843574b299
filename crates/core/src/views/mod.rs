pub mod bounds;
pub mod container;
pub mod gap;
pub mod info_message;
pub mod row_commands;
pub mod time_axis;
pub mod waterfall;

pub use bounds::{BoundsKind, SpanBounds, bounds_generator};
pub use container::WaterfallView;
pub use gap::{GapPolicy, MIN_GAP_SECONDS, is_valid_gap};
pub use info_message::{InfoMessage, generate_info_message};
pub use row_commands::{line_count, render_rows};
pub use time_axis::{format_duration, render_time_axis};
pub use waterfall::{FlattenContext, SpanRow, Waterfall, WaterfallItem, flatten_trace};
