pub mod child_lookup;
pub mod errors;
pub mod filter;
pub mod span;
pub mod trace;
pub mod view_window;

pub use child_lookup::ChildLookup;
pub use errors::{SpanErrors, TraceError};
pub use filter::SpanFilter;
pub use span::{GAP_DESCRIPTION, Span, SpanId, SpanKind, TreeDepth};
pub use trace::Trace;
pub use view_window::{DragController, DragHandle, ViewWindow};
