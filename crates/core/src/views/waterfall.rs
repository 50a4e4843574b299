use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::model::{ChildLookup, Span, SpanFilter, SpanId, Trace, TreeDepth};
use crate::views::bounds::SpanBounds;
use crate::views::gap::GapPolicy;
use crate::views::info_message::{InfoMessage, generate_info_message};

/// Read-only inputs of a flatten pass.
pub struct FlattenContext<'a, B> {
    /// Maps a span's `(start, end)` timestamps to its bar placement.
    pub bounds: &'a B,
    pub filter: Option<&'a SpanFilter>,
    pub gap_policy: GapPolicy,
    /// Spans whose subtrees are folded away.
    pub collapsed: Option<&'a HashSet<SpanId>>,
}

impl<'a, B> FlattenContext<'a, B>
where
    B: Fn(f64, f64) -> SpanBounds,
{
    pub fn new(bounds: &'a B) -> Self {
        Self {
            bounds,
            filter: None,
            gap_policy: GapPolicy::default(),
            collapsed: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<&'a SpanFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    pub fn with_collapsed(mut self, collapsed: Option<&'a HashSet<SpanId>>) -> Self {
        self.collapsed = collapsed;
        self
    }

    fn is_filtered_out(&self, span: &Span) -> bool {
        !span.is_gap() && self.filter.is_some_and(|f| !f.contains(&span.span_id))
    }

    fn is_collapsed(&self, span: &Span) -> bool {
        self.collapsed.is_some_and(|c| c.contains(&span.span_id))
    }
}

/// One renderable line of the waterfall: a real span or a gap.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRow {
    /// 1-based, strictly increasing across the whole pass.
    pub span_number: usize,
    pub depth: u32,
    /// Connector state inherited from the ancestors, used to draw this row.
    pub continuing_depths: Vec<TreeDepth>,
    pub is_last: bool,
    pub is_root: bool,
    pub span: Arc<Span>,
    pub bounds: SpanBounds,
    pub is_hidden: bool,
    pub is_filtered_out: bool,
    pub num_children: usize,
    pub is_collapsed: bool,
}

impl SpanRow {
    pub fn is_displayed(&self) -> bool {
        !self.is_hidden && !self.is_filtered_out
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaterfallItem {
    /// Summary of spans skipped directly above the next row.
    Info(InfoMessage),
    Gap(SpanRow),
    Span(SpanRow),
}

impl WaterfallItem {
    pub fn row(&self) -> Option<&SpanRow> {
        match self {
            Self::Gap(row) | Self::Span(row) => Some(row),
            Self::Info(_) => None,
        }
    }

    /// Info messages always display; rows only when visible and unfiltered.
    pub fn is_displayed(&self) -> bool {
        self.row().is_none_or(SpanRow::is_displayed)
    }
}

/// The result of one flatten pass.
#[derive(Debug, Clone, Serialize)]
pub struct Waterfall {
    pub items: Vec<WaterfallItem>,
    /// Spans hidden or filtered below the last displayed row.
    pub trailing: Option<InfoMessage>,
    pub next_span_number: usize,
    pub hidden_above: usize,
    pub filtered_above: usize,
}

impl Waterfall {
    /// Every span and gap row, displayed or not.
    pub fn rows(&self) -> impl Iterator<Item = &SpanRow> {
        self.items.iter().filter_map(WaterfallItem::row)
    }

    /// Rows for real spans only (gaps excluded).
    pub fn span_rows(&self) -> impl Iterator<Item = &SpanRow> {
        self.items.iter().filter_map(|item| match item {
            WaterfallItem::Span(row) => Some(row),
            _ => None,
        })
    }

    pub fn displayed_items(&self) -> impl Iterator<Item = &WaterfallItem> {
        self.items.iter().filter(|item| item.is_displayed())
    }
}

/// State threaded through the traversal. Each call takes it by value and
/// hands it back, so a sibling continues exactly where the previous subtree
/// left off.
struct Accumulator {
    items: Vec<WaterfallItem>,
    next_span_number: usize,
    hidden_above: usize,
    filtered_above: usize,
    /// Child lists not yet consumed in this pass.
    remaining: ChildLookup,
}

struct SpanNode<'a> {
    span: &'a Arc<Span>,
    is_root: bool,
    is_last: bool,
    depth: u32,
    continuing_depths: &'a [TreeDepth],
    previous_sibling_end: Option<f64>,
}

/// Flatten `trace` into waterfall rows, starting at its root.
pub fn flatten_trace<B>(trace: &Trace, ctx: &FlattenContext<'_, B>) -> Waterfall
where
    B: Fn(f64, f64) -> SpanBounds,
{
    let seed = Accumulator {
        items: Vec::with_capacity(trace.span_count() + 8),
        next_span_number: 1,
        hidden_above: 0,
        filtered_above: 0,
        remaining: trace.child_lookup.clone(),
    };
    let root = SpanNode {
        span: &trace.root,
        is_root: true,
        is_last: true,
        depth: 0,
        continuing_depths: &[],
        previous_sibling_end: None,
    };
    let acc = flatten_span(ctx, &trace.child_lookup, root, seed);

    let trailing = generate_info_message(acc.hidden_above, acc.filtered_above, false, false);
    tracing::trace!(
        items = acc.items.len(),
        hidden_above = acc.hidden_above,
        filtered_above = acc.filtered_above,
        "flattened trace"
    );

    Waterfall {
        items: acc.items,
        trailing,
        next_span_number: acc.next_span_number,
        hidden_above: acc.hidden_above,
        filtered_above: acc.filtered_above,
    }
}

fn flatten_span<B>(
    ctx: &FlattenContext<'_, B>,
    source: &ChildLookup,
    node: SpanNode<'_>,
    mut acc: Accumulator,
) -> Accumulator
where
    B: Fn(f64, f64) -> SpanBounds,
{
    let span = node.span;
    let bounds = (ctx.bounds)(span.start_timestamp, span.timestamp);
    let is_hidden = !bounds.visible;
    let is_filtered_out = ctx.is_filtered_out(span);
    let is_displayed = !is_hidden && !is_filtered_out;

    let show_gap =
        is_displayed && ctx.gap_policy.is_valid(node.previous_sibling_end, span.start_timestamp);
    let (gap_number, span_number) = if show_gap {
        (Some(acc.next_span_number), acc.next_span_number + 1)
    } else {
        (None, acc.next_span_number)
    };

    // The last sibling closes its level's connector; everyone else keeps it
    // running for the siblings below.
    let mut child_depths = node.continuing_depths.to_vec();
    if !node.is_last {
        child_depths.push(TreeDepth::for_span(span, node.depth));
    }

    let (hidden_before, filtered_before) = (acc.hidden_above, acc.filtered_above);
    if is_hidden {
        acc.hidden_above += 1;
    } else if is_filtered_out {
        acc.filtered_above += 1;
        acc.hidden_above = 0;
    } else {
        acc.hidden_above = 0;
        acc.filtered_above = 0;
    }

    if let Some(message) =
        generate_info_message(hidden_before, filtered_before, is_hidden, is_filtered_out)
    {
        acc.items.push(WaterfallItem::Info(message));
    }

    if let (Some(gap_number), Some(previous_end)) = (gap_number, node.previous_sibling_end) {
        let gap = Arc::new(Span::gap(span, previous_end, span.start_timestamp));
        acc.items.push(WaterfallItem::Gap(SpanRow {
            span_number: gap_number,
            depth: node.depth,
            continuing_depths: node.continuing_depths.to_vec(),
            is_last: false,
            is_root: false,
            bounds: (ctx.bounds)(gap.start_timestamp, gap.timestamp),
            span: gap,
            is_hidden: false,
            is_filtered_out: false,
            num_children: 0,
            is_collapsed: false,
        }));
    }

    let children = match acc.remaining.take(&span.span_id) {
        Some(children) => children,
        None => {
            if source.contains(&span.span_id) {
                tracing::debug!(
                    span_id = %span.span_id,
                    "children already rendered in this pass; dropping repeated edge"
                );
            }
            Vec::new()
        }
    };
    let is_collapsed = ctx.is_collapsed(span);

    acc.items.push(WaterfallItem::Span(SpanRow {
        span_number,
        depth: node.depth,
        continuing_depths: node.continuing_depths.to_vec(),
        is_last: node.is_last,
        is_root: node.is_root,
        span: Arc::clone(span),
        bounds,
        is_hidden,
        is_filtered_out,
        num_children: children.len(),
        is_collapsed,
    }));
    acc.next_span_number = span_number + 1;

    if is_collapsed {
        return acc;
    }

    let last_index = children.len().saturating_sub(1);
    let (acc, _) = children.iter().enumerate().fold(
        (acc, None),
        |(acc, previous_sibling_end), (index, child)| {
            let child_node = SpanNode {
                span: child,
                is_root: false,
                is_last: index == last_index,
                depth: node.depth + 1,
                continuing_depths: &child_depths,
                previous_sibling_end,
            };
            (
                flatten_span(ctx, source, child_node, acc),
                Some(child.timestamp),
            )
        },
    );
    acc
}
