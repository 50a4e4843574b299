mod app;
mod cli;
mod renderer;

use std::fs::File;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use waterfall_core::model::SpanFilter;
use waterfall_core::parsers::{parse_auto, parse_span_errors};
use waterfall_core::views::WaterfallView;
use waterfall_core::{WaterfallConfig, model::Trace};

use crate::app::App;
use crate::cli::Args;

/// Send logs to the file named by `WATERFALL_LOG`, filtered by `RUST_LOG`.
/// Without it nothing is logged, so the terminal UI stays clean.
fn init_logging() -> Result<()> {
    let Some(path) = std::env::var_os("WATERFALL_LOG") else {
        return Ok(());
    };
    let file = File::create(&path)
        .with_context(|| format!("creating log file {}", path.to_string_lossy()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Combine `--search` and `--op` into one filter, if either was given.
fn build_filter(trace: &Trace, args: &Args) -> Option<SpanFilter> {
    let search = args.search.as_deref().map(|q| SpanFilter::search(trace, q));
    let ops = (!args.ops.is_empty()).then(|| SpanFilter::operations(trace, &args.ops));
    match (search, ops) {
        (Some(search), Some(ops)) => Some(search.intersect(&ops)),
        (search, ops) => search.or(ops),
    }
}

fn main() -> Result<()> {
    init_logging()?;
    let args = Args::parse(std::env::args().skip(1))?;

    let config = match &args.config {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            WaterfallConfig::from_json(&data)?
        }
        None => WaterfallConfig::default(),
    };

    let data = std::fs::read(&args.trace)
        .with_context(|| format!("reading trace {}", args.trace.display()))?;
    let trace = parse_auto(&data)?;
    tracing::info!(
        spans = trace.span_count(),
        orphans = trace.orphan_count,
        duration = trace.duration(),
        "loaded trace"
    );

    let filter = build_filter(&trace, &args);
    let mut view = WaterfallView::new(Arc::new(trace), config);
    view.set_filter(filter);

    if let Some(path) = &args.errors {
        let data = std::fs::read(path)
            .with_context(|| format!("reading errors {}", path.display()))?;
        view.set_errors(parse_span_errors(&data)?);
    }

    let mut app = App::new(view);
    renderer::run(&mut app)
}
