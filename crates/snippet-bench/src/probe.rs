//! Per-sample measurement protocol
//!
//! ```text
//!  clear ─ frame ─ yield ─ frame ─ stop warmer
//!      t0 inject  t1 style  t2 layout  t3 yield (paint)  t4
//!  restart warmer
//! ```
//!
//! Clearing and waiting a full frame before each sample guarantees the
//! previous sample is torn down; waiting for a fresh frame edge means the
//! measured work never starts mid-frame.
//!
//! The window between t0 and t4 runs inside the host when it implements
//! [`RenderHost::render_timed`], and one call at a time otherwise.

use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::host::{Clock, RenderHost, Scheduler, TraceSink, Warmer};
use crate::sample::{Boundaries, PhaseSample};
use crate::snippet::ExpandedSnippet;
use std::time::Duration;

/// Everything a run talks to, borrowed for the run's duration
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub host: &'a dyn RenderHost,
    pub clock: &'a dyn Clock,
    pub scheduler: &'a dyn Scheduler,
    pub warmer: &'a dyn Warmer,
    pub trace: Option<&'a dyn TraceSink>,
}

/// Knobs that change how a single sample is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Force style separately; otherwise style folds into layout
    pub separate_style_pass: bool,
    /// Restart the warmer once the sample window closes
    pub keep_cpu_warm: bool,
    /// Emit boundary marks to the trace sink
    pub trace_marks: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            separate_style_pass: true,
            keep_cpu_warm: true,
            trace_marks: true,
        }
    }
}

/// Render one expanded snippet and time its phases.
///
/// The warmer is stopped before the first timestamp and restarted (when
/// warming is enabled) only after the last one.
#[instrument(skip_all, fields(token = %snippet.token))]
pub async fn measure_sample(
    c: &Collaborators<'_>,
    snippet: &ExpandedSnippet,
    options: &ProbeOptions,
) -> Result<PhaseSample> {
    c.host.clear().await?;
    c.scheduler.next_frame().await?;
    c.scheduler.delay(Duration::ZERO).await?;

    c.scheduler.next_frame().await?;
    c.warmer.stop().await?;

    let boundaries = match c
        .host
        .render_timed(&snippet.markup, options.separate_style_pass)
        .await?
    {
        Some(boundaries) => boundaries,
        None => render_stepwise(c, &snippet.markup, options).await?,
    };
    let sample = boundaries.into_sample(snippet.name.clone());
    debug!(
        parse = sample.parse,
        style = sample.style,
        layout = sample.layout,
        paint = sample.paint,
        "sample measured"
    );

    if options.trace_marks {
        if let Some(trace) = c.trace {
            emit_marks(trace, &snippet.token, &boundaries).await;
        }
    }

    if options.keep_cpu_warm {
        c.warmer.start().await?;
    }
    Ok(sample)
}

async fn render_stepwise(
    c: &Collaborators<'_>,
    markup: &str,
    options: &ProbeOptions,
) -> Result<Boundaries> {
    let start_parse = c.clock.now().await?;
    c.host.inject(markup).await?;
    let start_style = c.clock.now().await?;
    if options.separate_style_pass {
        c.host.force_style().await?;
    }
    let start_layout = c.clock.now().await?;
    c.host.force_layout().await?;
    let start_paint = c.clock.now().await?;
    c.scheduler.delay(Duration::ZERO).await?;
    let end_paint = c.clock.now().await?;

    Ok(Boundaries {
        start_parse,
        start_style,
        start_layout,
        start_paint,
        end_paint,
    })
}

async fn emit_marks(trace: &dyn TraceSink, token: &str, boundaries: &Boundaries) {
    for (name, timestamp) in boundaries.marks(token) {
        if let Err(e) = trace.mark(&name, timestamp).await {
            warn!("Failed to record trace mark '{}': {}", name, e);
        }
    }
}
