//! Collaborators the harness drives
//!
//! The harness never touches a rendering engine, clock or scheduler directly;
//! it talks to these traits. [`crate::browser::ChromiumHost`] implements all of
//! them against a real page, and the native types below cover clocks,
//! scheduling and tracing for hosts that live in-process.
//!
//! Every method takes `&self`: the harness calls them strictly in sequence,
//! so a single object may implement several traits at once.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::trace;

use crate::error::Result;
use crate::sample::Boundaries;

/// The region markup is rendered into
#[async_trait]
pub trait RenderHost: Send + Sync {
    /// Remove whatever the previous sample rendered
    async fn clear(&self) -> Result<()>;

    /// Inject markup into the render target, triggering a parse
    async fn inject(&self, markup: &str) -> Result<()>;

    /// Force a style recalculation of the render target
    async fn force_style(&self) -> Result<()>;

    /// Force a layout pass of the render target
    async fn force_layout(&self) -> Result<()>;

    /// Render `markup` and time its phases without leaving the host.
    ///
    /// Hosts that sit behind a transport should override this so no round
    /// trip lands between two clock readings. The readings must share the
    /// timeline of the host's [`Clock`]. `None` makes the harness drive the
    /// phases one call at a time.
    async fn render_timed(
        &self,
        _markup: &str,
        _separate_style_pass: bool,
    ) -> Result<Option<Boundaries>> {
        Ok(None)
    }
}

/// Monotonic, sub-millisecond clock in milliseconds
#[async_trait]
pub trait Clock: Send + Sync {
    async fn now(&self) -> Result<f64>;
}

/// Frame and task-queue suspension points
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Resolve at the next frame boundary
    async fn next_frame(&self) -> Result<()>;

    /// Resolve after `duration`; zero yields exactly one task-queue turn
    async fn delay(&self, duration: Duration) -> Result<()>;
}

/// Background work that keeps the CPU out of idle states
#[async_trait]
pub trait Warmer: Send + Sync {
    /// Start warming; no-op while running
    async fn start(&self) -> Result<()>;

    /// Stop warming; no-op while stopped
    async fn stop(&self) -> Result<()>;

    fn is_running(&self) -> bool;
}

/// Receiver for named timestamps, for inspecting a run in external tools.
///
/// Failures are logged by the harness and otherwise ignored.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn mark(&self, name: &str, timestamp: f64) -> Result<()>;
}

/// [`Clock`] backed by [`std::time::Instant`], relative to construction
#[derive(Debug, Clone, Copy)]
pub struct InstantClock {
    origin: Instant,
}

impl InstantClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for InstantClock {
    async fn now(&self) -> Result<f64> {
        Ok(self.origin.elapsed().as_secs_f64() * 1000.0)
    }
}

/// Default frame interval for 60Hz displays
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// [`Scheduler`] on tokio timers with a fixed-rate frame clock
pub struct TokioScheduler {
    frames: tokio::sync::Mutex<Interval>,
}

impl TokioScheduler {
    /// Must be called from within a tokio runtime.
    pub fn new(frame_interval: Duration) -> Self {
        let mut frames = tokio::time::interval(frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            frames: tokio::sync::Mutex::new(frames),
        }
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn next_frame(&self) -> Result<()> {
        self.frames.lock().await.tick().await;
        Ok(())
    }

    async fn delay(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }
}

/// [`TraceSink`] that forwards marks as `tracing` events
#[derive(Debug, Default)]
pub struct TracingTraceSink;

#[async_trait]
impl TraceSink for TracingTraceSink {
    async fn mark(&self, name: &str, timestamp: f64) -> Result<()> {
        trace!(mark = name, timestamp, "boundary mark");
        Ok(())
    }
}

/// [`TraceSink`] that keeps every mark in memory
#[derive(Debug, Default)]
pub struct RecordingTraceSink {
    marks: Mutex<Vec<(String, f64)>>,
}

impl RecordingTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marks(&self) -> Vec<(String, f64)> {
        self.marks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TraceSink for RecordingTraceSink {
    async fn mark(&self, name: &str, timestamp: f64) -> Result<()> {
        // A panic elsewhere cannot leave a half-pushed entry behind.
        self.marks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), timestamp));
        Ok(())
    }
}
