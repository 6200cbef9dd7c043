//! Scripted in-process host with a virtual clock
//!
//! Every render call advances the clock by a cost looked up from the markup
//! being rendered, so phase durations are exact and tests can assert on them.

#![allow(dead_code)]

use async_trait::async_trait;
use snippet_bench::error::{BenchError, Result};
use snippet_bench::host::{Clock, RenderHost, Scheduler, TraceSink, Warmer};
use snippet_bench::sample::Boundaries;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Virtual milliseconds one frame takes
pub const FRAME_MS: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Costs {
    pub parse: f64,
    pub style: f64,
    pub layout: f64,
    pub paint: f64,
}

impl Costs {
    pub fn new(parse: f64, style: f64, layout: f64, paint: f64) -> Self {
        Self {
            parse,
            style,
            layout,
            paint,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Clear,
    Frame,
    Yield,
    Delay(Duration),
    Inject(String),
    RenderTimed { markup: String, warm: bool },
    ForceStyle,
    ForceLayout,
    Now { warm: bool },
    WarmStart,
    WarmStop,
    Mark(String, f64),
}

#[derive(Default)]
struct RenderState {
    now: f64,
    current: Costs,
    style_pending: bool,
    paint_pending: bool,
}

type CostFn = Box<dyn Fn(&str) -> Costs + Send + Sync>;

pub struct FakeHost {
    costs: CostFn,
    /// Added to every render call, modelling fixed harness overhead
    overhead: f64,
    state: Mutex<RenderState>,
    calls: Mutex<Vec<Call>>,
    warm: AtomicBool,
    injects: AtomicUsize,
    fail_inject_at: Option<usize>,
    fail_marks: bool,
    timed_render: bool,
}

impl FakeHost {
    pub fn new(costs: impl Fn(&str) -> Costs + Send + Sync + 'static) -> Self {
        Self {
            costs: Box::new(costs),
            overhead: 0.0,
            state: Mutex::new(RenderState::default()),
            calls: Mutex::new(Vec::new()),
            warm: AtomicBool::new(false),
            injects: AtomicUsize::new(0),
            fail_inject_at: None,
            fail_marks: false,
            timed_render: false,
        }
    }

    /// Every markup costs the same
    pub fn uniform(costs: Costs) -> Self {
        Self::new(move |_| costs)
    }

    pub fn with_overhead(mut self, overhead: f64) -> Self {
        self.overhead = overhead;
        self
    }

    /// Fail the `n`th inject (0-based) with a host error
    pub fn failing_inject_at(mut self, n: usize) -> Self {
        self.fail_inject_at = Some(n);
        self
    }

    /// Time whole samples in one call; per-call overhead never lands inside
    pub fn with_timed_render(mut self) -> Self {
        self.timed_render = true;
        self
    }

    pub fn failing_marks(mut self) -> Self {
        self.fail_marks = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn injected(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Inject(markup) => Some(markup),
                _ => None,
            })
            .collect()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn advance(&self, ms: f64) {
        self.state.lock().unwrap().now += ms;
    }
}

#[async_trait]
impl RenderHost for FakeHost {
    async fn clear(&self) -> Result<()> {
        self.log(Call::Clear);
        let mut state = self.state.lock().unwrap();
        state.style_pending = false;
        state.paint_pending = false;
        Ok(())
    }

    async fn inject(&self, markup: &str) -> Result<()> {
        self.log(Call::Inject(markup.to_string()));
        let n = self.injects.fetch_add(1, Ordering::SeqCst);
        if self.fail_inject_at == Some(n) {
            return Err(BenchError::HostUnavailable("page crashed".to_string()));
        }
        let costs = (self.costs)(markup);
        let mut state = self.state.lock().unwrap();
        state.current = costs;
        state.now += costs.parse + self.overhead;
        state.style_pending = true;
        state.paint_pending = true;
        Ok(())
    }

    async fn force_style(&self) -> Result<()> {
        self.log(Call::ForceStyle);
        let mut state = self.state.lock().unwrap();
        if state.style_pending {
            state.now += state.current.style;
            state.style_pending = false;
        }
        state.now += self.overhead;
        Ok(())
    }

    async fn force_layout(&self) -> Result<()> {
        self.log(Call::ForceLayout);
        let mut state = self.state.lock().unwrap();
        if state.style_pending {
            state.now += state.current.style;
            state.style_pending = false;
        }
        state.now += state.current.layout + self.overhead;
        Ok(())
    }

    async fn render_timed(
        &self,
        markup: &str,
        separate_style_pass: bool,
    ) -> Result<Option<Boundaries>> {
        if !self.timed_render {
            return Ok(None);
        }
        self.log(Call::RenderTimed {
            markup: markup.to_string(),
            warm: self.warm.load(Ordering::SeqCst),
        });
        let n = self.injects.fetch_add(1, Ordering::SeqCst);
        if self.fail_inject_at == Some(n) {
            return Err(BenchError::HostUnavailable("page crashed".to_string()));
        }
        let costs = (self.costs)(markup);
        let mut state = self.state.lock().unwrap();
        state.current = costs;
        state.style_pending = false;
        state.paint_pending = false;

        let start_parse = state.now;
        state.now += costs.parse;
        let start_style = state.now;
        if separate_style_pass {
            state.now += costs.style;
        }
        let start_layout = state.now;
        if !separate_style_pass {
            state.now += costs.style;
        }
        state.now += costs.layout;
        let start_paint = state.now;
        state.now += costs.paint;
        Ok(Some(Boundaries {
            start_parse,
            start_style,
            start_layout,
            start_paint,
            end_paint: state.now,
        }))
    }
}

#[async_trait]
impl Clock for FakeHost {
    async fn now(&self) -> Result<f64> {
        self.log(Call::Now {
            warm: self.warm.load(Ordering::SeqCst),
        });
        Ok(self.state.lock().unwrap().now)
    }
}

#[async_trait]
impl Scheduler for FakeHost {
    async fn next_frame(&self) -> Result<()> {
        self.log(Call::Frame);
        self.advance(FRAME_MS);
        Ok(())
    }

    async fn delay(&self, duration: Duration) -> Result<()> {
        if !duration.is_zero() {
            self.log(Call::Delay(duration));
            self.advance(duration.as_secs_f64() * 1000.0);
            return Ok(());
        }
        self.log(Call::Yield);
        let mut state = self.state.lock().unwrap();
        if state.paint_pending {
            state.now += state.current.paint + self.overhead;
            state.paint_pending = false;
        }
        Ok(())
    }
}

#[async_trait]
impl Warmer for FakeHost {
    async fn start(&self) -> Result<()> {
        if !self.warm.swap(true, Ordering::SeqCst) {
            self.log(Call::WarmStart);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.warm.swap(false, Ordering::SeqCst) {
            self.log(Call::WarmStop);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.warm.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraceSink for FakeHost {
    async fn mark(&self, name: &str, timestamp: f64) -> Result<()> {
        if self.fail_marks {
            return Err(BenchError::HostUnavailable("marks unsupported".to_string()));
        }
        self.log(Call::Mark(name.to_string(), timestamp));
        Ok(())
    }
}

pub fn collaborators(host: &FakeHost) -> snippet_bench::probe::Collaborators<'_> {
    snippet_bench::probe::Collaborators {
        host,
        clock: host,
        scheduler: host,
        warmer: host,
        trace: Some(host),
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
