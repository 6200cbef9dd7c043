//! CPU warming
//!
//! Idle-to-active transitions add highly variable latency to whatever runs
//! first after the CPU wakes up. Keeping a stream of short busy tasks going
//! between measurements removes that noise from the first measured phase of
//! each sample.
//!
//! The warmer itself never decides when to stop: the runner stops it before a
//! measurement window opens and restarts it after the window closes.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Result;
use crate::host::Warmer;

#[derive(Debug, Default)]
struct WarmerState {
    running: AtomicBool,
    // Bumped on every start and stop so a stale loop can tell it was superseded.
    generation: AtomicU64,
    // Set while a quantum may be spinning; `stop` waits for it to clear.
    busy: AtomicBool,
    quanta: AtomicU64,
}

impl WarmerState {
    fn is_current(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }
}

/// In-process [`Warmer`] running busy work on the tokio runtime.
///
/// Each iteration spins for one quantum of arithmetic filler and then yields,
/// so rendering and measurement tasks interleave with it. A quantum running on
/// another worker thread notices a stop within one filler step, and
/// [`Warmer::stop`] only returns once no quantum is spinning.
#[derive(Debug)]
pub struct CpuWarmer {
    quantum: Duration,
    state: Arc<WarmerState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CpuWarmer {
    pub fn new(quantum: Duration) -> Self {
        Self {
            quantum,
            state: Arc::new(WarmerState::default()),
            task: Mutex::new(None),
        }
    }

    /// Number of busy quanta completed since construction; cut-short quanta
    /// are not counted
    pub fn quanta(&self) -> u64 {
        self.state.quanta.load(Ordering::Relaxed)
    }
}

impl Default for CpuWarmer {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

/// Spin on random arithmetic until `quantum` has elapsed, or return `None` as
/// soon as `live` turns false.
fn burn<R: Rng>(quantum: Duration, rng: &mut R, live: impl Fn() -> bool) -> Option<f64> {
    let end = Instant::now() + quantum;
    let mut sum = 0.0;
    while Instant::now() < end {
        if !live() {
            return None;
        }
        sum += rng.gen::<f64>();
    }
    Some(sum)
}

#[async_trait]
impl Warmer for CpuWarmer {
    async fn start(&self) -> Result<()> {
        if self.state.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let state = Arc::clone(&self.state);
        let quantum = self.quantum;

        let handle = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            loop {
                // Raise `busy` before the liveness check so a concurrent stop
                // either waits for this quantum or prevents it.
                state.busy.store(true, Ordering::SeqCst);
                let burned = burn(quantum, &mut rng, || state.is_current(generation));
                state.busy.store(false, Ordering::SeqCst);
                match burned {
                    Some(sum) => {
                        std::hint::black_box(sum);
                        state.quanta.fetch_add(1, Ordering::Relaxed);
                    }
                    None => break,
                }
                tokio::task::yield_now().await;
            }
        });

        if let Ok(mut task) = self.task.lock() {
            if let Some(stale) = task.replace(handle) {
                stale.abort();
            }
        }
        debug!(generation, "CPU warmer started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.state.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
        // Abort only lands at the loop's next yield; a quantum already
        // spinning on another worker has to notice the new generation first.
        while self.state.busy.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        debug!("CPU warmer stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }
}

impl Drop for CpuWarmer {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}
