//! Benchmark run orchestration
//!
//! A run expands every snippet into unique copies, shuffles them, measures
//! each copy strictly one after another, subtracts the baseline, and
//! aggregates per snippet in the caller's order.
//!
//! ```text
//! snippets ─► expand ─► shuffle ─► measure (sequential) ─► correct ─► aggregate
//!   + __noop    ▲                     │ warmer stopped inside
//!               run counter           ▼ each sample window
//! ```
//!
//! # Example
//!
//! ```no_run
//! use snippet_bench::config::HarnessConfig;
//! use snippet_bench::counter::MemoryCounterStore;
//! use snippet_bench::host::{InstantClock, RenderHost, TokioScheduler, DEFAULT_FRAME_INTERVAL};
//! use snippet_bench::probe::Collaborators;
//! use snippet_bench::runner::Harness;
//! use snippet_bench::snippet::Snippet;
//! use snippet_bench::warmer::CpuWarmer;
//!
//! # async fn example(host: &dyn RenderHost) -> anyhow::Result<()> {
//! let clock = InstantClock::new();
//! let scheduler = TokioScheduler::new(DEFAULT_FRAME_INTERVAL);
//! let warmer = CpuWarmer::default();
//! let counter = MemoryCounterStore::default();
//!
//! let collaborators = Collaborators {
//!     host,
//!     clock: &clock,
//!     scheduler: &scheduler,
//!     warmer: &warmer,
//!     trace: None,
//! };
//! let mut harness = Harness::new(HarnessConfig::default(), collaborators, &counter);
//! let stats = harness
//!     .benchmark(&[Snippet::new("a", "<a>a</a>"), Snippet::new("b", "<b>b</b>")])
//!     .await?;
//! for s in &stats {
//!     println!("{}: {:.3}ms ± {:.3}", s.name, s.total_avg, s.total_std_dev);
//! }
//! # Ok(())
//! # }
//! ```

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::{validate_names, HarnessConfig};
use crate::correction::{correct, Baseline, CorrectionPolicy};
use crate::counter::{next_run_counter, CounterStore};
use crate::error::{BenchError, Result};
use crate::probe::{measure_sample, Collaborators, ProbeOptions};
use crate::sample::PhaseSample;
use crate::shuffle::shuffle;
use crate::snippet::{expand, ExpandedSnippet, Snippet};
use crate::stats::{aggregate, SnippetStats};

/// Results from a complete benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResults {
    /// Name of the benchmark suite
    pub suite_name: String,
    /// Counter value embedded in this run's expansion tokens
    pub run_counter: u64,
    /// Rendered copies per snippet
    pub repeat_count: u32,
    /// Correction policy applied
    pub correction: CorrectionPolicy,
    /// Per-phase amount subtracted from every sample
    pub baseline: Baseline,
    /// Physical samples measured, no-op samples included
    pub sample_count: usize,
    /// Timestamp when the run started
    pub started_at: String,
    /// Wall-clock duration of the whole run
    pub total_duration_ms: u64,
    /// Per-snippet statistics, in input order
    pub snippets: Vec<SnippetStats>,
}

/// Drives one host through complete benchmark runs
pub struct Harness<'a> {
    config: HarnessConfig,
    collaborators: Collaborators<'a>,
    counter: &'a dyn CounterStore,
    rng: StdRng,
}

impl<'a> Harness<'a> {
    pub fn new(
        config: HarnessConfig,
        collaborators: Collaborators<'a>,
        counter: &'a dyn CounterStore,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            collaborators,
            counter,
            rng,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Benchmark `snippets`, returning stats in the same order.
    ///
    /// # Errors
    ///
    /// - [`BenchError::Configuration`] for an empty snippet list, a zero
    ///   repeat count, or empty, duplicate or reserved names
    /// - [`BenchError::MissingData`] if a snippet ends up with no samples
    /// - [`BenchError::HostUnavailable`] if any host call fails mid-run
    pub async fn benchmark(&mut self, snippets: &[Snippet]) -> Result<Vec<SnippetStats>> {
        Ok(self.run("snippets", snippets).await?.snippets)
    }

    /// Benchmark `snippets` and keep the run metadata alongside the stats
    #[instrument(skip(self, snippets), fields(snippets = snippets.len()))]
    pub async fn run(&mut self, suite_name: &str, snippets: &[Snippet]) -> Result<BenchmarkResults> {
        if snippets.is_empty() {
            return Err(BenchError::config("at least one snippet is required"));
        }
        if self.config.repeat_count == 0 {
            return Err(BenchError::config("repeat_count must be greater than zero"));
        }
        let names: Vec<&str> = snippets.iter().map(|s| s.name.as_str()).collect();
        validate_names(&names)?;

        let start_time = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        let run_counter = next_run_counter(self.counter)?;

        let mut planned = Vec::with_capacity(snippets.len() + 1);
        if self.config.measures_noop() {
            planned.push(Snippet::noop());
        }
        planned.extend_from_slice(snippets);

        let mut expanded = expand(&planned, self.config.repeat_count, run_counter)?;
        shuffle(&mut expanded, &mut self.rng);

        info!(
            "Starting suite '{}': {} snippets x {} repeats ({} samples), run counter {}",
            suite_name,
            snippets.len(),
            self.config.repeat_count,
            expanded.len(),
            run_counter
        );

        let raw = self.measure_all(&expanded).await?;
        let sample_count = raw.len();
        let (samples, baseline) = correct(raw, self.config.correction)?;
        let stats = aggregate(&samples, &names)?;

        let results = BenchmarkResults {
            suite_name: suite_name.to_string(),
            run_counter,
            repeat_count: self.config.repeat_count,
            correction: self.config.correction,
            baseline,
            sample_count,
            started_at,
            total_duration_ms: start_time.elapsed().as_millis() as u64,
            snippets: stats,
        };
        info!(
            "Suite '{}' completed in {}ms",
            suite_name, results.total_duration_ms
        );
        Ok(results)
    }

    /// Measure every expanded snippet in order, leaving the warmer stopped
    async fn measure_all(&self, expanded: &[ExpandedSnippet]) -> Result<Vec<PhaseSample>> {
        let c = &self.collaborators;
        c.scheduler.delay(self.config.quiescence_delay).await?;

        if self.config.keep_cpu_warm {
            c.warmer.start().await?;
        }
        let measured = match c.scheduler.delay(self.config.warmup_delay).await {
            Ok(()) => self.measure_sequentially(expanded).await,
            Err(e) => Err(e),
        };

        match (measured, c.warmer.stop().await) {
            (Ok(samples), Ok(())) => Ok(samples),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), stop) => {
                if let Err(stop_err) = stop {
                    warn!("Failed to stop CPU warmer after aborted run: {}", stop_err);
                }
                Err(e)
            }
        }
    }

    async fn measure_sequentially(&self, expanded: &[ExpandedSnippet]) -> Result<Vec<PhaseSample>> {
        let options = ProbeOptions {
            separate_style_pass: self.config.separate_style_pass,
            keep_cpu_warm: self.config.keep_cpu_warm,
            trace_marks: self.config.trace_marks,
        };

        let mut samples = Vec::with_capacity(expanded.len());
        for (i, snippet) in expanded.iter().enumerate() {
            let sample = measure_sample(&self.collaborators, snippet, &options).await?;
            debug!("Sample {}/{} done", i + 1, expanded.len());
            samples.push(sample);
        }
        Ok(samples)
    }
}
