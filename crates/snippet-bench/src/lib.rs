//! Rendering-cost benchmarks for small markup snippets
//!
//! This crate measures how long a browser spends parsing, styling, laying out
//! and painting short markup fragments, and reports per-snippet mean and
//! standard deviation for each phase.
//!
//! # Features
//!
//! - **Cache-proof samples**: every copy of a snippet gets a run-unique token
//!   so no engine cache can serve a later copy
//! - **Order randomization**: all copies of all snippets are shuffled together
//! - **Baseline correction**: a minimum or empty-snippet baseline is subtracted
//!   from every phase
//! - **CPU warming**: background work keeps the CPU out of idle states between
//!   samples and is paused while a sample is timed
//! - **Multiple Output Formats**: JSON, Console, and Markdown reports
//!
//! # Example
//!
//! ```no_run
//! use snippet_bench::{Config, ChromiumHost, FileCounterStore, Harness};
//! use snippet_bench::probe::Collaborators;
//! use snippet_bench::reporter::{OutputFormat, Reporter};
//! use chromiumoxide::browser::BrowserConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_file("snippets.toml")?;
//! config.validate()?;
//!
//! let browser = BrowserConfig::builder().build().map_err(|e| anyhow::anyhow!(e))?;
//! let host = ChromiumHost::launch(browser, config.measurement.warm_quantum()).await?;
//! let counter = FileCounterStore::new("target/snippet-bench-counter.json");
//!
//! let collaborators = Collaborators {
//!     host: &host,
//!     clock: &host,
//!     scheduler: &host,
//!     warmer: &host,
//!     trace: Some(&host),
//! };
//! let mut harness = Harness::new(config.harness_config(), collaborators, &counter);
//! let results = harness.run(&config.benchmark.name, &config.load_snippets()?).await?;
//!
//! Reporter::new(OutputFormat::Console).report(&results)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Suites are configured using TOML files:
//!
//! ```toml
//! [benchmark]
//! name = "Border styles"
//! repeat_count = 20
//! seed = 42
//!
//! [measurement]
//! correction = "minimum"
//! keep_cpu_warm = true
//!
//! [[snippets]]
//! name = "radius"
//! markup = '<div style="border-radius: 4px">radius</div>'
//!
//! [[snippets]]
//! name = "table"
//! markup_file = "snippets/table.html"
//! ```

pub mod browser;
pub mod config;
pub mod correction;
pub mod counter;
pub mod error;
pub mod host;
pub mod probe;
pub mod reporter;
pub mod runner;
pub mod sample;
pub mod shuffle;
pub mod snippet;
pub mod stats;
pub mod warmer;

// Re-export main types for convenience
pub use browser::ChromiumHost;
pub use config::{Config, HarnessConfig};
pub use correction::{Baseline, CorrectionPolicy};
pub use counter::{CounterStore, FileCounterStore, MemoryCounterStore};
pub use error::BenchError;
pub use reporter::{OutputFormat, Reporter};
pub use runner::{BenchmarkResults, Harness};
pub use sample::PhaseSample;
pub use snippet::Snippet;
pub use stats::SnippetStats;
