//! Configuration parsing for snippet benchmarks
//!
//! This module provides TOML-based configuration for defining the snippets to
//! compare, the sample-count policy, and the measurement methodology
//! (baseline correction, CPU warming, phase granularity).

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::correction::CorrectionPolicy;
use crate::error::{BenchError, Result};
use crate::snippet::{Snippet, NOOP_NAME};

/// Longest warming quantum accepted; past this the warmer starves the page.
pub const MAX_WARM_QUANTUM_MS: f64 = 1000.0;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Benchmark configuration
    pub benchmark: BenchmarkConfig,
    /// Measurement methodology
    #[serde(default)]
    pub measurement: MeasurementConfig,
    /// Snippets to compare, in report order
    #[serde(default)]
    pub snippets: Vec<SnippetSource>,
    /// Directory that relative `markup_file` paths resolve against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - Required fields are missing
    ///
    /// # Example
    ///
    /// ```no_run
    /// use snippet_bench::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_file("snippets.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use snippet_bench::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let toml = r#"
    ///     [benchmark]
    ///     name = "Rounded corners"
    ///
    ///     [[snippets]]
    ///     name = "radius"
    ///     markup = "<div style='border-radius: 4px'>radius</div>"
    /// "#;
    /// let config = Config::from_str(toml)?;
    /// assert_eq!(config.benchmark.repeat_count, 20);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Check the run can be started with this configuration
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Configuration`] for an empty snippet list, a zero
    /// repeat count, empty, duplicate or reserved snippet names, a snippet
    /// without exactly one markup source, a warming quantum outside
    /// `(0, MAX_WARM_QUANTUM_MS]`, or a non-finite CPU slowdown below 1.0.
    pub fn validate(&self) -> Result<()> {
        if self.benchmark.repeat_count == 0 {
            return Err(BenchError::config("repeat_count must be greater than zero"));
        }
        if self.snippets.is_empty() {
            return Err(BenchError::config("at least one snippet is required"));
        }
        let names: Vec<&str> = self.snippets.iter().map(|s| s.name.as_str()).collect();
        validate_names(&names)?;
        for snippet in &self.snippets {
            match (&snippet.markup, &snippet.markup_file) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(BenchError::config(format!(
                        "snippet '{}' needs exactly one of `markup` or `markup_file`",
                        snippet.name
                    )))
                }
            }
        }
        let quantum = self.measurement.warm_quantum_ms;
        if !(quantum > 0.0 && quantum <= MAX_WARM_QUANTUM_MS) {
            return Err(BenchError::config(format!(
                "warm_quantum_ms must be in (0, {}] (got {})",
                MAX_WARM_QUANTUM_MS, quantum
            )));
        }
        let slowdown = self.measurement.cpu_slowdown;
        if !(slowdown >= 1.0 && slowdown.is_finite()) {
            return Err(BenchError::config(format!(
                "cpu_slowdown must be >= 1.0 (got {})",
                self.measurement.cpu_slowdown
            )));
        }
        Ok(())
    }

    /// Validate and resolve every snippet's markup
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Configuration`] if validation fails or a
    /// `markup_file` cannot be read.
    pub fn load_snippets(&self) -> Result<Vec<Snippet>> {
        self.validate()?;
        self.snippets
            .iter()
            .map(|source| source.resolve(self.base_dir.as_deref()))
            .collect()
    }

    /// Runner settings derived from this configuration
    pub fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            repeat_count: self.benchmark.repeat_count,
            quiescence_delay: Duration::from_millis(self.benchmark.quiescence_delay_ms),
            warmup_delay: Duration::from_millis(self.benchmark.warmup_delay_ms),
            seed: self.benchmark.seed,
            correction: self.measurement.correction,
            inject_noop: self.measurement.inject_noop,
            separate_style_pass: self.measurement.separate_style_pass,
            keep_cpu_warm: self.measurement.keep_cpu_warm,
            trace_marks: self.measurement.trace_marks,
        }
    }
}

/// Reject names the runner cannot group unambiguously
pub(crate) fn validate_names(names: &[&str]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(BenchError::config("snippet names must not be empty"));
        }
        if *name == NOOP_NAME {
            return Err(BenchError::config(format!(
                "snippet name '{}' is reserved",
                NOOP_NAME
            )));
        }
        if !seen.insert(*name) {
            return Err(BenchError::config(format!(
                "duplicate snippet name '{}'",
                name
            )));
        }
    }
    Ok(())
}

/// Core benchmark configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Name of the benchmark suite
    pub name: String,
    /// Rendered copies per snippet (default: 20)
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
    /// Wait before warming starts, letting the host settle (default: 200)
    #[serde(default = "default_quiescence_delay_ms")]
    pub quiescence_delay_ms: u64,
    /// One-time wait after warming starts, before the first sample (default: 200)
    #[serde(default = "default_warmup_delay_ms")]
    pub warmup_delay_ms: u64,
    /// Fixed shuffle seed; a fresh order every run when unset
    #[serde(default)]
    pub seed: Option<u64>,
    /// JSON file holding the durable run counter
    #[serde(default)]
    pub counter_path: Option<PathBuf>,
}

fn default_repeat_count() -> u32 {
    20
}

fn default_quiescence_delay_ms() -> u64 {
    200
}

fn default_warmup_delay_ms() -> u64 {
    200
}

/// How samples are taken and corrected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Baseline correction policy (default: minimum)
    #[serde(default)]
    pub correction: CorrectionPolicy,
    /// Measure `__noop` samples alongside the snippets (default: true)
    #[serde(default = "default_true")]
    pub inject_noop: bool,
    /// Force a style pass separately from layout (default: true)
    #[serde(default = "default_true")]
    pub separate_style_pass: bool,
    /// Keep the CPU busy between samples (default: true)
    #[serde(default = "default_true")]
    pub keep_cpu_warm: bool,
    /// Length of one warming busy-work quantum in milliseconds (default: 1.0)
    #[serde(default = "default_warm_quantum_ms")]
    pub warm_quantum_ms: f64,
    /// Emit boundary timestamps to the trace sink (default: true)
    #[serde(default = "default_true")]
    pub trace_marks: bool,
    /// CPU slowdown multiplier for browser hosts (1.0 = no slowdown)
    #[serde(default = "default_cpu_slowdown")]
    pub cpu_slowdown: f64,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            correction: CorrectionPolicy::default(),
            inject_noop: true,
            separate_style_pass: true,
            keep_cpu_warm: true,
            warm_quantum_ms: default_warm_quantum_ms(),
            trace_marks: true,
            cpu_slowdown: default_cpu_slowdown(),
        }
    }
}

impl MeasurementConfig {
    /// The warming quantum, clamped to `MAX_WARM_QUANTUM_MS`. Values that
    /// [`Config::validate`] rejects fall back to the default quantum.
    pub fn warm_quantum(&self) -> Duration {
        let ms = self.warm_quantum_ms.min(MAX_WARM_QUANTUM_MS);
        Duration::try_from_secs_f64(ms / 1000.0)
            .ok()
            .filter(|quantum| !quantum.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_warm_quantum_ms() / 1000.0))
    }
}

fn default_true() -> bool {
    true
}

fn default_warm_quantum_ms() -> f64 {
    1.0
}

fn default_cpu_slowdown() -> f64 {
    1.0
}

/// A snippet as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetSource {
    pub name: String,
    /// Inline markup
    #[serde(default)]
    pub markup: Option<String>,
    /// Markup file, relative to the config file
    #[serde(default)]
    pub markup_file: Option<PathBuf>,
}

impl SnippetSource {
    fn resolve(&self, base_dir: Option<&Path>) -> Result<Snippet> {
        let markup = match (&self.markup, &self.markup_file) {
            (Some(markup), _) => markup.clone(),
            (None, Some(file)) => {
                let path = match base_dir {
                    Some(dir) if file.is_relative() => dir.join(file),
                    _ => file.clone(),
                };
                fs::read_to_string(&path).map_err(|e| {
                    BenchError::config(format!(
                        "failed to read markup for '{}' from {}: {}",
                        self.name,
                        path.display(),
                        e
                    ))
                })?
            }
            (None, None) => {
                return Err(BenchError::config(format!(
                    "snippet '{}' has no markup",
                    self.name
                )))
            }
        };
        Ok(Snippet::new(self.name.clone(), markup))
    }
}

/// Settings the runner needs for one run
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub repeat_count: u32,
    pub quiescence_delay: Duration,
    pub warmup_delay: Duration,
    pub seed: Option<u64>,
    pub correction: CorrectionPolicy,
    pub inject_noop: bool,
    pub separate_style_pass: bool,
    pub keep_cpu_warm: bool,
    pub trace_marks: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            repeat_count: default_repeat_count(),
            quiescence_delay: Duration::from_millis(default_quiescence_delay_ms()),
            warmup_delay: Duration::from_millis(default_warmup_delay_ms()),
            seed: None,
            correction: CorrectionPolicy::default(),
            inject_noop: true,
            separate_style_pass: true,
            keep_cpu_warm: true,
            trace_marks: true,
        }
    }
}

impl HarnessConfig {
    /// Whether `__noop` samples are measured in this run.
    ///
    /// No-op averaging cannot work without them, so it forces injection.
    pub fn measures_noop(&self) -> bool {
        self.inject_noop || self.correction == CorrectionPolicy::NoopAverage
    }
}
