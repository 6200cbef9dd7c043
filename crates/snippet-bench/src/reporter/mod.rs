//! Rendering a finished run for people and machines
//!
//! # Output Formats
//!
//! - **JSON**: the full [`BenchmarkResults`], compact or indented
//! - **Console**: Human-readable table of per-phase means and deviations
//! - **Markdown**: one table row per snippet, for pasting into issues
//!
//! # Example
//!
//! ```no_run
//! use snippet_bench::reporter::{Reporter, OutputFormat};
//! use snippet_bench::runner::BenchmarkResults;
//!
//! # fn example(results: BenchmarkResults) -> anyhow::Result<()> {
//! let reporter = Reporter::new(OutputFormat::Console);
//! reporter.report(&results)?;
//!
//! // Or write to a file
//! Reporter::new(OutputFormat::Json)
//!     .write_to_file(&results, "results.json")?;
//! # Ok(())
//! # }
//! ```

mod console;
mod markdown;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::runner::BenchmarkResults;

pub use console::ConsoleReporter;
pub use markdown::MarkdownReporter;

/// How a run is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Console output with tables
    #[default]
    Console,
    /// Markdown table
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "json_pretty" => Ok(OutputFormat::JsonPretty),
            "console" => Ok(OutputFormat::Console),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => anyhow::bail!("Unknown output format: {}", other),
        }
    }
}

/// Renders [`BenchmarkResults`] in one [`OutputFormat`]
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print to stdout
    pub fn report(&self, results: &BenchmarkResults) -> Result<()> {
        let output = self.format_results(results)?;
        print!("{}", output);
        io::stdout().flush()?;
        Ok(())
    }

    /// Write to `path`, replacing any existing file
    pub fn write_to_file<P: AsRef<Path>>(&self, results: &BenchmarkResults, path: P) -> Result<()> {
        let path = path.as_ref();
        let output = self.format_results(results)?;
        fs::write(path, output)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    pub fn format_results(&self, results: &BenchmarkResults) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(results)?),
            OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(results)?),
            OutputFormat::Console => ConsoleReporter::format(results),
            OutputFormat::Markdown => MarkdownReporter::format(results),
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}
