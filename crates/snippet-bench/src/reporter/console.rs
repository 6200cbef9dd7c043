//! Console reporter for benchmark results
//!
//! Provides human-readable output with ASCII tables.

use anyhow::Result;
use std::fmt::Write;

use crate::runner::BenchmarkResults;
use crate::stats::SnippetStats;

/// Console format reporter
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Format benchmark results for console output
    pub fn format(results: &BenchmarkResults) -> Result<String> {
        let mut output = String::new();

        // Header
        writeln!(output)?;
        writeln!(output, "╔══════════════════════════════════════════════════════════════════════════╗")?;
        writeln!(output, "║                         SNIPPET BENCHMARK RESULTS                        ║")?;
        writeln!(output, "╚══════════════════════════════════════════════════════════════════════════╝")?;
        writeln!(output)?;

        // Suite info
        writeln!(output, "Suite:       {}", results.suite_name)?;
        writeln!(output, "Started:     {}", results.started_at)?;
        writeln!(output, "Duration:    {}ms", results.total_duration_ms)?;
        writeln!(output, "Run counter: {}", results.run_counter)?;
        writeln!(output)?;

        // Configuration
        writeln!(output, "Configuration:")?;
        writeln!(output, "  Repeats per snippet: {}", results.repeat_count)?;
        writeln!(output, "  Samples measured:    {}", results.sample_count)?;
        writeln!(output, "  Correction:          {}", results.correction)?;
        writeln!(
            output,
            "  Baseline (ms):       parse {:.3}, style {:.3}, layout {:.3}, paint {:.3}",
            results.baseline.parse,
            results.baseline.style,
            results.baseline.layout,
            results.baseline.paint
        )?;
        writeln!(output)?;

        // Stats table
        writeln!(output, "  All times in ms, mean ± population stddev")?;
        writeln!(output, "  ┌──────────────────┬──────────────┬──────────────┬──────────────┬──────────────┬──────────────┐")?;
        writeln!(output, "  │ Snippet          │    Parse     │    Style     │    Layout    │    Paint     │    Total     │")?;
        writeln!(output, "  ├──────────────────┼──────────────┼──────────────┼──────────────┼──────────────┼──────────────┤")?;
        for stats in &results.snippets {
            Self::format_stats_row(&mut output, stats)?;
        }
        writeln!(output, "  └──────────────────┴──────────────┴──────────────┴──────────────┴──────────────┴──────────────┘")?;
        writeln!(output)?;

        Ok(output)
    }

    fn format_stats_row(output: &mut String, stats: &SnippetStats) -> Result<()> {
        let cell = |avg: f64, std_dev: f64| format!("{:.3}±{:.3}", avg, std_dev);

        writeln!(
            output,
            "  │ {:<16} │ {:>12} │ {:>12} │ {:>12} │ {:>12} │ {:>12} │",
            truncate(&stats.name, 16),
            cell(stats.parse_avg, stats.parse_std_dev),
            cell(stats.style_avg, stats.style_std_dev),
            cell(stats.layout_avg, stats.layout_std_dev),
            cell(stats.paint_avg, stats.paint_std_dev),
            cell(stats.total_avg, stats.total_std_dev),
        )?;

        Ok(())
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(width - 1).collect();
        short.push('…');
        short
    }
}
