//! Markdown reporter for benchmark results

use anyhow::Result;
use std::fmt::Write;

use crate::runner::BenchmarkResults;

/// Markdown format reporter
pub struct MarkdownReporter;

impl MarkdownReporter {
    /// Format benchmark results as a Markdown document
    pub fn format(results: &BenchmarkResults) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "# {}", results.suite_name)?;
        writeln!(output)?;
        writeln!(
            output,
            "Run {} started {} ({}ms). {} repeats per snippet, {} samples, `{}` correction.",
            results.run_counter,
            results.started_at,
            results.total_duration_ms,
            results.repeat_count,
            results.sample_count,
            results.correction
        )?;
        writeln!(output)?;

        writeln!(output, "| Snippet | Parse (ms) | Style (ms) | Layout (ms) | Paint (ms) | Total (ms) |")?;
        writeln!(output, "|---|---:|---:|---:|---:|---:|")?;
        for s in &results.snippets {
            writeln!(
                output,
                "| `{}` | {:.3} ± {:.3} | {:.3} ± {:.3} | {:.3} ± {:.3} | {:.3} ± {:.3} | {:.3} ± {:.3} |",
                s.name.replace('|', "\\|"),
                s.parse_avg,
                s.parse_std_dev,
                s.style_avg,
                s.style_std_dev,
                s.layout_avg,
                s.layout_std_dev,
                s.paint_avg,
                s.paint_std_dev,
                s.total_avg,
                s.total_std_dev
            )?;
        }

        Ok(output)
    }
}
