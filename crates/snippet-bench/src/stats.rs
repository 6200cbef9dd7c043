//! Per-snippet statistics
//!
//! Samples arrive in shuffled order with many physical samples per logical
//! snippet. [`aggregate`] groups them by name and restores the caller's
//! snippet order.
//!
//! # Examples
//!
//! ```
//! use snippet_bench::sample::PhaseSample;
//! use snippet_bench::stats::aggregate;
//!
//! let samples = vec![
//!     PhaseSample::new("A", 10.0, 1.0, 1.0, 1.0),
//!     PhaseSample::new("A", 20.0, 1.0, 1.0, 1.0),
//! ];
//! let stats = aggregate(&samples, &["A"]).unwrap();
//! assert_eq!(stats[0].parse_avg, 15.0);
//! assert_eq!(stats[0].parse_std_dev, 5.0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{BenchError, Result};
use crate::sample::PhaseSample;

/// Mean and population standard deviation of every phase for one snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetStats {
    pub name: String,
    pub parse_avg: f64,
    pub style_avg: f64,
    pub layout_avg: f64,
    pub paint_avg: f64,
    pub total_avg: f64,
    pub parse_std_dev: f64,
    pub style_std_dev: f64,
    pub layout_std_dev: f64,
    pub paint_std_dev: f64,
    pub total_std_dev: f64,
    /// Number of physical samples behind these numbers
    pub sample_count: usize,
}

/// Running per-phase sums for one snippet
#[derive(Debug, Default, Clone, Copy)]
struct Sums {
    count: usize,
    parse: f64,
    style: f64,
    layout: f64,
    paint: f64,
    total: f64,
}

impl Sums {
    fn add(&mut self, parse: f64, style: f64, layout: f64, paint: f64, total: f64) {
        self.count += 1;
        self.parse += parse;
        self.style += style;
        self.layout += layout;
        self.paint += paint;
        self.total += total;
    }

    fn divided(&self) -> Sums {
        let n = self.count as f64;
        Sums {
            count: self.count,
            parse: self.parse / n,
            style: self.style / n,
            layout: self.layout / n,
            paint: self.paint / n,
            total: self.total / n,
        }
    }
}

/// Group `samples` by name and compute stats for each of `ordered_names`.
///
/// Output has exactly one entry per requested name, in the requested order.
/// Standard deviations use the population formula (divide by `n`).
///
/// # Errors
///
/// [`BenchError::MissingData`] if a requested name has no samples.
pub fn aggregate<S: AsRef<str>>(
    samples: &[PhaseSample],
    ordered_names: &[S],
) -> Result<Vec<SnippetStats>> {
    let mut sums: HashMap<&str, Sums> = HashMap::new();
    for s in samples {
        sums.entry(s.name.as_str())
            .or_default()
            .add(s.parse, s.style, s.layout, s.paint, s.total());
    }

    let means: HashMap<&str, Sums> = sums.iter().map(|(name, sum)| (*name, sum.divided())).collect();

    let mut squares: HashMap<&str, Sums> = HashMap::new();
    for s in samples {
        let mean = &means[s.name.as_str()];
        squares.entry(s.name.as_str()).or_default().add(
            (s.parse - mean.parse).powi(2),
            (s.style - mean.style).powi(2),
            (s.layout - mean.layout).powi(2),
            (s.paint - mean.paint).powi(2),
            (s.total() - mean.total).powi(2),
        );
    }

    ordered_names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let (Some(mean), Some(deviations)) = (means.get(name), squares.get(name)) else {
                return Err(BenchError::MissingData {
                    name: name.to_string(),
                });
            };
            let variance = deviations.divided();
            Ok(SnippetStats {
                name: name.to_string(),
                parse_avg: mean.parse,
                style_avg: mean.style,
                layout_avg: mean.layout,
                paint_avg: mean.paint,
                total_avg: mean.total,
                parse_std_dev: variance.parse.sqrt(),
                style_std_dev: variance.style.sqrt(),
                layout_std_dev: variance.layout.sqrt(),
                paint_std_dev: variance.paint.sqrt(),
                total_std_dev: variance.total.sqrt(),
                sample_count: mean.count,
            })
        })
        .collect()
}
