//! Baseline correction
//!
//! Every sample carries a fixed cost that has nothing to do with the snippet:
//! clock reads, host round-trips, the empty frame. Subtracting an estimate of
//! that floor leaves the snippet's marginal cost.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BenchError, Result};
use crate::sample::{Phase, PhaseSample};
use crate::snippet::NOOP_NAME;

/// How the fixed per-phase overhead is estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionPolicy {
    /// Keep raw samples
    None,
    /// Subtract the fastest value observed for each phase
    #[default]
    Minimum,
    /// Subtract the mean of the `__noop` samples for each phase
    NoopAverage,
}

impl std::fmt::Display for CorrectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CorrectionPolicy::None => "none",
            CorrectionPolicy::Minimum => "minimum",
            CorrectionPolicy::NoopAverage => "noop_average",
        })
    }
}

/// Per-phase amount subtracted from every sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Baseline {
    pub parse: f64,
    pub style: f64,
    pub layout: f64,
    pub paint: f64,
}

impl Baseline {
    pub fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Parse => self.parse,
            Phase::Style => self.style,
            Phase::Layout => self.layout,
            Phase::Paint => self.paint,
        }
    }

    fn from_fn(mut f: impl FnMut(Phase) -> f64) -> Self {
        Self {
            parse: f(Phase::Parse),
            style: f(Phase::Style),
            layout: f(Phase::Layout),
            paint: f(Phase::Paint),
        }
    }

    /// Per-phase minimum over all samples, no-op samples included
    pub fn minimum(samples: &[PhaseSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        Some(Self::from_fn(|phase| {
            samples
                .iter()
                .map(|s| s.get(phase))
                .fold(f64::INFINITY, f64::min)
        }))
    }

    /// Per-phase mean over the `__noop` samples
    pub fn noop_average(samples: &[PhaseSample]) -> Option<Self> {
        let noops: Vec<&PhaseSample> = samples.iter().filter(|s| s.is_noop()).collect();
        if noops.is_empty() {
            return None;
        }
        let count = noops.len() as f64;
        Some(Self::from_fn(|phase| {
            noops.iter().map(|s| s.get(phase)).sum::<f64>() / count
        }))
    }

    /// Subtract this baseline from every sample. Results may go negative.
    pub fn subtract_from(&self, samples: &mut [PhaseSample]) {
        for sample in samples.iter_mut() {
            for phase in Phase::ALL {
                *sample.get_mut(phase) -= self.get(phase);
            }
        }
    }
}

/// Apply `policy` to the full, still ungrouped sample set, then drop the
/// no-op samples. Returns the corrected user samples and the baseline that
/// was subtracted.
///
/// # Errors
///
/// [`BenchError::MissingData`] when no-op averaging is requested but no
/// `__noop` samples were measured.
pub fn correct(
    mut samples: Vec<PhaseSample>,
    policy: CorrectionPolicy,
) -> Result<(Vec<PhaseSample>, Baseline)> {
    let baseline = match policy {
        CorrectionPolicy::None => Baseline::default(),
        CorrectionPolicy::Minimum => Baseline::minimum(&samples).unwrap_or_default(),
        CorrectionPolicy::NoopAverage => {
            Baseline::noop_average(&samples).ok_or_else(|| BenchError::MissingData {
                name: NOOP_NAME.to_string(),
            })?
        }
    };
    debug!(%policy, ?baseline, "applying baseline correction");

    baseline.subtract_from(&mut samples);
    samples.retain(|s| !s.is_noop());
    Ok((samples, baseline))
}
