//! Per-sample phase timings

use serde::{Deserialize, Serialize};

use crate::snippet::NOOP_NAME;

/// A measured rendering phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Parse,
    Style,
    Layout,
    Paint,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Parse, Phase::Style, Phase::Layout, Phase::Paint];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Parse => "parse",
            Phase::Style => "style",
            Phase::Layout => "layout",
            Phase::Paint => "paint",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elapsed milliseconds per phase for one rendered copy of a snippet.
///
/// After baseline correction a value may be slightly negative; it is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSample {
    /// Logical snippet name
    pub name: String,
    pub parse: f64,
    pub style: f64,
    pub layout: f64,
    pub paint: f64,
}

impl PhaseSample {
    pub fn new(name: impl Into<String>, parse: f64, style: f64, layout: f64, paint: f64) -> Self {
        Self {
            name: name.into(),
            parse,
            style,
            layout,
            paint,
        }
    }

    pub fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Parse => self.parse,
            Phase::Style => self.style,
            Phase::Layout => self.layout,
            Phase::Paint => self.paint,
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> &mut f64 {
        match phase {
            Phase::Parse => &mut self.parse,
            Phase::Style => &mut self.style,
            Phase::Layout => &mut self.layout,
            Phase::Paint => &mut self.paint,
        }
    }

    /// Sum of all phases
    pub fn total(&self) -> f64 {
        self.parse + self.style + self.layout + self.paint
    }

    pub fn is_noop(&self) -> bool {
        self.name == NOOP_NAME
    }
}

/// Raw host clock readings taken at the phase boundaries of one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundaries {
    /// Before markup injection
    pub start_parse: f64,
    /// After injection, before the forced style pass
    pub start_style: f64,
    /// After the style pass, before the forced layout
    pub start_layout: f64,
    /// After layout, before yielding for paint
    pub start_paint: f64,
    /// After the paint opportunity
    pub end_paint: f64,
}

impl Boundaries {
    pub fn into_sample(self, name: impl Into<String>) -> PhaseSample {
        PhaseSample::new(
            name,
            self.start_style - self.start_parse,
            self.start_layout - self.start_style,
            self.start_paint - self.start_layout,
            self.end_paint - self.start_paint,
        )
    }

    /// Mark names and timestamps, prefixed with the sample token
    pub fn marks(&self, token: &str) -> [(String, f64); 5] {
        [
            (format!("{} - startParse", token), self.start_parse),
            (format!("{} - startStyle", token), self.start_style),
            (format!("{} - startLayout", token), self.start_layout),
            (format!("{} - startPaint", token), self.start_paint),
            (format!("{} - endPaint", token), self.end_paint),
        ]
    }
}
