//! Recognition progress reporting.

use serde::{Deserialize, Serialize};

/// Pipeline phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Input validation and grayscale/saturation preparation.
    Load,
    /// Grid detection.
    Detect,
    /// Per-cell occupancy analysis.
    Analyze,
    /// Per-cell dominant color extraction and palette matching.
    Colors,
    /// Grid normalization and assembly.
    Finalize,
}

impl Phase {
    /// The overall-progress span `[start, end]` covered by this phase.
    fn span(self) -> (f32, f32) {
        match self {
            Phase::Load => (0.0, 0.20),
            Phase::Detect => (0.20, 0.45),
            Phase::Analyze => (0.45, 0.55),
            Phase::Colors => (0.55, 0.95),
            Phase::Finalize => (0.95, 1.0),
        }
    }
}

/// A progress report: the running phase and overall completion in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Currently running phase.
    pub phase: Phase,
    /// Overall completion fraction.
    pub fraction: f32,
}

impl Progress {
    /// Build a report for `phase` at `within` (0..1) of its span.
    pub(crate) fn at(phase: Phase, within: f32) -> Self {
        let (start, end) = phase.span();
        Self {
            phase,
            fraction: start + (end - start) * within.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_spans_tile_the_unit_interval() {
        let phases = [
            Phase::Load,
            Phase::Detect,
            Phase::Analyze,
            Phase::Colors,
            Phase::Finalize,
        ];
        assert_eq!(phases[0].span().0, 0.0);
        assert_eq!(phases[4].span().1, 1.0);
        for pair in phases.windows(2) {
            assert_eq!(pair[0].span().1, pair[1].span().0);
        }
    }

    #[test]
    fn within_maps_into_the_span() {
        let p = Progress::at(Phase::Colors, 0.5);
        assert!((p.fraction - 0.75).abs() < 1e-6);
        assert_eq!(Progress::at(Phase::Detect, 1.0).fraction, 0.45);
        assert_eq!(Progress::at(Phase::Finalize, 1.0).fraction, 1.0);
    }
}
