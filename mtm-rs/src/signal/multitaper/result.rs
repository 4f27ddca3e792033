use core::fmt;
use serde::{Deserialize, Serialize};

/// Which input series a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesLabel {
    /// First series.
    X,
    /// Second series.
    Y,
}

impl fmt::Display for SeriesLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesLabel::X => write!(f, "x"),
            SeriesLabel::Y => write!(f, "y"),
        }
    }
}

/// Non-fatal conditions met while estimating. The result is still usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MtmWarning {
    /// Adaptive reweighting hit its pass cap; the last estimate was kept.
    NotConverged {
        /// Affected series.
        series: SeriesLabel,
        /// Passes performed.
        iterations: usize,
    },
    /// The series is constant; its spectrum is reported as zero.
    ZeroVariance {
        /// Affected series.
        series: SeriesLabel,
    },
    /// Monte Carlo surrogates whose reweighting hit the pass cap.
    SurrogateNotConverged {
        /// Number of affected surrogate pairs.
        count: usize,
    },
}

impl fmt::Display for MtmWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MtmWarning::NotConverged { series, iterations } => write!(
                f,
                "adaptive weights for `{series}` did not converge after {iterations} iterations"
            ),
            MtmWarning::ZeroVariance { series } => {
                write!(f, "series `{series}` has zero variance; spectrum set to zero")
            }
            MtmWarning::SurrogateNotConverged { count } => write!(
                f,
                "adaptive weights did not converge for {count} Monte Carlo surrogate pairs"
            ),
        }
    }
}

/// One-sided multi-taper coherence estimate.
///
/// Every vector is indexed by the bins `k = 1..=(N - 1) / 2` of an `N` point
/// transform, excluding the zero frequency and, for even `N`, the Nyquist bin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MtmCoherenceResult {
    /// Bin frequencies `k / (N dt)`, strictly increasing.
    pub frequencies: Vec<f64>,
    /// Coherence magnitude, bias corrected when requested.
    pub coherence: Vec<f64>,
    /// Phase of `x` relative to `y`, degrees in `[-180, 180]`.
    pub phase: Vec<f64>,
    /// Critical coherence at the configured significance. Constant across
    /// frequency and not bias corrected, which makes it conservative.
    pub coherence_confidence: Vec<f64>,
    /// Phase confidence half-width in degrees; zeros without Monte Carlo.
    pub phase_confidence: Vec<f64>,
    /// Adaptive power spectral density of `x`.
    pub psd_x: Vec<f64>,
    /// Adaptive power spectral density of `y`.
    pub psd_y: Vec<f64>,
    /// Equivalent degrees of freedom, `2 NW - 1`.
    pub dof: f64,
    /// Number of tapers used.
    pub taper_count: usize,
    /// Taper half-bandwidth `NW / (N dt)` in frequency units.
    pub half_bandwidth: f64,
    /// Adaptive reweighting passes for `x` and `y`.
    pub reweight_iterations: (usize, usize),
    /// Non-fatal conditions met during estimation.
    pub warnings: Vec<MtmWarning>,
}

impl MtmCoherenceResult {
    /// Number of one-sided bins.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// True when no bins were produced.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Lower and upper phase bounds `phase -/+ phase_confidence`, wrapped into `[-180, 180]`.
    pub fn phase_bounds(&self) -> (Vec<f64>, Vec<f64>) {
        self.phase
            .iter()
            .zip(self.phase_confidence.iter())
            .map(|(ph, phi)| (wrap_degrees(ph - phi), wrap_degrees(ph + phi)))
            .unzip()
    }

    /// Mean coherence across bins, 0 when empty.
    pub fn mean_coherence(&self) -> f64 {
        if self.coherence.is_empty() {
            return 0.0;
        }
        self.coherence.iter().sum::<f64>() / self.coherence.len() as f64
    }

    /// Fraction of bins whose coherence exceeds the confidence level.
    pub fn fraction_above_confidence(&self) -> f64 {
        if self.coherence.is_empty() {
            return 0.0;
        }
        let above = self
            .coherence
            .iter()
            .zip(self.coherence_confidence.iter())
            .filter(|(c, ci)| c > ci)
            .count();
        above as f64 / self.coherence.len() as f64
    }
}

/// Wrap an angle in degrees into `[-180, 180]`, leaving in-range values untouched.
pub fn wrap_degrees(angle: f64) -> f64 {
    if (-180.0..=180.0).contains(&angle) {
        angle
    } else {
        (angle + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// One-sided bin count for an `len` point transform.
pub(crate) fn one_sided_len(len: usize) -> usize {
    len.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn one_sided_length_drops_dc_and_nyquist() {
        assert_eq!(one_sided_len(8), 3);
        assert_eq!(one_sided_len(9), 4);
        assert_eq!(one_sided_len(3), 1);
        assert_eq!(one_sided_len(0), 0);
    }

    #[test]
    fn wrapping_keeps_bounds_in_range() {
        assert_eq!(wrap_degrees(170.0), 170.0);
        assert_eq!(wrap_degrees(-180.0), -180.0);
        assert_relative_eq!(wrap_degrees(190.0), -170.0);
        assert_relative_eq!(wrap_degrees(-200.0), 160.0);
        assert_relative_eq!(wrap_degrees(540.0), -180.0);
    }

    #[test]
    fn phase_bounds_wrap_around_the_circle() {
        let result = MtmCoherenceResult {
            phase: vec![170.0, -175.0, 0.0],
            phase_confidence: vec![20.0, 10.0, 5.0],
            ..Default::default()
        };
        let (lower, upper) = result.phase_bounds();
        assert_relative_eq!(lower[0], 150.0);
        assert_relative_eq!(upper[0], -170.0);
        assert_relative_eq!(lower[1], 175.0);
        assert_relative_eq!(upper[1], -165.0);
        assert_eq!((lower[2], upper[2]), (-5.0, 5.0));
        assert!(lower.iter().chain(upper.iter()).all(|p| (-180.0..=180.0).contains(p)));
    }

    #[test]
    fn summary_statistics() {
        let result = MtmCoherenceResult {
            frequencies: vec![0.1, 0.2, 0.3, 0.4],
            coherence: vec![0.2, 0.5, 0.7, 0.9],
            coherence_confidence: vec![0.6; 4],
            ..Default::default()
        };
        assert_eq!(result.len(), 4);
        assert_relative_eq!(result.mean_coherence(), 0.575, epsilon = 1e-12);
        assert_relative_eq!(result.fraction_above_confidence(), 0.5);
        assert_eq!(MtmCoherenceResult::default().mean_coherence(), 0.0);
    }

    #[test]
    fn warnings_render_for_logs() {
        let warning = MtmWarning::NotConverged {
            series: SeriesLabel::Y,
            iterations: 100,
        };
        assert_eq!(
            warning.to_string(),
            "adaptive weights for `y` did not converge after 100 iterations"
        );
    }
}
