use crate::kernel::ExecInvariantViolation;
use crate::linalg::SymmetricTridiagonal;
use crate::signal::traits::TaperBank;
use core::f64::consts::PI;
use mtm_rs_core::num_rs::FftPlan;
use nalgebra::DVector;
use ndarray::{Array2, ArrayView1};
use rustfft::num_complex::Complex;

/// Smallest time-bandwidth product the taper bank accepts.
pub const MIN_TIME_BANDWIDTH: f64 = 1.5;

/// Orthogonal tapers and their spectral concentration ratios.
#[derive(Debug, Clone, PartialEq)]
pub struct TaperSet {
    /// One unit-energy taper per column, `len x count`.
    pub tapers: Array2<f64>,
    /// Fraction of each taper's energy inside the half-bandwidth, descending.
    pub eigenvalues: Vec<f64>,
}

impl TaperSet {
    /// Samples per taper.
    pub fn len(&self) -> usize {
        self.tapers.nrows()
    }

    /// True when the set holds no samples.
    pub fn is_empty(&self) -> bool {
        self.tapers.is_empty()
    }

    /// Number of tapers.
    pub fn count(&self) -> usize {
        self.tapers.ncols()
    }

    /// The `k`-th taper.
    pub fn taper(&self, k: usize) -> ArrayView1<'_, f64> {
        self.tapers.column(k)
    }
}

/// Discrete prolate spheroidal (Slepian) sequence taper bank.
///
/// The tapers are the eigenvectors of the commuting tridiagonal matrix of
/// Slepian (1978) for half-bandwidth `W = nw / len`, found by bisection and
/// inverse iteration. Signs follow the usual convention: symmetric tapers
/// have positive sum, antisymmetric tapers start with a positive lobe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DpssTaperBank;

impl TaperBank for DpssTaperBank {
    fn generate_tapers(
        &self,
        len: usize,
        nw: f64,
        count: usize,
    ) -> Result<TaperSet, ExecInvariantViolation> {
        dpss(len, nw, count)
    }
}

///
/// Generate `count` DPSS tapers of length `len` for time-bandwidth product `nw`.
///
/// ```
/// use approx::assert_relative_eq;
/// use mtm_rs::signal::windows::dpss;
///
/// let set = dpss(64, 4.0, 7).unwrap();
/// assert_eq!(set.tapers.dim(), (64, 7));
/// let energy: f64 = set.taper(0).iter().map(|w| w * w).sum();
/// assert_relative_eq!(energy, 1.0, epsilon = 1e-10);
/// assert!(set.eigenvalues[0] > 0.999);
/// ```
///
pub fn dpss(len: usize, nw: f64, count: usize) -> Result<TaperSet, ExecInvariantViolation> {
    if len < 2 {
        return Err(ExecInvariantViolation::InvalidState {
            reason: "taper length must be at least 2",
        });
    }
    if !nw.is_finite() || nw < MIN_TIME_BANDWIDTH {
        return Err(ExecInvariantViolation::InvalidState {
            reason: "time-bandwidth product must be at least 1.5",
        });
    }
    if nw >= len as f64 / 2.0 {
        return Err(ExecInvariantViolation::InvalidState {
            reason: "time-bandwidth product must be below half the taper length",
        });
    }
    if count == 0 || count > len {
        return Err(ExecInvariantViolation::InvalidState {
            reason: "taper count must be between 1 and the taper length",
        });
    }

    let n = len as f64;
    let w = nw / n;
    let cos_w = (2.0 * PI * w).cos();
    let diag = DVector::from_fn(len, |i, _| {
        let t = (n - 1.0 - 2.0 * i as f64) / 2.0;
        t * t * cos_w
    });
    let off = DVector::from_fn(len - 1, |i, _| {
        let i = (i + 1) as f64;
        i * (n - i) / 2.0
    });
    let matrix = SymmetricTridiagonal::new(diag, off)?;

    let pairs = matrix.largest_eigenpairs(count);
    if pairs.len() != count {
        return Err(ExecInvariantViolation::InvalidState {
            reason: "tridiagonal solver returned too few eigenpairs",
        });
    }

    let mut tapers = Array2::zeros((len, count));
    let threshold = (1.0 / n).max(1e-7);
    for (k, (_, v)) in pairs.into_iter().enumerate() {
        let flip = if k % 2 == 0 {
            v.sum() < 0.0
        } else {
            v.iter()
                .find(|s| *s * *s > threshold)
                .is_some_and(|s| *s < 0.0)
        };
        let sign = if flip { -1.0 } else { 1.0 };
        for (dst, src) in tapers.column_mut(k).iter_mut().zip(v.iter()) {
            *dst = sign * src;
        }
    }

    let plan = FftPlan::new(2 * len);
    let eigenvalues = (0..count)
        .map(|k| concentration(tapers.column(k), w, &plan))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TaperSet {
        tapers,
        eigenvalues,
    })
}

/// Energy fraction of `taper` within `[-w, w]`, from its autocorrelation.
fn concentration(
    taper: ArrayView1<'_, f64>,
    w: f64,
    plan: &FftPlan<f64>,
) -> Result<f64, ExecInvariantViolation> {
    let samples: Vec<f64> = taper.iter().copied().collect();
    let power: Vec<Complex<f64>> = plan
        .forward_real(&samples)
        .into_iter()
        .map(|c| Complex::new(c.norm_sqr(), 0.0))
        .collect();
    let rxx = plan.inverse_real(&power)?;

    let ratio = 2.0 * w * rxx[0]
        + rxx[1..samples.len()]
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let m = (i + 1) as f64;
                2.0 * r * (2.0 * PI * w * m).sin() / (PI * m)
            })
            .sum::<f64>();
    Ok(ratio.clamp(0.0, 1.0 - f64::EPSILON))
}
