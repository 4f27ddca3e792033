use super::adaptive::{reweight, Reweighted};
use super::tapered::{center, tapered_spectra};
use crate::kernel::ExecInvariantViolation;
use crate::signal::windows::TaperSet;
use mtm_rs_core::num_rs::FftPlan;
use ndarray::{Array2, Zip};
use rustfft::num_complex::Complex;

/// Two-sided coherence, phase and adaptive spectra of a series pair.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CrossSpectra {
    /// Coherence magnitude per bin, in `[0, 1]`.
    pub coherence: Vec<f64>,
    /// Cross-spectrum phase per bin, degrees.
    pub phase: Vec<f64>,
    pub x: Reweighted,
    pub y: Reweighted,
    /// Population variances of the centred inputs.
    pub variance: (f64, f64),
}

/// Centre, taper, reweight and combine `x` and `y` over every frequency bin.
///
/// Tapers and the FFT plan are borrowed so repeated calls on surrogate pairs
/// of the same length reuse them.
pub(crate) fn cross_spectra(
    x: &[f64],
    y: &[f64],
    tapers: &TaperSet,
    plan: &FftPlan<f64>,
    max_iterations: usize,
) -> Result<CrossSpectra, ExecInvariantViolation> {
    let cx = center(x);
    let cy = center(y);
    let mut fkx = tapered_spectra(&cx.samples, tapers, plan)?;
    let mut fky = tapered_spectra(&cy.samples, tapers, plan)?;
    let rx = reweight(&mut fkx, &tapers.eigenvalues, cx.variance, max_iterations);
    let ry = reweight(&mut fky, &tapers.eigenvalues, cy.variance, max_iterations);
    let (coherence, phase) = coherence_phase(&fkx, &fky);
    Ok(CrossSpectra {
        coherence,
        phase,
        x: rx,
        y: ry,
        variance: (cx.variance, cy.variance),
    })
}

/// Coherence magnitude and phase (degrees) from reweighted per-taper spectra.
///
/// Bins where either series carries no power get coherence 0.
pub(crate) fn coherence_phase(
    fkx: &Array2<Complex<f64>>,
    fky: &Array2<Complex<f64>>,
) -> (Vec<f64>, Vec<f64>) {
    let len = fkx.nrows();
    let mut coherence = Vec::with_capacity(len);
    let mut phase = Vec::with_capacity(len);
    Zip::from(fkx.rows()).and(fky.rows()).for_each(|fx, fy| {
        let (cxy, sx, sy) = fx.iter().zip(fy.iter()).fold(
            (Complex::new(0.0, 0.0), 0.0, 0.0),
            |(cxy, sx, sy), (a, b)| (cxy + a * b.conj(), sx + a.norm_sqr(), sy + b.norm_sqr()),
        );
        let denom = (sx * sy).sqrt();
        coherence.push(if denom > 0.0 {
            (cxy.norm() / denom).min(1.0)
        } else {
            0.0
        });
        phase.push(cxy.arg().to_degrees());
    });
    (coherence, phase)
}
