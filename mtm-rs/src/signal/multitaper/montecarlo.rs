use super::coherence::cross_spectra;
use super::result::one_sided_len;
use crate::kernel::ExecInvariantViolation;
use crate::signal::windows::TaperSet;
use crate::stats::central_half_width;
use mtm_rs_core::num_rs::{moving_average, FftPlan};
use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rustfft::num_complex::Complex;
use tracing::trace;

/// Monte Carlo run parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MonteCarlo {
    pub iterations: usize,
    pub seed: u64,
    pub significance: f64,
    pub max_reweight_iterations: usize,
}

/// Smoothed phase half-widths and the count of surrogates that hit the reweighting cap.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PhaseConfidence {
    pub half_width: Vec<f64>,
    pub unconverged: usize,
}

/// Phase confidence half-width from surrogate pairs with coherence `cb`.
///
/// Each surrogate pair shares a white spectrum mixed in proportion `cb` per
/// bin, so its expected coherence matches the observed (bias corrected) one.
/// Surrogate `i` draws from its own generator seeded with `seed + i`, so the
/// result does not depend on whether iterations run in parallel.
pub(crate) fn phase_confidence(
    cb: &[f64],
    tapers: &TaperSet,
    plan: &FftPlan<f64>,
    params: &MonteCarlo,
) -> Result<PhaseConfidence, ExecInvariantViolation> {
    let len = plan.len();
    if cb.len() != len {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "cb",
            expected: len,
            got: cb.len(),
        });
    }
    let bins = one_sided_len(len);

    #[cfg(feature = "parallel")]
    let runs = {
        use rayon::prelude::*;
        (0..params.iterations)
            .into_par_iter()
            .map(|i| surrogate_phase(i, cb, tapers, plan, params))
            .collect::<Result<Vec<_>, _>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let runs = (0..params.iterations)
        .map(|i| surrogate_phase(i, cb, tapers, plan, params))
        .collect::<Result<Vec<_>, _>>()?;

    let unconverged = runs.iter().filter(|(_, converged)| !converged).count();
    let mut column = vec![0.0; runs.len()];
    let widths: Vec<f64> = (0..bins)
        .map(|bin| {
            for (dst, (phase, _)) in column.iter_mut().zip(runs.iter()) {
                *dst = phase[bin];
            }
            central_half_width(&mut column, params.significance)
        })
        .collect();
    let half_width = moving_average(ArrayView1::from(&widths), 3)?.to_vec();

    Ok(PhaseConfidence {
        half_width,
        unconverged,
    })
}

/// One-sided phase of surrogate pair `index`, and whether both series converged.
fn surrogate_phase(
    index: usize,
    cb: &[f64],
    tapers: &TaperSet,
    plan: &FftPlan<f64>,
    params: &MonteCarlo,
) -> Result<(Vec<f64>, bool), ExecInvariantViolation> {
    trace!(iteration = index, "phase confidence surrogate");
    let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(index as u64));
    let fx = noise_spectrum(&mut rng, plan);
    let fy = noise_spectrum(&mut rng, plan);

    let mixed: Vec<Complex<f64>> = fy
        .iter()
        .zip(fx.iter())
        .zip(cb)
        .map(|((y, x), c)| *y * (1.0 - c * c).max(0.0).sqrt() + *x * *c)
        .collect();
    let xs = plan.inverse_real(&fx)?;
    let ys = plan.inverse_real(&mixed)?;

    let cross = cross_spectra(&xs, &ys, tapers, plan, params.max_reweight_iterations)?;
    let bins = one_sided_len(plan.len());
    Ok((
        cross.phase[1..=bins].to_vec(),
        cross.x.converged && cross.y.converged,
    ))
}

/// Spectrum of unit-mean Gaussian noise, scaled to unit total magnitude.
fn noise_spectrum(rng: &mut StdRng, plan: &FftPlan<f64>) -> Vec<Complex<f64>> {
    let noise: Vec<f64> = (0..plan.len())
        .map(|_| rng.sample::<f64, _>(StandardNormal) + 1.0)
        .collect();
    let mut spectrum = plan.forward_real(&noise);
    let total: f64 = spectrum.iter().map(|c| c.norm()).sum();
    if total > 0.0 {
        for c in spectrum.iter_mut() {
            *c /= total;
        }
    }
    spectrum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::windows::dpss;

    fn params(iterations: usize, seed: u64) -> MonteCarlo {
        MonteCarlo {
            iterations,
            seed,
            significance: 0.95,
            max_reweight_iterations: 100,
        }
    }

    #[test]
    fn half_widths_are_non_negative_and_one_sided() {
        let len = 96;
        let tapers = dpss(len, 3.0, 5).expect("valid dpss");
        let plan = FftPlan::new(len);
        let cb = vec![0.5; len];
        let out = phase_confidence(&cb, &tapers, &plan, &params(20, 7)).expect("valid input");
        assert_eq!(out.half_width.len(), 47);
        assert!(out.half_width.iter().all(|w| *w >= 0.0 && w.is_finite()));
        assert!(out.half_width.iter().any(|w| *w > 0.0));
    }

    #[test]
    fn fixed_seed_reproduces_half_widths() {
        let len = 64;
        let tapers = dpss(len, 2.0, 3).expect("valid dpss");
        let plan = FftPlan::new(len);
        let cb = vec![0.3; len];
        let a = phase_confidence(&cb, &tapers, &plan, &params(12, 42)).expect("valid input");
        let b = phase_confidence(&cb, &tapers, &plan, &params(12, 42)).expect("valid input");
        assert_eq!(a, b);
        let c = phase_confidence(&cb, &tapers, &plan, &params(12, 43)).expect("valid input");
        assert_ne!(a.half_width, c.half_width);
    }

    #[test]
    fn strongly_coherent_surrogates_have_narrow_phase_spread() {
        let len = 128;
        let tapers = dpss(len, 4.0, 7).expect("valid dpss");
        let plan = FftPlan::new(len);
        let tight = phase_confidence(&vec![0.99; len], &tapers, &plan, &params(30, 1))
            .expect("valid input");
        let loose = phase_confidence(&vec![0.1; len], &tapers, &plan, &params(30, 1))
            .expect("valid input");
        let mean = |w: &[f64]| w.iter().sum::<f64>() / w.len() as f64;
        assert!(mean(&tight.half_width) < mean(&loose.half_width));
    }

    #[test]
    fn rejects_mismatched_bias_level() {
        let tapers = dpss(32, 2.0, 3).expect("valid dpss");
        let plan = FftPlan::new(32);
        assert!(phase_confidence(&[0.5; 31], &tapers, &plan, &params(4, 0)).is_err());
    }
}
