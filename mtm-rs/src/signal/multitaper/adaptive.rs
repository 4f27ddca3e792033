use core::mem;
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use rustfft::num_complex::Complex;

/// Outcome of adaptive reweighting for one series.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reweighted {
    /// Adaptive power spectral density, one value per frequency bin.
    pub psd: Array1<f64>,
    /// Reweighting passes performed.
    pub iterations: usize,
    /// False when the pass cap was hit before the tolerance was met.
    pub converged: bool,
}

/// Adaptively reweight per-taper spectra in place (Percival & Walden, pp. 368-370).
///
/// `spectra` is `len x count`. On return each column is scaled by
/// `sqrt(count) * sqrt(w_k) / sum_k sqrt(w_k)`, so that summing products over
/// tapers yields adaptively weighted cross spectra. Two estimate slots are
/// kept; each new estimate is written over the stale slot and the slots are
/// then swapped, so the convergence test compares consecutive estimates.
pub(crate) fn reweight(
    spectra: &mut Array2<Complex<f64>>,
    eigenvalues: &[f64],
    variance: f64,
    max_iterations: usize,
) -> Reweighted {
    let (len, count) = spectra.dim();
    if variance <= 0.0 {
        spectra.fill(Complex::new(0.0, 0.0));
        return Reweighted {
            psd: Array1::zeros(len),
            iterations: 0,
            converged: true,
        };
    }

    let lambda = ArrayView1::from(eigenvalues);
    let pk = spectra.mapv(|c| c.norm_sqr());
    let mut current = if count > 1 {
        (&pk.column(0) + &pk.column(1)) / 2.0
    } else {
        pk.column(0).to_owned()
    };
    let mut previous = Array1::<f64>::zeros(len);
    let mut weights = Array2::<f64>::zeros((len, count));
    let tol = 0.0005 * variance / len as f64;

    let mut iterations = 0;
    let mut converged = true;
    while mean_abs_change(&current, &previous) > tol {
        if iterations == max_iterations {
            converged = false;
            break;
        }
        fill_weights(&mut weights, &current, &lambda, variance);
        Zip::from(&mut previous)
            .and(weights.rows())
            .and(pk.rows())
            .for_each(|p, w, pk| {
                let total = w.sum();
                *p = if total > 0.0 { w.dot(&pk) / total } else { 0.0 };
            });
        mem::swap(&mut current, &mut previous);
        iterations += 1;
    }
    if iterations == 0 {
        fill_weights(&mut weights, &current, &lambda, variance);
    }

    let scale = (count as f64).sqrt();
    Zip::from(spectra.rows_mut())
        .and(weights.rows())
        .for_each(|mut fk, w| {
            let root = w.mapv(f64::sqrt);
            let total = root.sum();
            for (f, r) in fk.iter_mut().zip(root.iter()) {
                *f *= if total > 0.0 { scale * r / total } else { 0.0 };
            }
        });

    Reweighted {
        psd: current,
        iterations,
        converged,
    }
}

/// `w_k = b_k^2 lambda_k` with `b_k = P / (P lambda_k + variance (1 - lambda_k))`.
fn fill_weights(
    weights: &mut Array2<f64>,
    psd: &Array1<f64>,
    lambda: &ArrayView1<'_, f64>,
    variance: f64,
) {
    for (mut row, p) in weights.axis_iter_mut(Axis(0)).zip(psd.iter()) {
        for (w, l) in row.iter_mut().zip(lambda.iter()) {
            let denom = p * l + variance * (1.0 - l);
            let b = if denom > 0.0 { p / denom } else { 0.0 };
            *w = b * b * l;
        }
    }
}

fn mean_abs_change(current: &Array1<f64>, previous: &Array1<f64>) -> f64 {
    let len = current.len().max(1) as f64;
    current
        .iter()
        .zip(previous.iter())
        .map(|(a, b)| (a - b).abs())
        .sum::<f64>()
        / len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::multitaper::tapered::{center, tapered_spectra};
    use crate::signal::windows::dpss;
    use approx::assert_relative_eq;
    use mtm_rs_core::num_rs::FftPlan;

    fn noisy_series(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64;
                (0.21 * t).sin() + 0.5 * (1.37 * t).cos() + 0.3 * ((t * 7.919).sin() * 43.7).fract()
            })
            .collect()
    }

    #[test]
    fn converges_to_non_negative_psd() {
        let len = 256;
        let centered = center(&noisy_series(len));
        let tapers = dpss(len, 4.0, 7).expect("valid dpss");
        let plan = FftPlan::new(len);
        let mut spectra = tapered_spectra(&centered.samples, &tapers, &plan).expect("lengths");
        let out = reweight(&mut spectra, &tapers.eigenvalues, centered.variance, 100);
        assert!(out.converged);
        assert!(out.iterations >= 1);
        assert!(out.psd.iter().all(|p| *p >= 0.0 && p.is_finite()));
    }

    #[test]
    fn rescaled_spectra_stay_close_to_adaptive_psd() {
        // With near-unit eigenvalues the weights are near-equal across tapers,
        // so the summed rescaled periodograms track the adaptive estimate.
        let len = 256;
        let centered = center(&noisy_series(len));
        let tapers = dpss(len, 4.0, 7).expect("valid dpss");
        let plan = FftPlan::new(len);
        let mut spectra = tapered_spectra(&centered.samples, &tapers, &plan).expect("lengths");
        let out = reweight(&mut spectra, &tapers.eigenvalues, centered.variance, 100);
        let total_psd: f64 = out.psd.sum();
        let total_rescaled: f64 = spectra.iter().map(|c| c.norm_sqr()).sum();
        assert_relative_eq!(total_rescaled, total_psd, max_relative = 0.05);
    }

    #[test]
    fn zero_variance_yields_zero_psd() {
        let mut spectra = Array2::from_elem((16, 3), Complex::new(0.0, 0.0));
        let out = reweight(&mut spectra, &[0.99, 0.98, 0.9], 0.0, 100);
        assert!(out.converged);
        assert_eq!(out.iterations, 0);
        assert!(out.psd.iter().all(|p| *p == 0.0));
    }

    #[test]
    fn iteration_cap_is_reported() {
        let len = 128;
        let centered = center(&noisy_series(len));
        let tapers = dpss(len, 3.0, 5).expect("valid dpss");
        let plan = FftPlan::new(len);
        let mut spectra = tapered_spectra(&centered.samples, &tapers, &plan).expect("lengths");
        let out = reweight(&mut spectra, &tapers.eigenvalues, centered.variance, 1);
        assert_eq!(out.iterations, 1);
        assert!(!out.converged);
    }
}
