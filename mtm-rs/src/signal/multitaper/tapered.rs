use crate::kernel::ExecInvariantViolation;
use crate::signal::windows::TaperSet;
use crate::stats::mean;
use mtm_rs_core::num_rs::FftPlan;
use ndarray::Array2;
use rustfft::num_complex::Complex;

/// A mean-removed series and its population variance.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Centered {
    pub samples: Vec<f64>,
    pub variance: f64,
}

/// Remove the sample mean. A constant series centres to exact zeros.
pub(crate) fn center(series: &[f64]) -> Centered {
    let constant = series.windows(2).all(|w| w[0] == w[1]);
    if constant {
        return Centered {
            samples: vec![0.0; series.len()],
            variance: 0.0,
        };
    }
    let (avg, n) = mean::<_, f64>(series.iter());
    let samples: Vec<f64> = series.iter().map(|v| v - avg).collect();
    let variance = samples.iter().map(|v| v * v).sum::<f64>() / n as f64;
    Centered { samples, variance }
}

/// Fourier transform of the series under each taper, `len x count`.
pub(crate) fn tapered_spectra(
    series: &[f64],
    tapers: &TaperSet,
    plan: &FftPlan<f64>,
) -> Result<Array2<Complex<f64>>, ExecInvariantViolation> {
    let len = series.len();
    if tapers.len() != len {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "tapers",
            expected: len,
            got: tapers.len(),
        });
    }
    if plan.len() != len {
        return Err(ExecInvariantViolation::LengthMismatch {
            arg: "plan",
            expected: len,
            got: plan.len(),
        });
    }

    let mut spectra = Array2::zeros((len, tapers.count()));
    let mut buf = vec![Complex::new(0.0, 0.0); len];
    for (k, mut column) in spectra.columns_mut().into_iter().enumerate() {
        for ((dst, w), s) in buf.iter_mut().zip(tapers.taper(k).iter()).zip(series) {
            *dst = Complex::new(w * s, 0.0);
        }
        plan.forward_in_place(&mut buf)?;
        for (dst, src) in column.iter_mut().zip(buf.iter()) {
            *dst = *src;
        }
    }
    Ok(spectra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::windows::dpss;
    use approx::assert_relative_eq;

    #[test]
    fn centering_removes_mean_and_reports_population_variance() {
        let centered = center(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_relative_eq!(centered.samples.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(centered.variance, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_series_centres_to_zero() {
        let centered = center(&[0.1; 16]);
        assert!(centered.samples.iter().all(|v| *v == 0.0));
        assert_eq!(centered.variance, 0.0);
    }

    #[test]
    fn tapered_energy_matches_parseval() {
        let len = 64;
        let series: Vec<f64> = (0..len).map(|i| (0.4 * i as f64).cos() + 0.01 * i as f64).collect();
        let tapers = dpss(len, 3.0, 5).expect("valid dpss");
        let plan = FftPlan::new(len);
        let spectra = tapered_spectra(&series, &tapers, &plan).expect("matching lengths");
        assert_eq!(spectra.dim(), (len, 5));
        for k in 0..5 {
            let time: f64 = tapers
                .taper(k)
                .iter()
                .zip(&series)
                .map(|(w, s)| (w * s).powi(2))
                .sum();
            let freq: f64 = spectra.column(k).iter().map(|c| c.norm_sqr()).sum::<f64>() / len as f64;
            assert_relative_eq!(time, freq, max_relative = 1e-10);
        }
    }

    #[test]
    fn rejects_taper_length_mismatch() {
        let tapers = dpss(32, 2.0, 3).expect("valid dpss");
        let plan = FftPlan::new(31);
        let err = tapered_spectra(&[0.0; 31], &tapers, &plan).expect_err("length mismatch");
        assert_eq!(
            err,
            ExecInvariantViolation::LengthMismatch {
                arg: "tapers",
                expected: 31,
                got: 32
            }
        );
    }
}
