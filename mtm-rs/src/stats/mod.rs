//! Statistical reductions and coherence significance functions.

use core::{borrow::Borrow, iter::Sum, ops::Add};
use num_traits::{Float, Num, NumCast};

mod coherence;

pub use coherence::*;

///
/// Compute the mean of the signal, `y`
///
/// Return the mean and the number of points averaged
///
/// ```
/// use approx::assert_relative_eq;
/// use mtm_rs::stats::mean;
///
/// let y: [f64; 5] = [1.,2.,3.,4.,5.];
/// assert_relative_eq!(3f64, mean::<_, f64>(y.iter()).0);
///
/// let y: [i64; 5] = [1,2,3,4,5];
/// assert_eq!(3i64, mean::<_, i64>(y.iter()).0);
///
/// let y: &[f32] = &[];
/// assert_eq!((0f32, 0), mean::<_, f32>(y.iter()));
///
/// ```
///
pub fn mean<YI, F>(y: YI) -> (F, usize)
where
    F: Num + NumCast + Default + Copy + Add,
    YI: Iterator,
    YI::Item: Borrow<F>,
{
    let (sum, count) = y.fold(Default::default(), |acc: (F, usize), yi| {
        (acc.0 + *yi.borrow(), acc.1 + 1)
    });
    match F::from(count) {
        Some(n) if count > 0 => (sum / n, count),
        _ => Default::default(),
    }
}

///
/// Compute the population variance of the signal, `y`
///
/// Return the variance and the number of points averaged
///
/// ```
/// use approx::assert_relative_eq;
/// use mtm_rs::stats::variance;
///
/// let y: [f64; 5] = [1.,2.,3.,4.,5.];
/// assert_relative_eq!(2f64, variance::<_, f64>(y.iter()).0);
///
/// let y: &[f32] = &[];
/// assert_eq!((0f32, 0), variance::<_, f32>(y.iter()));
///
/// ```
///
pub fn variance<YI, F>(y: YI) -> (F, usize)
where
    F: Float + Default + Sum,
    YI: Iterator + Clone,
    YI::Item: Borrow<F>,
{
    let (avg, n) = mean(y.clone());
    let sum: F = y
        .map(|f| {
            let delta = *f.borrow() - avg;
            delta * delta
        })
        .sum::<F>();
    match F::from(n) {
        Some(count) if n > 0 => (sum / count, n),
        _ => Default::default(),
    }
}

///
/// 1-based rank of the upper `level` quantile among `count` ordered samples.
///
/// The rank is `round((1 + level) / 2 * count)` clamped to `1..=count`, so the
/// upper and lower ranks `rank` and `count - rank + 1` bracket the central
/// `level` mass of the samples. Returns 0 when `count` is 0.
///
/// ```
/// use mtm_rs::stats::two_sided_rank;
///
/// assert_eq!(98, two_sided_rank(100, 0.95));
/// assert_eq!(1, two_sided_rank(1, 0.95));
/// assert_eq!(0, two_sided_rank(0, 0.95));
/// ```
///
pub fn two_sided_rank(count: usize, level: f64) -> usize {
    if count == 0 {
        return 0;
    }
    let rank = ((1.0 + level) / 2.0 * count as f64).round();
    (rank.max(1.0) as usize).min(count)
}

///
/// Symmetric half-width of the central `level` interval of `samples`.
///
/// Sorts `samples` in place and averages the distances of the upper and lower
/// two-sided order statistics, `(upper - lower) / 2`. Never negative for
/// finite input. Returns 0 for an empty slice.
///
/// ```
/// use approx::assert_relative_eq;
/// use mtm_rs::stats::central_half_width;
///
/// let mut samples: Vec<f64> = (1..=100).map(f64::from).rev().collect();
/// // ranks 98 and 3 of 1..=100
/// assert_relative_eq!(47.5, central_half_width(&mut samples, 0.95));
/// ```
///
pub fn central_half_width(samples: &mut [f64], level: f64) -> f64 {
    let count = samples.len();
    if count == 0 {
        return 0.0;
    }
    samples.sort_by(f64::total_cmp);
    let upper = two_sided_rank(count, level);
    let lower = count - upper + 1;
    ((samples[upper - 1] - samples[lower - 1]) / 2.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn variance_of_shifted_series_is_unchanged() {
        let y: Vec<f64> = (0..50).map(|i| (i as f64 * 0.37).sin()).collect();
        let shifted: Vec<f64> = y.iter().map(|v| v + 12.5).collect();
        assert_relative_eq!(
            variance::<_, f64>(y.iter()).0,
            variance::<_, f64>(shifted.iter()).0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn half_width_of_single_sample_is_zero() {
        let mut one = [3.25];
        assert_eq!(central_half_width(&mut one, 0.95), 0.0);
        assert_eq!(central_half_width(&mut [], 0.95), 0.0);
    }

    #[test]
    fn half_width_uses_symmetric_ranks() {
        // 10 samples at 95%: upper rank round(9.75) = 10, lower rank 1
        let mut samples = [4.0, -3.0, 1.0, 0.0, 2.0, -1.0, 5.0, -2.0, 3.0, -6.0];
        assert_relative_eq!(central_half_width(&mut samples, 0.95), 5.5);
        assert_eq!(samples[0], -6.0);
        assert_eq!(samples[9], 5.0);
    }
}
