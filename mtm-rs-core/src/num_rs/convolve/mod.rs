mod ndarray_conv_binds;

use crate::{Error, Result};
use ndarray::{s, Array1, ArrayView1};
use ndarray_conv::{ConvExt, PaddingMode};
use num_traits::{FromPrimitive, NumAssign};

/// Output extent of a linear convolution, following `numpy.convolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvolveMode {
    /// Every point of overlap, `a.len() + v.len() - 1` samples.
    Full,
    /// Only points of complete overlap, `max(M, N) - min(M, N) + 1` samples.
    Valid,
    /// Centered on `a`, `max(M, N)` samples.
    Same,
}

/// Discrete linear convolution of two 1D sequences with zero padding.
///
/// Matches `numpy.convolve`: `v` is reversed before sliding over `a`.
///
/// `v` is treated as the kernel and is expected to be no longer than `a`
/// for [`ConvolveMode::Same`] and [`ConvolveMode::Valid`].
///
/// ```
/// use ndarray::array;
/// use mtm_rs_core::num_rs::{convolve, ConvolveMode};
///
/// let a = array![2., 4., 6., 8.];
/// let v = array![1., 1.];
///
/// let full = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
/// assert_eq!(full, array![2., 6., 10., 14., 8.]);
///
/// let valid = convolve((&a).into(), (&v).into(), ConvolveMode::Valid).unwrap();
/// assert_eq!(valid, array![6., 10., 14.]);
/// ```
pub fn convolve<T>(a: ArrayView1<T>, v: ArrayView1<T>, mode: ConvolveMode) -> Result<Array1<T>>
where
    T: NumAssign + Copy,
{
    // ndarray-conv correlates, so the kernel is reversed first.
    let flipped: Array1<T> = v.iter().rev().copied().collect();
    a.conv(&flipped.view(), mode.into(), PaddingMode::Zeros)
        .map_err(|e| Error::Conv {
            reason: e.to_string(),
        })
}

/// Centered boxcar smoothing of width `width`, zero padded at both edges.
///
/// Computed as the full convolution with `ones(width) / width`, trimmed by
/// `width / 2` samples on each side, so the output has the length of `a` and
/// the first and last `width / 2` points are pulled toward zero.
///
/// ```
/// use approx::assert_relative_eq;
/// use ndarray::array;
/// use mtm_rs_core::num_rs::moving_average;
///
/// let a = array![3., 3., 3., 3.];
/// let smooth = moving_average((&a).into(), 3).unwrap();
/// assert_eq!(smooth.len(), 4);
/// assert_relative_eq!(smooth[0], 2.0);
/// assert_relative_eq!(smooth[1], 3.0);
/// assert_relative_eq!(smooth[3], 2.0);
/// ```
pub fn moving_average<T>(a: ArrayView1<T>, width: usize) -> Result<Array1<T>>
where
    T: NumAssign + FromPrimitive + Copy,
{
    if width == 0 || a.is_empty() {
        return Ok(a.to_owned());
    }
    let scale = T::from_usize(width).ok_or_else(|| Error::Conv {
        reason: "window width is not representable".to_string(),
    })?;
    let kernel = Array1::from_elem(width, T::one() / scale);

    // Trailing zeros leave the retained span of the full convolution unchanged
    // and keep the signal at least as long as the kernel.
    let mut padded = Array1::from_elem(a.len().max(width), T::zero());
    padded.slice_mut(s![..a.len()]).assign(&a);

    let full = convolve(padded.view(), kernel.view(), ConvolveMode::Full)?;
    let lead = (width - 1) / 2;
    Ok(full.slice(s![lead..lead + a.len()]).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn full_mode_matches_numpy() {
        let a = array![1., 2., 3.];
        let v = array![0., 1., 0.5];
        let result = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
        assert_eq!(result, array![0., 1., 2.5, 4., 1.5]);
    }

    #[test]
    fn same_mode_keeps_input_length() {
        let a = array![1., 2., 3.];
        let v = array![0., 1., 0.5];
        let result = convolve((&a).into(), (&v).into(), ConvolveMode::Same).unwrap();
        assert_eq!(result, array![1., 2.5, 4.]);
    }

    #[test]
    fn asymmetric_kernel_is_reversed() {
        let a = array![1., 2., 3., 4.];
        let v = array![1., 0., -1.];
        let full = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
        assert_eq!(full, array![1., 2., 2., 2., -3., -4.]);
        let valid = convolve((&a).into(), (&v).into(), ConvolveMode::Valid).unwrap();
        assert_eq!(valid, array![2., 2.]);
    }

    #[test]
    fn moving_average_matches_trimmed_full_convolution() {
        let a = array![1.0f64, 4.0, 2.0, 8.0, 5.0];
        let smooth = moving_average((&a).into(), 3).unwrap();
        let expected = [5.0 / 3.0, 7.0 / 3.0, 14.0 / 3.0, 5.0, 13.0 / 3.0];
        assert_eq!(smooth.len(), a.len());
        smooth
            .iter()
            .zip(expected.iter())
            .for_each(|(s, e)| assert_relative_eq!(*s, *e, epsilon = 1e-12));
    }

    #[test]
    fn moving_average_handles_inputs_shorter_than_window() {
        let a = array![6.0f64, 3.0];
        let smooth = moving_average((&a).into(), 3).unwrap();
        assert_eq!(smooth.len(), 2);
        assert_relative_eq!(smooth[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(smooth[1], 3.0, epsilon = 1e-12);

        let single = array![9.0f64];
        let smooth = moving_average((&single).into(), 3).unwrap();
        assert_eq!(smooth.len(), 1);
        assert_relative_eq!(smooth[0], 3.0, epsilon = 1e-12);
    }
}
