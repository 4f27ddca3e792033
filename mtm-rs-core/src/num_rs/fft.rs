use crate::{Error, Result};
use core::fmt;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftNum, FftPlanner};
use std::sync::Arc;

/// Forward and inverse complex FFTs of one fixed length.
///
/// Cheap to clone and `Send + Sync`; one plan serves every transform of
/// the same length.
#[derive(Clone)]
pub struct FftPlan<T: FftNum> {
    len: usize,
    forward: Arc<dyn Fft<T>>,
    inverse: Arc<dyn Fft<T>>,
}

impl<T: FftNum> fmt::Debug for FftPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftPlan").field("len", &self.len).finish()
    }
}

impl<T: FftNum> FftPlan<T> {
    /// Plan forward and inverse transforms of `len` points.
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::<T>::new();
        Self {
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        }
    }

    /// Transform length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-point plan.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unnormalized forward FFT of a real series.
    ///
    /// Input shorter than the plan is zero padded, longer input is truncated.
    ///
    /// ```
    /// use approx::assert_relative_eq;
    /// use mtm_rs_core::num_rs::FftPlan;
    ///
    /// let plan = FftPlan::<f64>::new(4);
    /// let spec = plan.forward_real(&[1.0, 1.0, 1.0, 1.0]);
    /// assert_relative_eq!(spec[0].re, 4.0);
    /// assert_relative_eq!(spec[1].norm(), 0.0, epsilon = 1e-12);
    /// ```
    pub fn forward_real(&self, x: &[T]) -> Vec<Complex<T>> {
        let mut buf = vec![Complex::new(T::zero(), T::zero()); self.len];
        for (dst, src) in buf.iter_mut().zip(x.iter().copied()) {
            *dst = Complex::new(src, T::zero());
        }
        self.forward.process(&mut buf);
        buf
    }

    /// In-place unnormalized forward FFT.
    pub fn forward_in_place(&self, buf: &mut [Complex<T>]) -> Result<()> {
        self.check_len(buf.len())?;
        self.forward.process(buf);
        Ok(())
    }

    /// Real part of the `1/len` normalized inverse FFT.
    ///
    /// ```
    /// use approx::assert_relative_eq;
    /// use mtm_rs_core::num_rs::FftPlan;
    ///
    /// let plan = FftPlan::<f64>::new(8);
    /// let x = [0.5, -1.0, 2.0, 0.0, 3.0, 1.5, -2.5, 4.0];
    /// let back = plan.inverse_real(&plan.forward_real(&x)).unwrap();
    /// for (a, b) in x.iter().zip(back.iter()) {
    ///     assert_relative_eq!(a, b, epsilon = 1e-12);
    /// }
    /// ```
    pub fn inverse_real(&self, spec: &[Complex<T>]) -> Result<Vec<T>> {
        self.check_len(spec.len())?;
        let mut buf = spec.to_vec();
        self.inverse.process(&mut buf);
        let scale = T::one() / T::from_usize(self.len).unwrap_or_else(T::one);
        Ok(buf.into_iter().map(|c| c.re * scale).collect())
    }

    fn check_len(&self, got: usize) -> Result<()> {
        if got != self.len {
            return Err(Error::FftLength {
                expected: self.len,
                got,
            });
        }
        Ok(())
    }
}
