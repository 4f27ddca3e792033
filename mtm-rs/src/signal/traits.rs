//! Trait interfaces for signal-processing capabilities.
//!
//! These traits are the seams of the multi-taper estimator: kernels consume
//! series through [`Read1D`] and swap collaborators through trait objects.

use crate::kernel::{ExecInvariantViolation, Read1D};
use crate::signal::multitaper::MtmCoherenceResult;
use crate::signal::windows::TaperSet;
use core::fmt::Debug;

/// Source of orthogonal data tapers.
pub trait TaperBank: Debug + Send + Sync {
    /// Generate `count` unit-energy tapers of length `len` for time-bandwidth product `nw`,
    /// with their concentration ratios in descending order.
    fn generate_tapers(
        &self,
        len: usize,
        nw: f64,
        count: usize,
    ) -> Result<TaperSet, ExecInvariantViolation>;
}

/// Paired-series multi-taper coherence capability.
pub trait MtmCoherence1D<T> {
    /// Estimate coherence and phase of `x` against `y`, overwriting `out`.
    fn run_into<I1, I2>(
        &self,
        x: &I1,
        y: &I2,
        out: &mut MtmCoherenceResult,
    ) -> Result<(), ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized;

    /// Estimate coherence and phase of `x` against `y` and allocate the result.
    fn run_alloc<I1, I2>(&self, x: &I1, y: &I2) -> Result<MtmCoherenceResult, ExecInvariantViolation>
    where
        I1: Read1D<T> + ?Sized,
        I2: Read1D<T> + ?Sized;
}
