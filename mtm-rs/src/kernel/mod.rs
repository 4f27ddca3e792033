//! Trait-first kernel substrate.
//!
//! Kernels are built through [`KernelLifecycle::try_new`] from a config value,
//! read their series through [`Read1D`] adapters, and report data-dependent
//! failures as [`ExecInvariantViolation`].

mod errors;
mod io;
mod lifecycle;

pub use errors::*;
pub use io::*;
pub use lifecycle::*;
