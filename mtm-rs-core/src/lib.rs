//! Low-level numeric building blocks for `mtm-rs`.
//!
//! `num_rs` holds numpy-flavoured helpers: linear convolution over `ndarray`
//! views and reusable complex FFT plans for real-valued series.

pub mod num_rs;

/// Errors raised by the core numeric helpers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The underlying convolution backend rejected its inputs.
    #[error("convolution failed: {reason}")]
    Conv {
        /// Backend error message.
        reason: String,
    },
    /// A buffer handed to an FFT plan had the wrong length.
    #[error("FFT length mismatch: plan is {expected} points, got {got}")]
    FftLength {
        /// Plan length.
        expected: usize,
        /// Received length.
        got: usize,
    },
}

/// Result alias for the core helpers.
pub type Result<T> = core::result::Result<T, Error>;
