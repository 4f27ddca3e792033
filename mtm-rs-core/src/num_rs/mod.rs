//! numpy-style array helpers.

mod convolve;
mod fft;

pub use convolve::*;
pub use fft::*;
