//! Linear algebra helpers.

mod tridiagonal;

pub use tridiagonal::*;
