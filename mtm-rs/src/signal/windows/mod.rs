//! Taper windows for multi-taper spectral estimation.

mod dpss;

pub use dpss::*;
