//! Multi-taper coherence and phase estimation for paired time series.
//!
//! The estimator tapers both series with discrete prolate spheroidal
//! sequences, adaptively reweights the per-taper spectra, and reports
//! coherence, phase, an analytic coherence confidence level and an optional
//! Monte Carlo phase confidence half-width.
//!
//! ```
//! use mtm_rs::signal::multitaper::{mtm_coherence, MtmCoherenceConfig};
//!
//! let x: Vec<f64> = (0..128).map(|i| (0.3 * i as f64).sin()).collect();
//! let result = mtm_coherence(&x, &x, &MtmCoherenceConfig::default()).unwrap();
//! assert_eq!(result.frequencies.len(), 63);
//! assert!(result.coherence.iter().all(|c| (c - 1.0).abs() < 1e-9));
//! ```

#![warn(missing_docs)]

mod error;
pub use error::*;

pub mod kernel;

pub mod linalg;

pub mod signal;

pub mod stats;

pub mod plot;
