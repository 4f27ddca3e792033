//! Signal processing: data tapers and the multi-taper coherence estimator.

pub mod multitaper;
pub mod traits;
pub mod windows;
