use crate::kernel::{ConfigError, ExecInvariantViolation};
use thiserror::Error;

/// Errors raised whilst running mtm-rs.
///
/// A rejected call never carries a partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The estimator configuration was rejected before any computation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The input series violated an execution precondition.
    #[error(transparent)]
    Exec(#[from] ExecInvariantViolation),
}
