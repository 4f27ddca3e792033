use thiserror::Error;

/// Validation errors raised when a kernel is constructed from its config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A configuration argument value is invalid.
    #[error("Invalid argument `{arg}`: {reason}")]
    InvalidArgument {
        /// Name of the argument.
        arg: &'static str,
        /// Human readable reason.
        reason: &'static str,
    },
    /// A contiguous 1D slice view could not be obtained.
    #[error("Argument `{arg}` is not contiguous in memory.")]
    NonContiguous {
        /// Name of the argument that is non-contiguous.
        arg: &'static str,
    },
}

/// Invariant violations detected while running a validated kernel on data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecInvariantViolation {
    /// An execution precondition was violated.
    #[error("Execution invariant violation: {reason}")]
    InvalidState {
        /// Human readable reason.
        reason: &'static str,
    },
    /// Input or output length did not match the required shape.
    #[error("Execution length mismatch on `{arg}`. Expected {expected}, got {got}.")]
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// Adapter binding failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A core numeric helper (FFT, convolution) rejected its input.
    #[error(transparent)]
    Numeric(#[from] mtm_rs_core::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_names_the_offending_series() {
        let err = ExecInvariantViolation::LengthMismatch {
            arg: "y",
            expected: 100,
            got: 99,
        };
        assert_eq!(
            err.to_string(),
            "Execution length mismatch on `y`. Expected 100, got 99."
        );
    }

    #[test]
    fn config_errors_pass_through_execution_errors() {
        let err: ExecInvariantViolation = ConfigError::NonContiguous { arg: "x" }.into();
        assert_eq!(err.to_string(), "Argument `x` is not contiguous in memory.");
    }
}
