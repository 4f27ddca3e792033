use super::ConfigError;

/// Constructor validation shared by kernel structs.
///
/// Every kernel is built from a plain config value; `try_new` is the only
/// place where the config is checked, so a constructed kernel never fails on
/// account of its own parameters.
pub trait KernelLifecycle: Sized {
    /// Kernel config type.
    type Config;

    /// Construct a validated kernel from config.
    fn try_new(config: Self::Config) -> Result<Self, ConfigError>;
}
