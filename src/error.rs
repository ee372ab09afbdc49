//! Error types for configuration resolution.
//!
//! Resolution is fail-fast: the only runtime input that can be rejected is a
//! batch size that is not a positive integer. Everything else either falls back
//! to a documented default or is passed through for the consumer to validate.
//! Loading from a config file adds file-level failures on top of that.

use thiserror::Error;

/// Errors raised while building an [`OptimizationConfig`](crate::config::OptimizationConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `RVC_BATCH_SIZE` (or the `batch_size` key of a config file) is not a
    /// positive integer.
    #[error("invalid batch size {value:?}: {reason}")]
    InvalidBatchSize {
        /// The raw value as supplied.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A preset name that is not in the registry.
    #[error("unknown hardware preset {0:?} (expected apple_silicon, nvidia_gpu or cpu)")]
    UnknownPreset(String),

    /// A config file exists but could not be read or has ill-typed values.
    #[error("failed to load configuration file: {0}")]
    File(#[from] Box<figment::Error>),

    /// Exporting the configuration failed.
    #[error("failed to serialize configuration: {0}")]
    Serialize(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::File(Box::new(err))
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Serialize(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Serialize(err.to_string())
    }
}

/// Convenience type alias for Results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
