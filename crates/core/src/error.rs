use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} env var not set")]
    Missing(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to load env file: {0}")]
    EnvFile(String),
}
