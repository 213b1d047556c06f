use thiserror::Error;

/// Errors raised while loading or validating runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config RON: {0}")]
    ParseError(String),

    #[error("Invalid {field}: {value} (must be a finite, positive number)")]
    InvalidValue { field: &'static str, value: f32 },
}
