//! Configuration error types
//!
//! Error codes:
//! - FLASH_CONFIG_INVALID (ERROR)
//! - FLASH_CONFIG_READ_FAILED (ERROR)
//! - FLASH_CONFIG_PARSE_FAILED (ERROR)

use thiserror::Error;

use crate::observability::Severity;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A value is out of range or two values contradict each other
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config JSON: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "FLASH_CONFIG_INVALID",
            ConfigError::Read { .. } => "FLASH_CONFIG_READ_FAILED",
            ConfigError::Parse(_) => "FLASH_CONFIG_PARSE_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}
