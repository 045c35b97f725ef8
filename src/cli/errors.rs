//! CLI-specific error types
//!
//! Engine and configuration errors keep their own codes; the CLI only adds
//! codes for its own file handling and misuse.

use std::fmt;
use std::io;

use crate::blob::BlobError;
use crate::config::ConfigError;
use crate::log::LogError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Input or output file error
    IoError,
    /// Command does not apply to the configured engine
    WrongEngine,
    /// Error raised by the configuration layer or an engine
    Storage(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::IoError => "FLASH_CLI_IO_ERROR",
            Self::WrongEngine => "FLASH_CLI_WRONG_ENGINE",
            Self::Storage(code) => code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Command needs the other engine
    pub fn wrong_engine(command: &str, engine: &str) -> Self {
        Self::new(
            CliErrorCode::WrongEngine,
            format!("'{}' needs an image configured for the {} engine", command, engine),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::new(CliErrorCode::Storage(e.code()), e.to_string())
    }
}

impl From<BlobError> for CliError {
    fn from(e: BlobError) -> Self {
        Self::new(CliErrorCode::Storage(e.code()), e.to_string())
    }
}

impl From<LogError> for CliError {
    fn from(e: LogError) -> Self {
        Self::new(CliErrorCode::Storage(e.code()), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
