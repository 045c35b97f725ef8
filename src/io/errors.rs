//! Reliable I/O error types
//!
//! Error codes:
//! - FLASH_IO_BAD_PARAM (ERROR)
//! - FLASH_IO_ERASE_FAILED (ERROR)
//! - FLASH_IO_WRITE_FAILED (ERROR)
//! - FLASH_IO_READ_FAILED (ERROR)
//! - FLASH_IO_CRC_FAILED (ERROR)
//!
//! Callback failures are only surfaced after the retry budget is exhausted.

use thiserror::Error;

use crate::observability::Severity;

/// Result type for reliable I/O operations
pub type IoResult<T> = Result<T, IoError>;

/// Reliable I/O errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    #[error("bad parameter: {0}")]
    BadParam(String),

    #[error("erase callback failed for page {page} after {attempts} attempt(s)")]
    EraseCallback { page: u32, attempts: u32 },

    #[error("write callback failed for page {page} after {attempts} attempt(s)")]
    WriteCallback { page: u32, attempts: u32 },

    #[error("read callback failed for page {page} after {attempts} attempt(s)")]
    ReadCallback { page: u32, attempts: u32 },

    #[error("CRC callback reported failure")]
    CrcCallback,
}

impl IoError {
    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            IoError::BadParam(_) => "FLASH_IO_BAD_PARAM",
            IoError::EraseCallback { .. } => "FLASH_IO_ERASE_FAILED",
            IoError::WriteCallback { .. } => "FLASH_IO_WRITE_FAILED",
            IoError::ReadCallback { .. } => "FLASH_IO_READ_FAILED",
            IoError::CrcCallback => "FLASH_IO_CRC_FAILED",
        }
    }

    /// I/O errors never imply data loss on their own
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}
