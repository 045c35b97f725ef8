//! Blob engine error types
//!
//! Error codes:
//! - FLASH_BLOB_BAD_POINTER (ERROR)
//! - FLASH_BLOB_BAD_PARAM (ERROR)
//! - FLASH_BLOB_NOT_INITIALIZED (ERROR)
//! - FLASH_BLOB_CORRUPT_CONTEXT (FATAL)
//! - FLASH_BLOB_ERASE_FAILED (ERROR)
//! - FLASH_BLOB_WRITE_FAILED (ERROR)
//! - FLASH_BLOB_READ_FAILED (ERROR)
//! - FLASH_BLOB_CRC_FAILED (ERROR)
//! - FLASH_BLOB_NOT_VALID (FATAL) - only `format` gets out of this
//! - FLASH_BLOB_NEWER_VERSION (ERROR)
//! - FLASH_BLOB_READBACK_MISMATCH (ERROR)
//! - FLASH_BLOB_WRITE_ONGOING (ERROR)
//! - FLASH_BLOB_WRITE_NOT_STARTED (ERROR)
//! - FLASH_BLOB_NOT_CHECKED (ERROR)

use thiserror::Error;

use crate::io::IoError;
use crate::observability::Severity;
use crate::page::PageError;

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobError {
    /// A caller buffer is too small or empty
    #[error("bad buffer: {0}")]
    BadPointer(String),

    #[error("bad parameter: {0}")]
    BadParam(String),

    #[error("blob context is not initialized")]
    NotInitialized,

    /// Media or in-memory state contradicts the committed descriptor
    #[error("corrupt context: {0}")]
    CorruptContext(String),

    #[error("erase failed for page {page}")]
    EraseCallback { page: u32 },

    #[error("write failed for page {page}")]
    WriteCallback { page: u32 },

    #[error("read failed for page {page}")]
    ReadCallback { page: u32 },

    #[error("CRC callback failed")]
    CrcCallback,

    /// Neither the primary nor the backup set holds a consistent blob
    #[error("no valid blob on media: {0}")]
    NotValidBlob(String),

    #[error("stored format version {stored} is newer than supported version {supported}")]
    NewVersionFound { stored: u32, supported: u32 },

    #[error("written data did not read back intact: {0}")]
    WriteReadbackMismatch(String),

    #[error("a write transaction is already in progress")]
    WriteOngoing,

    #[error("no write transaction in progress")]
    WriteNotStarted,

    #[error("storage status has not been checked")]
    NotChecked,
}

impl BlobError {
    pub fn code(&self) -> &'static str {
        match self {
            BlobError::BadPointer(_) => "FLASH_BLOB_BAD_POINTER",
            BlobError::BadParam(_) => "FLASH_BLOB_BAD_PARAM",
            BlobError::NotInitialized => "FLASH_BLOB_NOT_INITIALIZED",
            BlobError::CorruptContext(_) => "FLASH_BLOB_CORRUPT_CONTEXT",
            BlobError::EraseCallback { .. } => "FLASH_BLOB_ERASE_FAILED",
            BlobError::WriteCallback { .. } => "FLASH_BLOB_WRITE_FAILED",
            BlobError::ReadCallback { .. } => "FLASH_BLOB_READ_FAILED",
            BlobError::CrcCallback => "FLASH_BLOB_CRC_FAILED",
            BlobError::NotValidBlob(_) => "FLASH_BLOB_NOT_VALID",
            BlobError::NewVersionFound { .. } => "FLASH_BLOB_NEWER_VERSION",
            BlobError::WriteReadbackMismatch(_) => "FLASH_BLOB_READBACK_MISMATCH",
            BlobError::WriteOngoing => "FLASH_BLOB_WRITE_ONGOING",
            BlobError::WriteNotStarted => "FLASH_BLOB_WRITE_NOT_STARTED",
            BlobError::NotChecked => "FLASH_BLOB_NOT_CHECKED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            BlobError::CorruptContext(_) | BlobError::NotValidBlob(_) => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl From<IoError> for BlobError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::BadParam(reason) => BlobError::BadParam(reason),
            IoError::EraseCallback { page, .. } => BlobError::EraseCallback { page },
            IoError::WriteCallback { page, .. } => BlobError::WriteCallback { page },
            IoError::ReadCallback { page, .. } => BlobError::ReadCallback { page },
            IoError::CrcCallback => BlobError::CrcCallback,
        }
    }
}

impl From<PageError> for BlobError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::BadParam(reason) => BlobError::BadParam(reason),
            err @ PageError::NotValidPage { .. } => BlobError::NotValidBlob(err.to_string()),
            PageError::Io(io) => io.into(),
        }
    }
}
