//! Page layer error types
//!
//! Error codes:
//! - FLASH_PAGE_BAD_PARAM (ERROR)
//! - FLASH_PAGE_NOT_VALID (ERROR)
//! - I/O errors keep their FLASH_IO_* code

use thiserror::Error;

use crate::io::IoError;
use crate::observability::Severity;

/// Result type for page operations
pub type PageResult<T> = Result<T, PageError>;

/// Page codec and validator errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("bad parameter: {0}")]
    BadParam(String),

    /// Magic or CRC mismatch. `page` is `None` when validating a detached
    /// buffer.
    #[error("page {} is not valid: {reason}", page_label(.page))]
    NotValidPage { page: Option<u32>, reason: String },

    #[error(transparent)]
    Io(#[from] IoError),
}

fn page_label(page: &Option<u32>) -> String {
    page.map_or_else(|| "?".to_string(), |p| p.to_string())
}

impl PageError {
    pub(crate) fn not_valid(page: Option<u32>, reason: impl Into<String>) -> Self {
        PageError::NotValidPage {
            page,
            reason: reason.into(),
        }
    }

    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            PageError::BadParam(_) => "FLASH_PAGE_BAD_PARAM",
            PageError::NotValidPage { .. } => "FLASH_PAGE_NOT_VALID",
            PageError::Io(err) => err.code(),
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }

    /// True for a magic or CRC mismatch
    pub fn is_not_valid(&self) -> bool {
        matches!(self, PageError::NotValidPage { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_code() {
        let err: PageError = IoError::CrcCallback.into();
        assert_eq!(err.code(), "FLASH_IO_CRC_FAILED");
        assert!(!err.is_not_valid());
    }

    #[test]
    fn test_not_valid_display() {
        let err = PageError::not_valid(Some(4), "crc mismatch");
        assert_eq!(err.to_string(), "page 4 is not valid: crc mismatch");
        assert!(err.is_not_valid());

        let detached = PageError::not_valid(None, "bad magic");
        assert!(detached.to_string().contains("page ?"));
    }
}
