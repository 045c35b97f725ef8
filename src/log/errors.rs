//! Log engine error types
//!
//! The log reports a coarse view: anything that went wrong below it is a
//! `BadParam` carrying the lower-layer error as its source.
//!
//! Error codes:
//! - FLASH_LOG_BAD_PARAM (ERROR)
//! - FLASH_LOG_BAD_POINTER (ERROR)

use thiserror::Error;

use crate::io::IoError;
use crate::observability::Severity;
use crate::page::PageError;

pub type LogResult<T> = Result<T, LogError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("bad parameter: {reason}")]
    BadParam {
        reason: String,
        #[source]
        source: Option<PageError>,
    },

    /// A caller buffer is empty or too small
    #[error("bad buffer: {0}")]
    BadPointer(String),
}

impl LogError {
    pub fn bad_param(reason: impl Into<String>) -> Self {
        LogError::BadParam {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LogError::BadParam { .. } => "FLASH_LOG_BAD_PARAM",
            LogError::BadPointer(_) => "FLASH_LOG_BAD_POINTER",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }

    /// Code of the lower-layer error this one wraps, if any
    pub fn source_code(&self) -> Option<&'static str> {
        match self {
            LogError::BadParam {
                source: Some(source),
                ..
            } => Some(source.code()),
            _ => None,
        }
    }
}

impl From<PageError> for LogError {
    fn from(err: PageError) -> Self {
        LogError::BadParam {
            reason: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<IoError> for LogError {
    fn from(err: IoError) -> Self {
        PageError::from(err).into()
    }
}
