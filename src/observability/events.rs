//! Observable events for flashsafe
//!
//! Events are explicit and typed. Each carries its own severity so call
//! sites never have to pick one.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Engine context constructed
    ContextInit,
    /// Engine context torn down
    ContextDeinit,
    /// Format started
    FormatStart,
    /// Format complete
    FormatComplete,
    /// Storage status check started
    StatusCheckBegin,
    /// Storage status check complete
    StatusCheckComplete,

    // Reliable I/O
    /// A single I/O attempt failed and will be retried
    IoRetry,
    /// All attempts of an I/O operation failed
    IoExhausted,

    // Page pairs
    /// One side of an original/backup pair was rewritten from the other
    PairRecovered,
    /// Both sides of a pair are invalid
    PairCorrupt,
    /// Stored format version is newer than this build understands
    VersionSkew,

    // Blob
    /// Write transaction opened
    BlobWriteStart,
    /// Write transaction committed
    BlobWriteCommit,
    /// Write transaction discarded
    BlobWriteAbort,
    /// Commit failed part-way
    BlobCommitFailed,
    /// A primary set failed its consistency check
    BlobSetInconsistent,
    /// A data page was served from the backup set
    BlobReadFallback,
    /// Neither set holds a consistent blob
    BlobCorrupt,

    // Log
    /// Record appended
    LogAppend,
    /// Cursor recovered by walking forward from the cache
    LogRollForward,
    /// Cursor rebuilt by scanning the ring
    LogCursorRebuilt,

    /// A configured crash point fired
    CrashPoint,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ContextInit => "CONTEXT_INIT",
            Event::ContextDeinit => "CONTEXT_DEINIT",
            Event::FormatStart => "FORMAT_START",
            Event::FormatComplete => "FORMAT_COMPLETE",
            Event::StatusCheckBegin => "STATUS_CHECK_BEGIN",
            Event::StatusCheckComplete => "STATUS_CHECK_COMPLETE",

            Event::IoRetry => "IO_RETRY",
            Event::IoExhausted => "IO_RETRY_EXHAUSTED",

            Event::PairRecovered => "PAIR_RECOVERED",
            Event::PairCorrupt => "PAIR_CORRUPT",
            Event::VersionSkew => "VERSION_SKEW",

            Event::BlobWriteStart => "BLOB_WRITE_START",
            Event::BlobWriteCommit => "BLOB_WRITE_COMMIT",
            Event::BlobWriteAbort => "BLOB_WRITE_ABORT",
            Event::BlobCommitFailed => "BLOB_COMMIT_FAILED",
            Event::BlobSetInconsistent => "BLOB_SET_INCONSISTENT",
            Event::BlobReadFallback => "BLOB_READ_FALLBACK",
            Event::BlobCorrupt => "BLOB_CORRUPT",

            Event::LogAppend => "LOG_APPEND",
            Event::LogRollForward => "LOG_ROLL_FORWARD",
            Event::LogCursorRebuilt => "LOG_CURSOR_REBUILT",

            Event::CrashPoint => "CRASH_POINT",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::IoRetry | Event::LogAppend => Severity::Trace,

            Event::PairRecovered
            | Event::BlobSetInconsistent
            | Event::BlobReadFallback
            | Event::LogRollForward
            | Event::LogCursorRebuilt => Severity::Warn,

            Event::IoExhausted
            | Event::PairCorrupt
            | Event::VersionSkew
            | Event::BlobCommitFailed => Severity::Error,

            Event::BlobCorrupt | Event::CrashPoint => Severity::Fatal,

            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
