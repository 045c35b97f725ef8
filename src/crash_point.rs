//! Crash point injection for testing the commit protocols
//!
//! This module provides crash point injection via the
//! `FLASHSAFE_CRASH_POINT` environment variable.
//!
//! When a crash point is enabled, the process immediately terminates via
//! `std::process::abort()` - no cleanup, no unwinding, no catching. This is
//! the closest a test can get to pulling power between two page writes.
//!
//! # Usage
//!
//! ```ignore
//! use flashsafe::crash_point::{maybe_crash, points};
//!
//! maybe_crash(points::BLOB_AFTER_PRIMARY_DESCRIPTOR);
//! ```
//!
//! # Testing
//!
//! ```bash
//! FLASHSAFE_CRASH_POINT=blob_after_primary_descriptor flashsafe blob-write --input payload.bin
//! ```

use std::sync::OnceLock;

use crate::observability::{log_event_with_fields, Event};

/// Environment variable naming the crash point to fire
pub const CRASH_POINT_ENV: &str = "FLASHSAFE_CRASH_POINT";

/// Cache the crash point name to avoid repeated env var lookups
static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

/// Get the configured crash point (cached)
#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV).ok())
        .as_deref()
}

/// Check if a specific crash point is enabled
///
/// Returns true if `FLASHSAFE_CRASH_POINT` equals the given name.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Trigger a crash if the named crash point is enabled
///
/// This is a no-op when `FLASHSAFE_CRASH_POINT` is not set or doesn't match.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        log_event_with_fields(Event::CrashPoint, &[("point", name)]);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    // Blob commit protocol
    pub const BLOB_AFTER_DATA_PAGES: &str = "blob_after_data_pages";
    pub const BLOB_AFTER_PRIMARY_DESCRIPTOR: &str = "blob_after_primary_descriptor";
    pub const BLOB_AFTER_BACKUP_DATA: &str = "blob_after_backup_data";

    // Log append protocol
    pub const LOG_AFTER_RECORD_WRITE: &str = "log_after_record_write";
    pub const LOG_AFTER_CACHE_ORIGINAL: &str = "log_after_cache_original";

    // Format
    pub const FORMAT_HALFWAY: &str = "format_halfway";

    /// Get all crash point names
    pub fn all() -> &'static [&'static str] {
        &[
            BLOB_AFTER_DATA_PAGES,
            BLOB_AFTER_PRIMARY_DESCRIPTOR,
            BLOB_AFTER_BACKUP_DATA,
            LOG_AFTER_RECORD_WRITE,
            LOG_AFTER_CACHE_ORIGINAL,
            FORMAT_HALFWAY,
        ]
    }
}
