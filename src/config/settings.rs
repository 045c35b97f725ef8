//! Engine settings
//!
//! Fixed at `init` and never changed for the lifetime of a context.

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};
use crate::io::StorageArea;
use crate::page::METADATA_SIZE;

pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_FORMAT_VERSION: u32 = 1;

/// Geometry and redundancy options of one storage area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    pub area_id: u32,
    /// Pages in the area, always even
    pub total_pages: u32,
    /// Page size in bytes, even and larger than the trailer
    pub page_len: usize,
    /// Attempts per erase, write, read and CRC call
    pub retry_count: u32,
    /// Mirror every data page into a backup set
    pub full_backup: bool,
    /// Keep a cursor cache pair in front of the log ring
    pub flash_cache: bool,
    /// Highest on-media version this build understands
    pub format_version: u32,
}

impl StorageSettings {
    pub fn new(area_id: u32, total_pages: u32, page_len: usize) -> Self {
        Self {
            area_id,
            total_pages,
            page_len,
            retry_count: DEFAULT_RETRY_COUNT,
            full_backup: false,
            flash_cache: false,
            format_version: DEFAULT_FORMAT_VERSION,
        }
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_full_backup(mut self, full_backup: bool) -> Self {
        self.full_backup = full_backup;
        self
    }

    pub fn with_flash_cache(mut self, flash_cache: bool) -> Self {
        self.flash_cache = flash_cache;
        self
    }

    pub fn with_format_version(mut self, format_version: u32) -> Self {
        self.format_version = format_version;
        self
    }

    /// Smallest legal `total_pages` for the enabled tiers
    pub fn min_total_pages(&self) -> u32 {
        match (self.full_backup, self.flash_cache) {
            (false, false) => 4,
            (false, true) => 6,
            (true, false) => 8,
            (true, true) => 10,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.page_len <= METADATA_SIZE {
            return Err(ConfigError::Invalid(format!(
                "page_len {} must exceed the {}-byte page trailer",
                self.page_len, METADATA_SIZE
            )));
        }
        if self.page_len % 2 != 0 {
            return Err(ConfigError::Invalid(format!(
                "page_len {} must be even",
                self.page_len
            )));
        }
        if self.total_pages % 2 != 0 {
            return Err(ConfigError::Invalid(format!(
                "total_pages {} must be even",
                self.total_pages
            )));
        }
        if self.total_pages < self.min_total_pages() {
            return Err(ConfigError::Invalid(format!(
                "total_pages {} is below the minimum of {} (full_backup={}, flash_cache={})",
                self.total_pages,
                self.min_total_pages(),
                self.full_backup,
                self.flash_cache
            )));
        }
        if self.retry_count == 0 {
            return Err(ConfigError::Invalid("retry_count must be at least 1".into()));
        }
        if self.format_version == 0 {
            return Err(ConfigError::Invalid("format_version must be at least 1".into()));
        }
        Ok(())
    }

    pub fn area(&self) -> StorageArea {
        StorageArea {
            area_id: self.area_id,
            page_size: self.page_len,
            total_pages: self.total_pages,
        }
    }
}
