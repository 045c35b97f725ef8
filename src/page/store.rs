//! Validated page access and original/backup pair recovery
//!
//! `PageStore` owns the reliable I/O handle of an engine context. Every
//! program goes through `write_raw`, which erases first, so callers never
//! have to think about flash bit semantics.

use std::sync::Arc;

use super::codec::{check_page, set_crc_and_encode};
use super::errors::{PageError, PageResult};
use super::health::Health;
use super::metadata::PageMetadata;
use crate::io::{ReliableIo, StorageArea};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Page-level operations over one storage area
pub struct PageStore {
    io: ReliableIo,
    retry_count: u32,
    /// Read-back buffer for write-verify, empty when verify is off
    verify: Vec<u8>,
}

impl PageStore {
    pub fn new(io: ReliableIo, retry_count: u32) -> Self {
        let verify_len = if io.write_verify() {
            io.area().page_size
        } else {
            0
        };
        Self {
            io,
            retry_count,
            verify: vec![0u8; verify_len],
        }
    }

    pub fn area(&self) -> &StorageArea {
        self.io.area()
    }

    pub fn page_size(&self) -> usize {
        self.io.area().page_size
    }

    pub fn total_pages(&self) -> u32 {
        self.io.area().total_pages
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        self.io.metrics()
    }

    /// Check magic and CRC of a buffer already in memory.
    pub fn is_valid_page(&mut self, buf: &[u8]) -> PageResult<PageMetadata> {
        check_page(&mut self.io, buf, self.retry_count)?
            .map_err(|reason| PageError::not_valid(None, reason))
    }

    /// Seal `buf` with `meta` and a fresh CRC, then erase and program `page`.
    pub fn write_validated_page(
        &mut self,
        page: u32,
        buf: &mut [u8],
        meta: &PageMetadata,
    ) -> PageResult<PageMetadata> {
        let sealed = set_crc_and_encode(&mut self.io, buf, meta, self.retry_count)?;
        self.write_raw(page, buf)?;
        Ok(sealed)
    }

    /// Erase `page` and program `buf` as-is.
    pub fn write_raw(&mut self, page: u32, buf: &[u8]) -> PageResult<()> {
        self.io.erase_page(page, self.retry_count)?;
        self.io
            .write_page(page, buf, &mut self.verify, self.retry_count)?;
        Ok(())
    }

    /// Read `page` without validating it.
    pub fn read_page(&mut self, page: u32, buf: &mut [u8]) -> PageResult<()> {
        Ok(self.io.read_page(page, buf, self.retry_count)?)
    }

    /// Read `page` and check magic and CRC.
    pub fn read_and_validate_page(&mut self, page: u32, buf: &mut [u8]) -> PageResult<PageMetadata> {
        self.read_page(page, buf)?;
        check_page(&mut self.io, buf, self.retry_count)?
            .map_err(|reason| PageError::not_valid(Some(page), reason))
    }

    /// Bring an original/backup pair into agreement.
    ///
    /// | original | backup           | action          | result            |
    /// |----------|------------------|-----------------|-------------------|
    /// | valid    | valid, equal     | none            | `Ok`              |
    /// | valid    | valid, different | original→backup | `BackupRecovered` |
    /// | valid    | invalid          | original→backup | `BackupRecovered` |
    /// | invalid  | valid            | backup→original | `BackupRecovered` |
    /// | invalid  | invalid          | none            | `NotValidPage`    |
    ///
    /// Both buffers must be page sized. On return `orig_buf` holds the
    /// surviving page contents.
    pub fn reconcile_pair(
        &mut self,
        orig: u32,
        backup: u32,
        orig_buf: &mut [u8],
        backup_buf: &mut [u8],
    ) -> PageResult<Health> {
        let orig_ok = self.validate_into(orig, orig_buf)?;
        let backup_ok = self.validate_into(backup, backup_buf)?;

        match (orig_ok, backup_ok) {
            (true, true) if orig_buf == backup_buf => Ok(Health::Ok),
            (true, _) => {
                self.write_raw(backup, orig_buf)?;
                self.note_recovered(orig, backup, "original_to_backup");
                Ok(Health::BackupRecovered)
            }
            (false, true) => {
                self.write_raw(orig, backup_buf)?;
                orig_buf.copy_from_slice(backup_buf);
                self.note_recovered(orig, backup, "backup_to_original");
                Ok(Health::BackupRecovered)
            }
            (false, false) => {
                self.io.metrics().increment_pairs_corrupt();
                log_event_with_fields(
                    Event::PairCorrupt,
                    &[
                        ("original", &orig.to_string()),
                        ("backup", &backup.to_string()),
                    ],
                );
                Err(PageError::not_valid(
                    Some(orig),
                    format!("original and backup (page {}) both invalid", backup),
                ))
            }
        }
    }

    /// Copy `src` to `dst` without looking at the contents.
    pub fn clone_page(&mut self, src: u32, dst: u32, buf: &mut [u8]) -> PageResult<()> {
        self.read_page(src, buf)?;
        self.write_raw(dst, buf)
    }

    /// CRC of `data` continuing from `seed`, with retries.
    pub fn chain_crc(&mut self, data: &[u8], seed: u32) -> PageResult<u32> {
        Ok(self.io.calc_crc32_retry(data, seed, self.retry_count)?)
    }

    fn validate_into(&mut self, page: u32, buf: &mut [u8]) -> PageResult<bool> {
        match self.read_and_validate_page(page, buf) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_valid() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn note_recovered(&self, orig: u32, backup: u32, direction: &str) {
        self.io.metrics().increment_pairs_recovered();
        log_event_with_fields(
            Event::PairRecovered,
            &[
                ("original", &orig.to_string()),
                ("backup", &backup.to_string()),
                ("direction", direction),
            ],
        );
    }
}
