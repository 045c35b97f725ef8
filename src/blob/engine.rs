//! Blob context and write transaction state machine
//!
//! ```text
//! Uninitialized --init--> Unchecked --get_storage_status--> Idle
//!                             ^                              |  ^
//!                             |                   start_write|  |end_write / abort_write
//!                   format / failed commit                   v  |
//!                             +-------------------------- Writing
//! ```
//!
//! # Commit protocol
//!
//! A transaction writes into the bank the committed descriptor does not
//! name, tagged with a fresh sequence number. `end_write` then:
//!
//! 1. flushes the partially filled page
//! 2. re-reads every written primary page and checks the chained CRC
//! 3. writes the primary descriptor (the commit point)
//! 4. copies the data pages to the backup set (full backup only)
//! 5. writes the backup descriptor
//!
//! Power loss before step 3 leaves the old blob intact on both sets. Power
//! loss after it leaves a consistent primary which `get_storage_status`
//! copies over the backup.

use std::mem;

use serde::Serialize;

use super::core::{BlobCore, SetVerdict};
use super::descriptor::{CommittedBlob, Descriptor};
use super::errors::{BlobError, BlobResult};
use super::layout::PageSet;
use crate::config::StorageSettings;
use crate::crash_point::{maybe_crash, points};
use crate::io::Callbacks;
use crate::observability::{log_event_with_fields, Event, MetricsSnapshot};
use crate::page::{Health, CRC_BASE_SEED};

/// What `get_info` reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlobInfo {
    /// Committed length in bytes
    pub size: u32,
    pub sequence_number: u32,
    /// Largest blob the area can hold
    pub capacity: u32,
}

/// An open write transaction
#[derive(Debug, Clone, PartialEq, Eq)]
struct WriteTxn {
    sequence_number: u32,
    bank: u32,
    bytes_written: usize,
    running_crc: u32,
    pages_written: u32,
    /// Bytes waiting in the staging page
    buffered: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlobState {
    Uninitialized,
    Unchecked,
    Idle(CommittedBlob),
    Writing {
        committed: CommittedBlob,
        txn: WriteTxn,
    },
}

/// A blob storage context
pub struct Blob {
    core: BlobCore,
    state: BlobState,
    current_sequence_number: u32,
}

impl Blob {
    /// Build a context over `callbacks`. Media is not touched.
    ///
    /// # Errors
    ///
    /// `BadParam` if the settings are invalid, `flash_cache` is set or the
    /// page is too small for a descriptor.
    pub fn init(settings: StorageSettings, callbacks: Callbacks) -> BlobResult<Self> {
        let core = BlobCore::new(settings, callbacks)?;
        log_event_with_fields(
            Event::ContextInit,
            &[
                ("engine", "blob"),
                ("total_pages", &settings.total_pages.to_string()),
                ("full_backup", &settings.full_backup.to_string()),
            ],
        );
        Ok(Self {
            core,
            state: BlobState::Unchecked,
            current_sequence_number: 0,
        })
    }

    pub fn is_init(&self) -> bool {
        self.state != BlobState::Uninitialized
    }

    /// Tear down. Every later call fails with `NotInitialized`.
    pub fn deinit(&mut self) {
        if self.is_init() {
            self.state = BlobState::Uninitialized;
            log_event_with_fields(Event::ContextDeinit, &[("engine", "blob")]);
        }
    }

    pub fn settings(&self) -> &StorageSettings {
        self.core.settings()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics().snapshot()
    }

    /// Whether a write transaction is open
    pub fn is_writing(&self) -> bool {
        matches!(self.state, BlobState::Writing { .. })
    }

    /// Check both sets, repair whichever is damaged and make the area
    /// usable.
    ///
    /// # Errors
    ///
    /// - `NewVersionFound` if a descriptor was written by a newer format;
    ///   media is left untouched
    /// - `NotValidBlob` if neither set holds a consistent blob
    /// - `WriteOngoing` while a transaction is open
    pub fn get_storage_status(&mut self) -> BlobResult<Health> {
        match self.state {
            BlobState::Uninitialized => return Err(BlobError::NotInitialized),
            BlobState::Writing { .. } => return Err(BlobError::WriteOngoing),
            BlobState::Unchecked | BlobState::Idle(_) => {}
        }
        log_event_with_fields(Event::StatusCheckBegin, &[("engine", "blob")]);
        self.state = BlobState::Unchecked;

        let primary = self.core.verify_set(PageSet::Primary)?;
        let backup = self.core.verify_set(PageSet::Backup)?;
        let supported = self.core.settings().format_version;
        for verdict in [&primary, &backup] {
            if let SetVerdict::NewerVersion(stored) = verdict {
                log_event_with_fields(
                    Event::VersionSkew,
                    &[
                        ("stored", &stored.to_string()),
                        ("supported", &supported.to_string()),
                    ],
                );
                return Err(BlobError::NewVersionFound {
                    stored: *stored,
                    supported,
                });
            }
        }

        let (source, committed, other) = match (primary, backup) {
            (SetVerdict::Consistent(committed), other) => (PageSet::Primary, committed, other),
            (other, SetVerdict::Consistent(committed)) => (PageSet::Backup, committed, other),
            (primary, backup) => {
                let reason = format!("primary: {}; backup: {}", describe(&primary), describe(&backup));
                log_event_with_fields(Event::BlobCorrupt, &[("reason", &reason)]);
                return Err(BlobError::NotValidBlob(reason));
            }
        };
        if let SetVerdict::Inconsistent(reason) = &other {
            log_event_with_fields(
                Event::BlobSetInconsistent,
                &[("set", source.other().as_str()), ("reason", reason)],
            );
        }

        let health = self.core.reconcile_extent(source, &committed)?;
        self.current_sequence_number = committed.sequence_number;
        self.state = BlobState::Idle(committed);

        log_event_with_fields(
            Event::StatusCheckComplete,
            &[
                ("engine", "blob"),
                ("health", health.as_str()),
                ("source", source.as_str()),
                ("sequence", &committed.sequence_number.to_string()),
            ],
        );
        Ok(health)
    }

    /// Size, sequence number and capacity of the committed blob
    pub fn get_info(&self) -> BlobResult<BlobInfo> {
        let committed = self.committed()?;
        Ok(BlobInfo {
            size: committed.descriptor.length,
            sequence_number: committed.sequence_number,
            capacity: self.core.layout().capacity() as u32,
        })
    }

    /// Rewrite every page with an empty blob, discarding any transaction.
    ///
    /// Leaves the context `Unchecked`.
    pub fn format(&mut self) -> BlobResult<()> {
        if !self.is_init() {
            return Err(BlobError::NotInitialized);
        }
        log_event_with_fields(Event::FormatStart, &[("engine", "blob")]);

        self.state = BlobState::Unchecked;
        self.current_sequence_number = 0;
        self.core.format_pages()?;

        self.core.metrics().increment_formats();
        log_event_with_fields(Event::FormatComplete, &[("engine", "blob")]);
        Ok(())
    }

    /// Copy `len` bytes starting at `offset` into `out`.
    ///
    /// # Errors
    ///
    /// - `BadPointer` if `out` is shorter than `len`
    /// - `BadParam` if the range runs past the committed length
    /// - `CorruptContext` if a data page belongs to another sequence
    pub fn read_blob(&mut self, offset: u32, len: usize, out: &mut [u8]) -> BlobResult<()> {
        let committed = *self.committed()?;
        if out.len() < len {
            return Err(BlobError::BadPointer(format!(
                "output buffer holds {} bytes, {} requested",
                out.len(),
                len
            )));
        }
        let end = offset as usize + len;
        if end > committed.descriptor.length as usize {
            return Err(BlobError::BadParam(format!(
                "range {}..{} exceeds blob length {}",
                offset, end, committed.descriptor.length
            )));
        }
        self.core
            .read_range(&committed, offset as usize, &mut out[..len])
    }

    /// Open a write transaction.
    pub fn start_write(&mut self) -> BlobResult<()> {
        let committed = match &self.state {
            BlobState::Uninitialized => return Err(BlobError::NotInitialized),
            BlobState::Unchecked => return Err(BlobError::NotChecked),
            BlobState::Writing { .. } => return Err(BlobError::WriteOngoing),
            BlobState::Idle(committed) => *committed,
        };

        self.current_sequence_number = self.current_sequence_number.wrapping_add(1);
        let txn = WriteTxn {
            sequence_number: self.current_sequence_number,
            bank: 1 - committed.descriptor.bank,
            bytes_written: 0,
            running_crc: CRC_BASE_SEED,
            pages_written: 0,
            buffered: 0,
        };
        log_event_with_fields(
            Event::BlobWriteStart,
            &[
                ("sequence", &txn.sequence_number.to_string()),
                ("bank", &txn.bank.to_string()),
            ],
        );
        self.state = BlobState::Writing { committed, txn };
        Ok(())
    }

    /// Stream `data` into the open transaction.
    ///
    /// # Errors
    ///
    /// - `WriteNotStarted` without an open transaction
    /// - `BadParam` if the blob would outgrow the area; nothing is consumed
    ///   and the transaction stays open
    ///
    /// An I/O failure abandons the transaction; the committed blob stays
    /// readable.
    pub fn append_data(&mut self, data: &[u8]) -> BlobResult<()> {
        let capacity = self.core.layout().capacity();
        let BlobState::Writing { txn, .. } = &self.state else {
            return Err(self.not_writing());
        };
        if txn.bytes_written + data.len() > capacity {
            return Err(BlobError::BadParam(format!(
                "appending {} bytes to {} would exceed capacity {}",
                data.len(),
                txn.bytes_written,
                capacity
            )));
        }
        if data.is_empty() {
            return Ok(());
        }

        let BlobState::Writing { committed, mut txn } =
            mem::replace(&mut self.state, BlobState::Unchecked)
        else {
            return Err(BlobError::CorruptContext("transaction vanished".into()));
        };

        match self.stream(&mut txn, data) {
            Ok(()) => {
                self.state = BlobState::Writing { committed, txn };
                Ok(())
            }
            Err(err) => {
                self.state = BlobState::Idle(committed);
                self.core.metrics().increment_blob_aborts();
                log_event_with_fields(
                    Event::BlobWriteAbort,
                    &[
                        ("sequence", &txn.sequence_number.to_string()),
                        ("error", &err.to_string()),
                    ],
                );
                Err(err)
            }
        }
    }

    /// Commit the open transaction.
    ///
    /// # Errors
    ///
    /// - `WriteNotStarted` without an open transaction
    /// - `WriteReadbackMismatch` if the written pages do not read back
    ///
    /// Any failure leaves the context `Unchecked`; the next
    /// `get_storage_status` yields either the old or the new blob.
    pub fn end_write(&mut self) -> BlobResult<()> {
        if !self.is_writing() {
            return Err(self.not_writing());
        }
        let BlobState::Writing { committed, txn } =
            mem::replace(&mut self.state, BlobState::Unchecked)
        else {
            return Err(BlobError::CorruptContext("transaction vanished".into()));
        };

        match self.commit(txn) {
            Ok(new) => {
                self.core
                    .metrics()
                    .record_blob_commit(new.descriptor.length as u64);
                log_event_with_fields(
                    Event::BlobWriteCommit,
                    &[
                        ("sequence", &new.sequence_number.to_string()),
                        ("size", &new.descriptor.length.to_string()),
                        ("pages", &new.descriptor.page_count.to_string()),
                    ],
                );
                self.state = BlobState::Idle(new);
                Ok(())
            }
            Err(err) => {
                log_event_with_fields(
                    Event::BlobCommitFailed,
                    &[
                        ("previous_sequence", &committed.sequence_number.to_string()),
                        ("error", &err.to_string()),
                    ],
                );
                Err(err)
            }
        }
    }

    /// Drop the open transaction. Committed pages are not touched.
    pub fn abort_write(&mut self) -> BlobResult<()> {
        if !self.is_writing() {
            return Err(self.not_writing());
        }
        let BlobState::Writing { committed, txn } =
            mem::replace(&mut self.state, BlobState::Unchecked)
        else {
            return Err(BlobError::CorruptContext("transaction vanished".into()));
        };

        self.state = BlobState::Idle(committed);
        self.core.metrics().increment_blob_aborts();
        log_event_with_fields(
            Event::BlobWriteAbort,
            &[
                ("sequence", &txn.sequence_number.to_string()),
                ("bytes", &txn.bytes_written.to_string()),
            ],
        );
        Ok(())
    }

    fn committed(&self) -> BlobResult<&CommittedBlob> {
        match &self.state {
            BlobState::Uninitialized => Err(BlobError::NotInitialized),
            BlobState::Unchecked => Err(BlobError::NotChecked),
            BlobState::Writing { .. } => Err(BlobError::WriteOngoing),
            BlobState::Idle(committed) => Ok(committed),
        }
    }

    fn not_writing(&self) -> BlobError {
        match self.state {
            BlobState::Uninitialized => BlobError::NotInitialized,
            _ => BlobError::WriteNotStarted,
        }
    }

    fn stream(&mut self, txn: &mut WriteTxn, data: &[u8]) -> BlobResult<()> {
        txn.running_crc = self.core.chain_crc(data, txn.running_crc)?;

        let region = self.core.layout().region();
        let mut rest = data;
        while !rest.is_empty() {
            let take = (region - txn.buffered).min(rest.len());
            self.core.staging_mut()[txn.buffered..txn.buffered + take]
                .copy_from_slice(&rest[..take]);
            txn.buffered += take;
            txn.bytes_written += take;
            rest = &rest[take..];

            if txn.buffered == region {
                self.core
                    .write_data_page(txn.bank, txn.pages_written, txn.sequence_number, region)?;
                txn.pages_written += 1;
                txn.buffered = 0;
            }
        }
        Ok(())
    }

    fn commit(&mut self, mut txn: WriteTxn) -> BlobResult<CommittedBlob> {
        if txn.buffered > 0 {
            self.core.write_data_page(
                txn.bank,
                txn.pages_written,
                txn.sequence_number,
                txn.buffered,
            )?;
            txn.pages_written += 1;
            txn.buffered = 0;
        }
        maybe_crash(points::BLOB_AFTER_DATA_PAGES);

        let new = CommittedBlob {
            descriptor: Descriptor {
                length: txn.bytes_written as u32,
                crc: txn.running_crc,
                page_count: txn.pages_written,
                bank: txn.bank,
            },
            sequence_number: txn.sequence_number,
        };
        if let Some(reason) = self.core.check_extent(PageSet::Primary, &new)? {
            return Err(BlobError::WriteReadbackMismatch(reason));
        }

        self.core.write_descriptor(PageSet::Primary, &new)?;
        maybe_crash(points::BLOB_AFTER_PRIMARY_DESCRIPTOR);

        if self.core.layout().full_backup() {
            self.core.clone_extent(&new)?;
        }
        maybe_crash(points::BLOB_AFTER_BACKUP_DATA);

        self.core.write_descriptor(PageSet::Backup, &new)?;
        Ok(new)
    }
}

fn describe(verdict: &SetVerdict) -> String {
    match verdict {
        SetVerdict::Consistent(c) => format!("consistent at sequence {}", c.sequence_number),
        SetVerdict::Inconsistent(reason) => reason.clone(),
        SetVerdict::NewerVersion(v) => format!("newer version {}", v),
    }
}
