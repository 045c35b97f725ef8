//! Log context
//!
//! An append-only ring of records, one record per slot. The newest
//! `capacity` records are kept; appending to a full ring drops the oldest.
//!
//! # Append order
//!
//! 1. write the record into `tail` (and its mirror)
//! 2. advance `tail`, and `head` when the ring is full
//! 3. write the cursor cache, original then backup
//!
//! A power loss between 1 and 3 leaves a record the cache does not know
//! about. `get_storage_status` rolls the cursor forward over it.

use serde::Serialize;

use super::cache::LogCache;
use super::core::{LogCore, SlotContent};
use super::errors::{LogError, LogResult};
use crate::config::StorageSettings;
use crate::crash_point::{maybe_crash, points};
use crate::io::Callbacks;
use crate::observability::{log_event_with_fields, Event, MetricsSnapshot};
use crate::page::Health;

/// What `get_info` reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogInfo {
    /// Records currently held
    pub count: u32,
    /// Records the ring can hold
    pub capacity: u32,
    pub head: u32,
    pub tail: u32,
    /// Sequence number the next append receives
    pub next_sequence: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogState {
    Uninitialized,
    Unchecked,
    Ready(LogCache),
}

/// A log storage context
pub struct Log {
    core: LogCore,
    state: LogState,
}

impl Log {
    /// Build a context over `callbacks`. Media is not touched.
    pub fn init(settings: StorageSettings, callbacks: Callbacks) -> LogResult<Self> {
        let core = LogCore::new(settings, callbacks)?;
        log_event_with_fields(
            Event::ContextInit,
            &[
                ("engine", "log"),
                ("total_pages", &settings.total_pages.to_string()),
                ("full_backup", &settings.full_backup.to_string()),
                ("flash_cache", &settings.flash_cache.to_string()),
            ],
        );
        Ok(Self {
            core,
            state: LogState::Unchecked,
        })
    }

    pub fn is_init(&self) -> bool {
        self.state != LogState::Uninitialized
    }

    pub fn deinit(&mut self) {
        if self.is_init() {
            self.state = LogState::Uninitialized;
            log_event_with_fields(Event::ContextDeinit, &[("engine", "log")]);
        }
    }

    pub fn settings(&self) -> &StorageSettings {
        self.core.settings()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics().snapshot()
    }

    /// Repair mirrored pages, recover the cursor and make the log usable.
    ///
    /// The cursor comes from the cache pair when it agrees with the ring
    /// (after rolling it forward over uncached appends); otherwise it is
    /// rebuilt by scanning the ring and the cache is rewritten.
    pub fn get_storage_status(&mut self) -> LogResult<Health> {
        if !self.is_init() {
            return Err(LogError::bad_param("log context is not initialized"));
        }
        log_event_with_fields(Event::StatusCheckBegin, &[("engine", "log")]);
        self.state = LogState::Unchecked;

        let mut health = self.core.reconcile_slots()?;
        let cursor = if self.core.layout().flash_cache() {
            let (cursor, cache_health) = self.recover_cursor()?;
            health = health.merge(cache_health);
            cursor
        } else {
            self.core.scan()?
        };
        self.state = LogState::Ready(cursor);

        log_event_with_fields(
            Event::StatusCheckComplete,
            &[
                ("engine", "log"),
                ("health", health.as_str()),
                ("count", &cursor.count.to_string()),
                ("next_sequence", &cursor.next_sequence.to_string()),
            ],
        );
        Ok(health)
    }

    fn recover_cursor(&mut self) -> LogResult<(LogCache, Health)> {
        if let Some((cached, mut health)) = self.core.read_cache()? {
            let mut cursor = cached;
            let mut rolled = 0;
            while rolled < self.core.ring().size()
                && self.core.slot_sequence(cursor.tail)? == Some(cursor.next_sequence)
            {
                cursor.push(self.core.ring());
                rolled += 1;
            }

            if self.core.cursor_matches_ring(&cursor)? {
                if rolled > 0 {
                    self.core.write_cache(&cursor)?;
                    health = Health::BackupRecovered;
                    log_event_with_fields(
                        Event::LogRollForward,
                        &[
                            ("records", &rolled.to_string()),
                            ("next_sequence", &cursor.next_sequence.to_string()),
                        ],
                    );
                }
                return Ok((cursor, health));
            }
        }

        let cursor = self.core.scan()?;
        self.core.write_cache(&cursor)?;
        log_event_with_fields(
            Event::LogCursorRebuilt,
            &[
                ("count", &cursor.count.to_string()),
                ("next_sequence", &cursor.next_sequence.to_string()),
            ],
        );
        Ok((cursor, Health::BackupRecovered))
    }

    pub fn get_info(&self) -> LogResult<LogInfo> {
        let cursor = self.cursor()?;
        Ok(LogInfo {
            count: cursor.count,
            capacity: self.core.ring().size(),
            head: cursor.head,
            tail: cursor.tail,
            next_sequence: cursor.next_sequence,
        })
    }

    /// Write every slot empty and reset the cursor. Leaves the context
    /// `Unchecked`.
    pub fn format(&mut self) -> LogResult<()> {
        if !self.is_init() {
            return Err(LogError::bad_param("log context is not initialized"));
        }
        log_event_with_fields(Event::FormatStart, &[("engine", "log")]);
        self.state = LogState::Unchecked;
        self.core.format_pages()?;
        self.core.metrics().increment_formats();
        log_event_with_fields(Event::FormatComplete, &[("engine", "log")]);
        Ok(())
    }

    /// Append one record and return its sequence number.
    ///
    /// # Errors
    ///
    /// - `BadPointer` for an empty record
    /// - `BadParam` if the record does not fit a slot, the status has not
    ///   been checked, or the write failed (the context then needs a new
    ///   status check)
    pub fn append(&mut self, record: &[u8]) -> LogResult<u32> {
        let mut cursor = *self.cursor()?;
        if record.is_empty() {
            return Err(LogError::BadPointer("record is empty".into()));
        }
        let region = self.core.layout().region();
        if record.len() > region {
            return Err(LogError::bad_param(format!(
                "record of {} bytes exceeds slot size {}",
                record.len(),
                region
            )));
        }

        self.state = LogState::Unchecked;
        let sequence_number = cursor.next_sequence;
        self.core.write_slot(cursor.tail, record, sequence_number)?;
        maybe_crash(points::LOG_AFTER_RECORD_WRITE);

        let slot = cursor.tail;
        cursor.push(self.core.ring());
        self.core.write_cache(&cursor)?;
        self.state = LogState::Ready(cursor);

        self.core.metrics().increment_log_appends();
        log_event_with_fields(
            Event::LogAppend,
            &[
                ("slot", &slot.to_string()),
                ("sequence", &sequence_number.to_string()),
                ("bytes", &record.len().to_string()),
            ],
        );
        Ok(sequence_number)
    }

    /// Copy the record at `position` (0 is the oldest) into `out` and
    /// return its length.
    pub fn read(&mut self, position: u32, out: &mut [u8]) -> LogResult<usize> {
        let cursor = *self.cursor()?;
        if position >= cursor.count {
            return Err(LogError::bad_param(format!(
                "position {} out of range, log holds {} records",
                position, cursor.count
            )));
        }

        let slot = cursor.slot_of(position, self.core.ring());
        let expected = cursor.sequence_of(position);
        let len = match self.core.read_slot(slot)? {
            SlotContent::Record {
                sequence_number,
                len,
            } if sequence_number == expected => len,
            other => {
                return Err(LogError::bad_param(format!(
                    "slot {} should hold sequence {}, found {:?}",
                    slot, expected, other
                )))
            }
        };
        if out.len() < len {
            return Err(LogError::BadPointer(format!(
                "output buffer holds {} bytes, record has {}",
                out.len(),
                len
            )));
        }
        out[..len].copy_from_slice(self.core.record_bytes(len)?);
        Ok(len)
    }

    /// Copy the newest record into `out`.
    pub fn read_latest(&mut self, out: &mut [u8]) -> LogResult<usize> {
        let count = self.cursor()?.count;
        if count == 0 {
            return Err(LogError::bad_param("log is empty"));
        }
        self.read(count - 1, out)
    }

    fn cursor(&self) -> LogResult<&LogCache> {
        match &self.state {
            LogState::Uninitialized => Err(LogError::bad_param("log context is not initialized")),
            LogState::Unchecked => Err(LogError::bad_param("storage status has not been checked")),
            LogState::Ready(cursor) => Ok(cursor),
        }
    }
}
