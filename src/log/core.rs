//! Page-level log operations: slots, the cache pair and ring scanning

use std::sync::Arc;

use super::cache::{LogCache, CACHE_LEN};
use super::errors::{LogError, LogResult};
use super::layout::LogLayout;
use super::ring::Ring;
use crate::config::StorageSettings;
use crate::crash_point::{maybe_crash, points};
use crate::io::{Callbacks, ReliableIo};
use crate::observability::MetricsRegistry;
use crate::page::{
    data_region, data_region_mut, page_type, sequence_is_newer, sub_type, Health, PageMetadata,
    PageStore,
};

/// What a slot holds after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotContent {
    /// A record of `len` bytes, now in the read buffer
    Record { sequence_number: u32, len: usize },
    /// Formatted, never written
    Empty,
    /// Neither copy validates
    Invalid,
}

pub struct LogCore {
    store: PageStore,
    settings: StorageSettings,
    layout: LogLayout,
    ring: Ring,
    /// `[0]` for outgoing pages, `[1]` for reads
    scratch: [Vec<u8>; 2],
}

impl LogCore {
    pub fn new(settings: StorageSettings, callbacks: Callbacks) -> LogResult<Self> {
        settings
            .validate()
            .map_err(|e| LogError::bad_param(e.to_string()))?;

        let layout = LogLayout::new(&settings);
        if layout.flash_cache() && layout.region() < CACHE_LEN {
            return Err(LogError::bad_param(format!(
                "page data region of {} bytes cannot hold the {}-byte cursor cache",
                layout.region(),
                CACHE_LEN
            )));
        }

        let io = ReliableIo::new(settings.area(), callbacks);
        Ok(Self {
            store: PageStore::new(io, settings.retry_count),
            settings,
            layout,
            ring: Ring::new(layout.slots()),
            scratch: [vec![0u8; settings.page_len], vec![0u8; settings.page_len]],
        })
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    pub fn layout(&self) -> &LogLayout {
        &self.layout
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        self.store.metrics()
    }

    fn meta(&self, page_sub_type: u32) -> PageMetadata {
        PageMetadata::new(page_type::LOG, page_sub_type, self.settings.format_version)
    }

    /// Write `cache` to the original, then the backup page.
    pub fn write_cache(&mut self, cache: &LogCache) -> LogResult<()> {
        let Some((orig, backup)) = self.layout.cache_pair() else {
            return Ok(());
        };
        let meta = self
            .meta(sub_type::CACHE)
            .with_byte_filled(CACHE_LEN as u32)
            .with_element_count(cache.count)
            .with_sequence(cache.next_sequence);

        let buf = &mut self.scratch[0];
        buf.fill(0);
        cache.encode_into(data_region_mut(buf));
        self.store.write_validated_page(orig, buf, &meta)?;
        maybe_crash(points::LOG_AFTER_CACHE_ORIGINAL);
        self.store.write_raw(backup, buf)?;
        Ok(())
    }

    /// Reconcile the cache pair and decode it. `None` when both copies are
    /// gone or the page is not a cache page.
    pub fn read_cache(&mut self) -> LogResult<Option<(LogCache, Health)>> {
        let Some((orig, backup)) = self.layout.cache_pair() else {
            return Ok(None);
        };
        let [orig_buf, backup_buf] = &mut self.scratch;
        let health = match self.store.reconcile_pair(orig, backup, orig_buf, backup_buf) {
            Ok(health) => health,
            Err(err) if err.is_not_valid() => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let meta = PageMetadata::decode(orig_buf)?;
        if !meta.is_kind(page_type::LOG, sub_type::CACHE) {
            return Ok(None);
        }
        Ok(Some((LogCache::decode(data_region(orig_buf)), health)))
    }

    /// Write `record` into `slot` and its mirror.
    pub fn write_slot(&mut self, slot: u32, record: &[u8], sequence_number: u32) -> LogResult<()> {
        let meta = self
            .meta(sub_type::RECORD)
            .with_byte_filled(record.len() as u32)
            .with_element_count(slot)
            .with_sequence(sequence_number);
        self.write_slot_pages(slot, record, &meta)
    }

    fn write_empty_slot(&mut self, slot: u32) -> LogResult<()> {
        let meta = self.meta(sub_type::EMPTY).with_element_count(slot);
        self.write_slot_pages(slot, &[], &meta)
    }

    fn write_slot_pages(&mut self, slot: u32, payload: &[u8], meta: &PageMetadata) -> LogResult<()> {
        let region = self.layout.region();
        if payload.len() > region {
            return Err(LogError::bad_param(format!(
                "record of {} bytes exceeds slot size {}",
                payload.len(),
                region
            )));
        }
        let page = self.layout.slot_page(slot);
        let buf = &mut self.scratch[0];
        buf.fill(0);
        data_region_mut(buf)[..payload.len()].copy_from_slice(payload);
        self.store.write_validated_page(page, buf, meta)?;

        if let Some(mirror) = self.layout.mirror_page(slot) {
            self.store.write_raw(mirror, &self.scratch[0])?;
        }
        Ok(())
    }

    /// Validate `slot` into the read buffer, trying the mirror when the
    /// slot page is damaged.
    pub fn read_slot(&mut self, slot: u32) -> LogResult<SlotContent> {
        let mut meta = self.validate_page(self.layout.slot_page(slot))?;
        if meta.is_none() {
            if let Some(mirror) = self.layout.mirror_page(slot) {
                meta = self.validate_page(mirror)?;
            }
        }

        let Some(meta) = meta else {
            return Ok(SlotContent::Invalid);
        };
        let len = meta.byte_filled as usize;
        Ok(
            if meta.is_kind(page_type::LOG, sub_type::RECORD) && len <= self.layout.region() {
                SlotContent::Record {
                    sequence_number: meta.sequence_number,
                    len,
                }
            } else if meta.is_kind(page_type::LOG, sub_type::EMPTY) {
                SlotContent::Empty
            } else {
                SlotContent::Invalid
            },
        )
    }

    /// Payload bytes of the last slot read
    pub fn record_bytes(&self, len: usize) -> LogResult<&[u8]> {
        data_region(&self.scratch[1]).get(..len).ok_or_else(|| {
            LogError::bad_param(format!(
                "record length {} exceeds slot size {}",
                len,
                self.layout.region()
            ))
        })
    }

    /// Sequence number of the record in `slot`, if it holds one
    pub fn slot_sequence(&mut self, slot: u32) -> LogResult<Option<u32>> {
        Ok(match self.read_slot(slot)? {
            SlotContent::Record {
                sequence_number, ..
            } => Some(sequence_number),
            _ => None,
        })
    }

    fn validate_page(&mut self, page: u32) -> LogResult<Option<PageMetadata>> {
        match self.store.read_and_validate_page(page, &mut self.scratch[1]) {
            Ok(meta) => Ok(Some(meta)),
            Err(err) if err.is_not_valid() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Reconcile every slot with its mirror. A slot whose copies are both
    /// invalid is left as a hole.
    pub fn reconcile_slots(&mut self) -> LogResult<Health> {
        let mut health = Health::Ok;
        for slot in 0..self.layout.slots() {
            let Some(mirror) = self.layout.mirror_page(slot) else {
                break;
            };
            let [orig_buf, backup_buf] = &mut self.scratch;
            match self.store.reconcile_pair(
                self.layout.slot_page(slot),
                mirror,
                orig_buf,
                backup_buf,
            ) {
                Ok(pair) => health = health.merge(pair),
                Err(err) if err.is_not_valid() => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(health)
    }

    /// Rebuild the cursor from the ring alone.
    ///
    /// The newest record wins; the log extends backwards from it over
    /// slots whose sequence numbers are contiguous.
    pub fn scan(&mut self) -> LogResult<LogCache> {
        let slots = self.layout.slots();
        let mut sequences = Vec::with_capacity(slots as usize);
        let mut valid_pages = 0;
        for slot in 0..slots {
            let content = self.read_slot(slot)?;
            if content != SlotContent::Invalid {
                valid_pages += 1;
            }
            sequences.push(match content {
                SlotContent::Record {
                    sequence_number, ..
                } => Some(sequence_number),
                _ => None,
            });
        }
        if valid_pages == 0 {
            return Err(LogError::bad_param(
                "no valid log pages found, format required",
            ));
        }

        let newest = sequences
            .iter()
            .enumerate()
            .filter_map(|(slot, seq)| seq.map(|seq| (slot as u32, seq)))
            .reduce(|best, candidate| {
                if sequence_is_newer(candidate.1, best.1) {
                    candidate
                } else {
                    best
                }
            });
        let Some((newest_slot, newest_seq)) = newest else {
            return Ok(LogCache::empty());
        };

        let mut count = 1;
        let mut slot = self.ring.prev_index(newest_slot);
        while count < slots && sequences[slot as usize] == Some(newest_seq.wrapping_sub(count)) {
            count += 1;
            slot = self.ring.prev_index(slot);
        }

        let tail = self.ring.next_index(newest_slot);
        Ok(LogCache {
            head: self.ring.advance(tail, slots - count),
            tail,
            count,
            next_sequence: newest_seq.wrapping_add(1),
        })
    }

    /// Every live position holds the record the cursor expects.
    pub fn cursor_matches_ring(&mut self, cache: &LogCache) -> LogResult<bool> {
        if !cache.is_coherent(&self.ring) {
            return Ok(false);
        }
        for position in 0..cache.count {
            let slot = cache.slot_of(position, &self.ring);
            if self.slot_sequence(slot)? != Some(cache.sequence_of(position)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Write every slot empty and reset the cache.
    pub fn format_pages(&mut self) -> LogResult<()> {
        let slots = self.layout.slots();
        for slot in 0..slots {
            if slot == slots / 2 {
                maybe_crash(points::FORMAT_HALFWAY);
            }
            self.write_empty_slot(slot)?;
        }
        self.write_cache(&LogCache::empty())
    }
}
