//! In-memory flash with fault injection
//!
//! Behaves like NOR flash: erase sets every byte to `0xFF`, programming can
//! only clear bits. Handles are cheap clones sharing the same media, so a
//! test can keep one handle while an engine owns another, then inspect or
//! damage pages between operations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::driver::{crc32_with_seed, FlashDriver};

/// Byte value of an erased cell
pub const ERASED_BYTE: u8 = 0xFF;

#[derive(Debug, Default)]
struct Faults {
    fail_erases: u32,
    fail_writes: u32,
    fail_reads: u32,
    fail_crcs: u32,
    tear_writes: u32,
    /// Successful writes left before power is lost
    write_budget: Option<u32>,
}

#[derive(Debug)]
struct Media {
    page_size: usize,
    pages: Vec<Vec<u8>>,
    faults: Faults,
    erases: u64,
    writes: u64,
}

impl Media {
    fn page_mut(&mut self, page: u32) -> Option<&mut Vec<u8>> {
        self.pages.get_mut(page as usize)
    }
}

/// Shared in-memory media
#[derive(Debug, Clone)]
pub struct MemoryFlash {
    media: Arc<Mutex<Media>>,
}

impl MemoryFlash {
    /// Fresh, fully erased media
    pub fn new(total_pages: u32, page_size: usize) -> Self {
        let media = Media {
            page_size,
            pages: vec![vec![ERASED_BYTE; page_size]; total_pages as usize],
            faults: Faults::default(),
            erases: 0,
            writes: 0,
        };
        Self {
            media: Arc::new(Mutex::new(media)),
        }
    }

    fn media(&self) -> MutexGuard<'_, Media> {
        self.media.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn page_size(&self) -> usize {
        self.media().page_size
    }

    pub fn total_pages(&self) -> u32 {
        self.media().pages.len() as u32
    }

    /// Copy of one page's raw bytes (empty if out of range)
    pub fn page(&self, page: u32) -> Vec<u8> {
        self.media()
            .pages
            .get(page as usize)
            .cloned()
            .unwrap_or_default()
    }

    /// Overwrite one page's raw bytes, bypassing flash semantics
    pub fn set_page(&self, page: u32, bytes: &[u8]) {
        if let Some(target) = self.media().page_mut(page) {
            let len = bytes.len().min(target.len());
            target[..len].copy_from_slice(&bytes[..len]);
        }
    }

    /// Invert every bit of one byte
    pub fn corrupt_byte(&self, page: u32, offset: usize) {
        if let Some(byte) = self
            .media()
            .page_mut(page)
            .and_then(|target| target.get_mut(offset))
        {
            *byte ^= 0xFF;
        }
    }

    /// Flip a single bit
    pub fn flip_bit(&self, page: u32, offset: usize, bit: u8) {
        if let Some(byte) = self
            .media()
            .page_mut(page)
            .and_then(|target| target.get_mut(offset))
        {
            *byte ^= 1 << (bit % 8);
        }
    }

    /// Reset one page to the erased state
    pub fn wipe_page(&self, page: u32) {
        if let Some(target) = self.media().page_mut(page) {
            target.fill(ERASED_BYTE);
        }
    }

    pub fn fail_next_erases(&self, count: u32) {
        self.media().faults.fail_erases = count;
    }

    pub fn fail_next_writes(&self, count: u32) {
        self.media().faults.fail_writes = count;
    }

    pub fn fail_next_reads(&self, count: u32) {
        self.media().faults.fail_reads = count;
    }

    pub fn fail_next_crcs(&self, count: u32) {
        self.media().faults.fail_crcs = count;
    }

    /// The next `count` writes program only the first half of the page and
    /// still report success.
    pub fn tear_next_writes(&self, count: u32) {
        self.media().faults.tear_writes = count;
    }

    /// Allow `writes` more successful page writes, then fail every write
    /// until [`restore_power`](Self::restore_power). Erases keep working, so
    /// the page being written when power drops is left blank.
    pub fn power_loss_after_writes(&self, writes: u32) {
        self.media().faults.write_budget = Some(writes);
    }

    /// Clear every pending fault
    pub fn restore_power(&self) {
        self.media().faults = Faults::default();
    }

    /// Successful page writes so far
    pub fn write_count(&self) -> u64 {
        self.media().writes
    }

    /// Successful page erases so far
    pub fn erase_count(&self) -> u64 {
        self.media().erases
    }
}

fn take_fault(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

impl FlashDriver for MemoryFlash {
    fn erase(&mut self, _area_id: u32, page: u32, size: usize) -> bool {
        let mut media = self.media();
        if size != media.page_size || take_fault(&mut media.faults.fail_erases) {
            return false;
        }
        match media.page_mut(page) {
            Some(target) => {
                target.fill(ERASED_BYTE);
                media.erases += 1;
                true
            }
            None => false,
        }
    }

    fn write(&mut self, _area_id: u32, page: u32, data: &[u8]) -> bool {
        let mut media = self.media();
        if data.len() != media.page_size || take_fault(&mut media.faults.fail_writes) {
            return false;
        }
        match media.faults.write_budget {
            Some(0) => return false,
            Some(left) => media.faults.write_budget = Some(left - 1),
            None => {}
        }
        let torn = take_fault(&mut media.faults.tear_writes);
        let Some(target) = media.page_mut(page) else {
            return false;
        };

        let programmed = if torn { data.len() / 2 } else { data.len() };
        for (cell, byte) in target.iter_mut().zip(&data[..programmed]) {
            *cell &= *byte;
        }
        media.writes += 1;
        true
    }

    fn read(&mut self, _area_id: u32, page: u32, buf: &mut [u8]) -> bool {
        let mut media = self.media();
        if take_fault(&mut media.faults.fail_reads) {
            return false;
        }
        match media.pages.get(page as usize) {
            Some(source) if source.len() == buf.len() => {
                buf.copy_from_slice(source);
                true
            }
            _ => false,
        }
    }

    fn crc32(&mut self, seed: u32, data: &[u8]) -> Option<u32> {
        if take_fault(&mut self.media().faults.fail_crcs) {
            return None;
        }
        Some(crc32_with_seed(seed, data))
    }
}
