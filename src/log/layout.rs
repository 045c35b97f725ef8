//! Where log pages live
//!
//! With the flash cache, pages 0 and 1 hold the cursor cache pair and the
//! ring starts at page 2. With full backup the ring pages are split in
//! halves and slot `i` is mirrored at slot page `i + slots`.

use crate::config::StorageSettings;
use crate::page::data_region_len;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLayout {
    flash_cache: bool,
    full_backup: bool,
    ring_base: u32,
    slots: u32,
    region: usize,
}

impl LogLayout {
    pub fn new(settings: &StorageSettings) -> Self {
        let ring_base = if settings.flash_cache { 2 } else { 0 };
        let ring_pages = settings.total_pages.saturating_sub(ring_base);
        let slots = if settings.full_backup {
            ring_pages / 2
        } else {
            ring_pages
        };
        Self {
            flash_cache: settings.flash_cache,
            full_backup: settings.full_backup,
            ring_base,
            slots,
            region: data_region_len(settings.page_len),
        }
    }

    pub fn flash_cache(&self) -> bool {
        self.flash_cache
    }

    /// Number of record slots, which is also the log capacity
    pub fn slots(&self) -> u32 {
        self.slots
    }

    /// Largest record in bytes
    pub fn region(&self) -> usize {
        self.region
    }

    /// Cache original and backup pages
    pub fn cache_pair(&self) -> Option<(u32, u32)> {
        self.flash_cache.then_some((0, 1))
    }

    pub fn slot_page(&self, slot: u32) -> u32 {
        self.ring_base + slot
    }

    pub fn mirror_page(&self, slot: u32) -> Option<u32> {
        self.full_backup
            .then(|| self.ring_base + self.slots + slot)
    }
}
