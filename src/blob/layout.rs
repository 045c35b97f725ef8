//! Where blob pages live
//!
//! Data pages are split into two banks. A transaction always writes the
//! bank the committed descriptor does not name, so committed pages are
//! never touched before the new descriptor lands.
//!
//! With full backup (N pages):
//!
//! ```text
//! [0]        primary descriptor
//! [1, 1+B)   primary bank 0
//! [1+B, 1+2B) primary bank 1
//! [N/2]      backup descriptor
//! ...        backup banks, mirrored page for page
//! ```
//!
//! Without full backup pages 0 and 1 are the descriptor pair and both
//! descriptors point into the same banks starting at page 2.

use crate::config::StorageSettings;
use crate::page::data_region_len;

/// One of the two descriptor/data sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSet {
    Primary,
    Backup,
}

impl PageSet {
    pub fn other(self) -> PageSet {
        match self {
            PageSet::Primary => PageSet::Backup,
            PageSet::Backup => PageSet::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSet::Primary => "primary",
            PageSet::Backup => "backup",
        }
    }
}

/// What a physical page is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRole {
    Descriptor,
    Data { index: u32 },
    /// Left over by rounding; formatted but never used
    Spare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobLayout {
    total_pages: u32,
    full_backup: bool,
    bank_pages: u32,
    region: usize,
}

impl BlobLayout {
    pub fn new(settings: &StorageSettings) -> Self {
        let bank_pages = if settings.full_backup {
            (settings.total_pages / 2).saturating_sub(1) / 2
        } else {
            settings.total_pages.saturating_sub(2) / 2
        };
        Self {
            total_pages: settings.total_pages,
            full_backup: settings.full_backup,
            bank_pages,
            region: data_region_len(settings.page_len),
        }
    }

    pub fn full_backup(&self) -> bool {
        self.full_backup
    }

    /// Data pages per bank
    pub fn bank_pages(&self) -> u32 {
        self.bank_pages
    }

    /// Payload bytes per data page
    pub fn region(&self) -> usize {
        self.region
    }

    /// Largest blob that fits one bank
    pub fn capacity(&self) -> usize {
        self.bank_pages as usize * self.region
    }

    /// Data pages needed for `len` bytes
    pub fn pages_for(&self, len: u32) -> u32 {
        (len as usize).div_ceil(self.region) as u32
    }

    pub fn descriptor(&self, set: PageSet) -> u32 {
        match (set, self.full_backup) {
            (PageSet::Primary, _) => 0,
            (PageSet::Backup, true) => self.total_pages / 2,
            (PageSet::Backup, false) => 1,
        }
    }

    fn data_base(&self, set: PageSet) -> u32 {
        match (set, self.full_backup) {
            (PageSet::Primary, true) => 1,
            (PageSet::Backup, true) => self.total_pages / 2 + 1,
            (_, false) => 2,
        }
    }

    pub fn data_page(&self, set: PageSet, bank: u32, index: u32) -> u32 {
        self.data_base(set) + bank * self.bank_pages + index
    }

    /// Role of a physical page, for formatting
    pub fn role(&self, page: u32) -> PageRole {
        let half = self.total_pages / 2;
        let (descriptors, base) = if self.full_backup {
            ([0, half], if page >= half { half + 1 } else { 1 })
        } else {
            ([0, 1], 2)
        };

        if descriptors.contains(&page) {
            return PageRole::Descriptor;
        }
        let offset = page - base;
        if offset < 2 * self.bank_pages {
            PageRole::Data {
                index: offset % self.bank_pages,
            }
        } else {
            PageRole::Spare
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(total: u32, full_backup: bool) -> BlobLayout {
        BlobLayout::new(&StorageSettings::new(0, total, 64).with_full_backup(full_backup))
    }

    #[test]
    fn test_full_backup_geometry() {
        let l = layout(12, true);
        assert_eq!(l.bank_pages(), 2);
        assert_eq!(l.region(), 32);
        assert_eq!(l.capacity(), 64);
        assert_eq!(l.descriptor(PageSet::Backup), 6);
        assert_eq!(l.data_page(PageSet::Primary, 0, 0), 1);
        assert_eq!(l.data_page(PageSet::Primary, 1, 1), 4);
        assert_eq!(l.data_page(PageSet::Backup, 1, 0), 9);
    }

    #[test]
    fn test_single_set_geometry() {
        let l = layout(8, false);
        assert_eq!(l.bank_pages(), 3);
        assert_eq!(l.descriptor(PageSet::Primary), 0);
        assert_eq!(l.descriptor(PageSet::Backup), 1);
        assert_eq!(
            l.data_page(PageSet::Primary, 1, 2),
            l.data_page(PageSet::Backup, 1, 2)
        );
        assert_eq!(l.data_page(PageSet::Primary, 1, 2), 7);
    }

    #[test]
    fn test_roles_cover_every_page() {
        let l = layout(8, true);
        let roles: Vec<PageRole> = (0..8).map(|p| l.role(p)).collect();
        assert_eq!(
            roles,
            vec![
                PageRole::Descriptor,
                PageRole::Data { index: 0 },
                PageRole::Data { index: 0 },
                PageRole::Spare,
                PageRole::Descriptor,
                PageRole::Data { index: 0 },
                PageRole::Data { index: 0 },
                PageRole::Spare,
            ]
        );
    }

    #[test]
    fn test_pages_for_rounds_up() {
        let l = layout(8, false);
        assert_eq!(l.pages_for(0), 0);
        assert_eq!(l.pages_for(1), 1);
        assert_eq!(l.pages_for(32), 1);
        assert_eq!(l.pages_for(33), 2);
    }
}
