//! Page trailer layout
//!
//! Every page ends with a 32-byte trailer of little-endian u32 fields:
//!
//! | offset | field                   |
//! |--------|-------------------------|
//! | +0     | page_type               |
//! | +4     | page_sub_type           |
//! | +8     | page_version            |
//! | +12    | byte_filled             |
//! | +16    | present_element_count   |
//! | +20    | sequence_number         |
//! | +24    | magic_number            |
//! | +28    | crc                     |
//!
//! Offsets are relative to `page.len() - METADATA_SIZE`. The CRC covers the
//! whole page except its last four bytes.

use serde::Serialize;

use super::errors::{PageError, PageResult};

/// Size of the trailer in bytes
pub const METADATA_SIZE: usize = 32;

/// Marks a page written by flashsafe
pub const PAGE_MAGIC: u32 = 0x5AFE_F1A5;

/// Seed for page and blob CRCs
pub const CRC_BASE_SEED: u32 = 0;

/// Size of the trailing CRC field
pub const CRC_SIZE: usize = 4;

/// Page type tags
pub mod page_type {
    pub const BLOB: u32 = 0xB10B;
    pub const LOG: u32 = 0x1067;
}

/// Page sub-type tags
pub mod sub_type {
    /// Blob descriptor page
    pub const DESCRIPTOR: u32 = 1;
    /// Blob payload page
    pub const DATA: u32 = 2;

    /// Log slot holding a record
    pub const RECORD: u32 = 1;
    /// Formatted log slot with no record
    pub const EMPTY: u32 = 2;
    /// Log cursor cache (both copies)
    pub const CACHE: u32 = 3;
}

/// Decoded page trailer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub page_type: u32,
    pub page_sub_type: u32,
    pub page_version: u32,
    pub byte_filled: u32,
    pub present_element_count: u32,
    pub sequence_number: u32,
    pub magic_number: u32,
    pub crc: u32,
}

impl PageMetadata {
    /// Trailer for a page of the given type, stamped with the magic
    pub fn new(page_type: u32, page_sub_type: u32, page_version: u32) -> Self {
        Self {
            page_type,
            page_sub_type,
            page_version,
            magic_number: PAGE_MAGIC,
            ..Self::default()
        }
    }

    pub fn with_byte_filled(mut self, byte_filled: u32) -> Self {
        self.byte_filled = byte_filled;
        self
    }

    pub fn with_element_count(mut self, count: u32) -> Self {
        self.present_element_count = count;
        self
    }

    pub fn with_sequence(mut self, sequence_number: u32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// Read the trailer from the tail of `page`.
    pub fn decode(page: &[u8]) -> PageResult<Self> {
        let base = trailer_offset(page.len())?;
        let field = |index: usize| {
            let at = base + index * 4;
            u32::from_le_bytes([page[at], page[at + 1], page[at + 2], page[at + 3]])
        };

        Ok(Self {
            page_type: field(0),
            page_sub_type: field(1),
            page_version: field(2),
            byte_filled: field(3),
            present_element_count: field(4),
            sequence_number: field(5),
            magic_number: field(6),
            crc: field(7),
        })
    }

    /// Overwrite the trailer at the tail of `page`. The data region is left
    /// alone.
    pub fn encode(&self, page: &mut [u8]) -> PageResult<()> {
        let base = trailer_offset(page.len())?;
        let fields = [
            self.page_type,
            self.page_sub_type,
            self.page_version,
            self.byte_filled,
            self.present_element_count,
            self.sequence_number,
            self.magic_number,
            self.crc,
        ];
        for (index, value) in fields.iter().enumerate() {
            let at = base + index * 4;
            page[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    pub fn has_magic(&self) -> bool {
        self.magic_number == PAGE_MAGIC
    }

    pub fn is_kind(&self, page_type: u32, page_sub_type: u32) -> bool {
        self.page_type == page_type && self.page_sub_type == page_sub_type
    }
}

fn trailer_offset(len: usize) -> PageResult<usize> {
    len.checked_sub(METADATA_SIZE).ok_or_else(|| {
        PageError::BadParam(format!(
            "page of {} bytes cannot hold a {}-byte trailer",
            len, METADATA_SIZE
        ))
    })
}

/// Usable bytes in front of the trailer
pub fn data_region(page: &[u8]) -> &[u8] {
    &page[..page.len().saturating_sub(METADATA_SIZE)]
}

pub fn data_region_mut(page: &mut [u8]) -> &mut [u8] {
    let end = page.len().saturating_sub(METADATA_SIZE);
    &mut page[..end]
}

/// Data region size for a page of `page_len` bytes
pub fn data_region_len(page_len: usize) -> usize {
    page_len.saturating_sub(METADATA_SIZE)
}

/// True if `a` was issued after `b`, allowing for u32 wraparound
pub fn sequence_is_newer(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}
