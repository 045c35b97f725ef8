//! Blob descriptor payload
//!
//! Stored in the data region of a descriptor page, four little-endian u32:
//! length, chained CRC of the payload, data page count, bank.

use serde::Serialize;

use crate::page::CRC_BASE_SEED;

/// Bytes the descriptor occupies in the data region
pub const DESCRIPTOR_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub length: u32,
    pub crc: u32,
    pub page_count: u32,
    pub bank: u32,
}

impl Descriptor {
    /// Zero-length blob as written by `format`
    pub fn empty() -> Self {
        Self {
            length: 0,
            crc: CRC_BASE_SEED,
            page_count: 0,
            bank: 0,
        }
    }

    /// `region` must hold at least `DESCRIPTOR_LEN` bytes.
    pub fn encode_into(&self, region: &mut [u8]) {
        let fields = [self.length, self.crc, self.page_count, self.bank];
        for (chunk, value) in region[..DESCRIPTOR_LEN].chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// `region` must hold at least `DESCRIPTOR_LEN` bytes.
    pub fn decode(region: &[u8]) -> Self {
        let field = |index: usize| {
            let at = index * 4;
            u32::from_le_bytes([region[at], region[at + 1], region[at + 2], region[at + 3]])
        };
        Self {
            length: field(0),
            crc: field(1),
            page_count: field(2),
            bank: field(3),
        }
    }
}

/// A blob that passed the consistency check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedBlob {
    pub descriptor: Descriptor,
    pub sequence_number: u32,
}
