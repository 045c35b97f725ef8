//! The injected media capability
//!
//! The physical driver is external to flashsafe. It only has to erase, write
//! and read one whole page at a time and report success or failure. CRC32 is
//! part of the same capability so targets with a hardware CRC unit can
//! supply it; the default uses `crc32fast`.

use std::fmt;

use crc32fast::Hasher;

/// Page-granular access to one storage area
///
/// Every method returns `false` (or `None`) on failure. Retrying is the
/// caller's business.
pub trait FlashDriver {
    /// Erase one page. `size` is the page size of the area.
    fn erase(&mut self, area_id: u32, page: u32, size: usize) -> bool;

    /// Program one full page. `data.len()` is the page size.
    fn write(&mut self, area_id: u32, page: u32, data: &[u8]) -> bool;

    /// Read one full page into `buf`. `buf.len()` is the page size.
    fn read(&mut self, area_id: u32, page: u32, buf: &mut [u8]) -> bool;

    /// CRC32 (IEEE) of `data`, continuing from `seed`.
    ///
    /// `crc32(crc32(seed, a), b)` must equal `crc32(seed, a ++ b)`.
    fn crc32(&mut self, seed: u32, data: &[u8]) -> Option<u32> {
        Some(crc32_with_seed(seed, data))
    }
}

/// Software CRC32 with a chaining seed
pub fn crc32_with_seed(seed: u32, data: &[u8]) -> u32 {
    let mut hasher = Hasher::new_with_initial(seed);
    hasher.update(data);
    hasher.finalize()
}

/// Capability bundle handed to an engine at construction
///
/// Owned by exactly one context and never mutated afterwards.
pub struct Callbacks {
    driver: Box<dyn FlashDriver>,
    write_verify: bool,
}

impl Callbacks {
    /// Wrap a driver. Write-verify is off by default.
    pub fn new(driver: impl FlashDriver + 'static) -> Self {
        Self {
            driver: Box::new(driver),
            write_verify: false,
        }
    }

    /// Read every written page back and compare it byte for byte.
    pub fn with_write_verify(mut self, write_verify: bool) -> Self {
        self.write_verify = write_verify;
        self
    }

    /// Whether writes are read back and compared
    pub fn write_verify(&self) -> bool {
        self.write_verify
    }

    pub(crate) fn driver_mut(&mut self) -> &mut dyn FlashDriver {
        self.driver.as_mut()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("write_verify", &self.write_verify)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_matches_crc32fast() {
        let data = b"flash page payload";
        assert_eq!(crc32_with_seed(0, data), crc32fast::hash(data));
    }

    #[test]
    fn test_crc_chains_across_calls() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let whole = crc32_with_seed(0, data);
        let (a, b) = data.split_at(17);
        let chained = crc32_with_seed(crc32_with_seed(0, a), b);
        assert_eq!(whole, chained);
    }

    #[test]
    fn test_crc_of_nothing_is_seed() {
        assert_eq!(crc32_with_seed(0, &[]), 0);
        assert_eq!(crc32_with_seed(0xDEAD_BEEF, &[]), 0xDEAD_BEEF);
    }

    #[test]
    fn test_crc_detects_single_bit_flip() {
        let mut data = vec![0x00, 0x01, 0x02, 0x03, 0x04];
        let original = crc32_with_seed(0, &data);
        data[2] ^= 0x01;
        assert_ne!(original, crc32_with_seed(0, &data));
    }
}
