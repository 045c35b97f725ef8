//! Log cursor and its on-media cache encoding
//!
//! The cursor is four little-endian u32 in the data region of each cache
//! page: head, tail, count, next sequence number.

use serde::Serialize;

use super::ring::Ring;

/// Bytes the cursor occupies in the data region
pub const CACHE_LEN: usize = 16;

/// Where the log starts and ends
///
/// `head` is the slot of the oldest record, `tail` the slot the next
/// record goes to. When the ring is full they are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogCache {
    pub head: u32,
    pub tail: u32,
    pub count: u32,
    pub next_sequence: u32,
}

impl LogCache {
    /// Cursor of a freshly formatted log
    pub fn empty() -> Self {
        Self {
            head: 0,
            tail: 0,
            count: 0,
            next_sequence: 1,
        }
    }

    /// Account for one record written at `tail`, dropping the oldest when
    /// the ring is full.
    pub fn push(&mut self, ring: &Ring) {
        if self.count == ring.size() {
            self.head = ring.next_index(self.head);
        } else {
            self.count += 1;
        }
        self.tail = ring.next_index(self.tail);
        self.next_sequence = self.next_sequence.wrapping_add(1);
    }

    /// Slot holding the record at `position` (0 is the oldest)
    pub fn slot_of(&self, position: u32, ring: &Ring) -> u32 {
        ring.advance(self.head, position)
    }

    /// Sequence number the record at `position` must carry
    pub fn sequence_of(&self, position: u32) -> u32 {
        self.next_sequence
            .wrapping_sub(self.count)
            .wrapping_add(position)
    }

    /// Head, tail and count agree with each other and the ring size
    pub fn is_coherent(&self, ring: &Ring) -> bool {
        self.count <= ring.size()
            && self.head < ring.size()
            && self.tail < ring.size()
            && ring.advance(self.head, self.count) == self.tail
    }

    /// `region` must hold at least `CACHE_LEN` bytes.
    pub fn encode_into(&self, region: &mut [u8]) {
        let fields = [self.head, self.tail, self.count, self.next_sequence];
        for (chunk, value) in region[..CACHE_LEN].chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// `region` must hold at least `CACHE_LEN` bytes.
    pub fn decode(region: &[u8]) -> Self {
        let field = |index: usize| {
            let at = index * 4;
            u32::from_le_bytes([region[at], region[at + 1], region[at + 2], region[at + 3]])
        };
        Self {
            head: field(0),
            tail: field(1),
            count: field(2),
            next_sequence: field(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full_then_wrap() {
        let ring = Ring::new(3);
        let mut cache = LogCache::empty();
        for _ in 0..3 {
            cache.push(&ring);
        }
        assert_eq!(
            cache,
            LogCache {
                head: 0,
                tail: 0,
                count: 3,
                next_sequence: 4
            }
        );

        cache.push(&ring);
        assert_eq!((cache.head, cache.tail, cache.count), (1, 1, 3));
        assert_eq!(cache.slot_of(0, &ring), 1);
        assert_eq!(cache.slot_of(2, &ring), 0);
        assert_eq!(cache.sequence_of(0), 2);
        assert_eq!(cache.sequence_of(2), 4);
        assert!(cache.is_coherent(&ring));
    }

    #[test]
    fn test_incoherent_cursor() {
        let ring = Ring::new(4);
        let cache = LogCache {
            head: 1,
            tail: 1,
            count: 2,
            next_sequence: 9,
        };
        assert!(!cache.is_coherent(&ring));
        let out_of_range = LogCache {
            head: 4,
            ..LogCache::empty()
        };
        assert!(!out_of_range.is_coherent(&ring));
    }

    #[test]
    fn test_encoding() {
        let cache = LogCache {
            head: 1,
            tail: 2,
            count: 3,
            next_sequence: 0x0102_0304,
        };
        let mut region = [0u8; CACHE_LEN];
        cache.encode_into(&mut region);
        assert_eq!(&region[12..], &[4, 3, 2, 1]);
        assert_eq!(LogCache::decode(&region), cache);
    }
}
