//! Ring index arithmetic

/// Wraparound over slot indices `0..=last_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ring {
    last_index: u32,
}

impl Ring {
    /// A ring of `slots` entries; `slots` must be at least 1
    pub fn new(slots: u32) -> Self {
        Self {
            last_index: slots.saturating_sub(1),
        }
    }

    /// Number of slots
    pub fn size(&self) -> u32 {
        self.last_index + 1
    }

    pub fn next_index(&self, index: u32) -> u32 {
        if index == self.last_index {
            0
        } else {
            index + 1
        }
    }

    pub fn prev_index(&self, index: u32) -> u32 {
        if index == 0 {
            self.last_index
        } else {
            index - 1
        }
    }

    /// `index` moved forward by `steps`
    pub fn advance(&self, index: u32, steps: u32) -> u32 {
        ((index as u64 + steps as u64) % self.size() as u64) as u32
    }
}
