/// Index scratch buffers - rebase 16-bit index lists on the CPU

use crate::graphics_device::IndexData;

/// Reusable storage for rebased index lists
///
/// Used when the device cannot add a base vertex itself. Both buffers only
/// ever grow, so steady-state draws do not allocate.
#[derive(Debug, Default)]
pub struct IndexScratch {
    short: Vec<u16>,
    int: Vec<u32>,
}

impl IndexScratch {
    /// Create empty scratch buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite `indices` so each one has `offset` added
    ///
    /// With `offset == 0` the input is returned as-is. Otherwise the result
    /// stays 16-bit while `offset + max(indices)` fits in a `u16`, and is
    /// promoted to 32-bit scratch when it does not.
    pub fn rebase<'a>(&'a mut self, indices: &'a [u16], offset: usize) -> IndexData<'a> {
        if offset == 0 {
            return IndexData::U16(indices);
        }

        let max_index = indices.iter().copied().max().unwrap_or(0) as usize;
        let count = indices.len();

        if offset + max_index <= u16::MAX as usize {
            if self.short.len() < count {
                self.short.resize(count, 0);
            }
            for (dst, &index) in self.short.iter_mut().zip(indices) {
                *dst = (index as usize + offset) as u16;
            }
            IndexData::U16(&self.short[..count])
        } else {
            if self.int.len() < count {
                self.int.resize(count, 0);
            }
            for (dst, &index) in self.int.iter_mut().zip(indices) {
                *dst = (index as usize + offset) as u32;
            }
            IndexData::U32(&self.int[..count])
        }
    }

    /// Current length of the 16-bit scratch buffer
    pub fn short_len(&self) -> usize {
        self.short.len()
    }

    /// Current length of the 32-bit scratch buffer
    pub fn int_len(&self) -> usize {
        self.int.len()
    }
}

#[cfg(test)]
#[path = "index_scratch_tests.rs"]
mod tests;
