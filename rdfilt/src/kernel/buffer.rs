//! Group accumulation ahead of the inter-block pass

use std::mem;

use crate::block::DataBlock;
use crate::simd::LaneVector;

/// Collects blocks into groups sized for one SIMD register.
///
/// A full group of M blocks is emitted as soon as it completes. When the
/// last block of the stream arrives, whatever remains is flushed
/// front-first in power-of-two groups (M/2, then M/4, ... down to 1), so
/// the inter-block pass keeps its logarithmic depth on the tail instead of
/// falling back to per-block updates. M must be a power of two, which makes
/// every group's starting tag a multiple of its size.
pub struct GroupBuffer<V: LaneVector, const M: usize> {
    pending: Vec<DataBlock<V, M>>,
}

impl<V: LaneVector, const M: usize> GroupBuffer<V, M> {
    pub fn new() -> Self {
        debug_assert!(M.is_power_of_two() && M >= 2);
        Self {
            pending: Vec::with_capacity(M),
        }
    }

    /// Accepts one block (in tag order) and returns the groups that became
    /// due, oldest first.
    pub fn push(&mut self, block: DataBlock<V, M>) -> Vec<Vec<DataBlock<V, M>>> {
        let flush = block.last;
        self.pending.push(block);

        let mut due = Vec::new();
        if self.pending.len() == M {
            due.push(mem::replace(&mut self.pending, Vec::with_capacity(M)));
        }

        if flush {
            let mut size = M / 2;
            loop {
                if self.pending.len() >= size {
                    due.push(self.pending.drain(..size).collect());
                }
                if size == 1 {
                    break;
                }
                size /= 2;
            }
            debug_assert!(self.pending.is_empty());
        }

        due
    }
}

impl<V: LaneVector, const M: usize> Default for GroupBuffer<V, M> {
    fn default() -> Self {
        Self::new()
    }
}
