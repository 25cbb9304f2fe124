//! Serial x-history attachment

use crate::block::DataBlock;
use crate::history::History;
use crate::simd::{LaneVector, Scalar};

/// Attaches the stream's x-history to each block in tag order.
///
/// Stamps the current register into `x_inits`, then shifts in the block's
/// own final two samples, which after the prior permute sit in the top lane
/// of the last two rows.
pub struct InitAdder<T> {
    hist: History<T>,
}

impl<T: Scalar> InitAdder<T> {
    /// `x2` and `x1` are the stream's x(-2) and x(-1) ahead of the first
    /// block.
    pub fn new(x2: T, x1: T) -> Self {
        Self {
            hist: History::seeded(x2, x1),
        }
    }

    pub fn apply<V, const M: usize>(&mut self, block: &mut DataBlock<V, M>)
    where
        V: LaneVector<Scalar = T>,
    {
        block.x_inits[0] = self.hist.prev2();
        block.x_inits[1] = self.hist.prev1();

        self.hist.shift(block.data[M - 2].lane(M - 1));
        self.hist.shift(block.data[M - 1].lane(M - 1));
    }
}
