//! Initial-condition correction, forward pass

use crate::block::DataBlock;
use crate::coeff::SectionTables;
use crate::simd::LaneVector;

/// Folds the block's true entering y-history into the whole block.
///
/// On entry rows M-2 and M-1 are correct under zero entering history and
/// `y_inits` holds the real (y(-2), y(-1)) for this block. Two steps:
/// the last two rows gain the homogeneous response of the entering history
/// through the per-lane companion powers; then those corrected rows,
/// shifted up one lane with `y_inits` entering at lane 0, are exactly each
/// chunk's entering history, and rows 0..M-2 gain their response through
/// the impulse tails.
pub fn apply<V, H, const M: usize>(t: &SectionTables<V, H, M>, block: &mut DataBlock<V, M>)
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    let y2 = V::splat(block.y_inits[0]);
    let y1 = V::splat(block.y_inits[1]);

    block.data[M - 2] = t.chunk.c22.mul_add(y2, block.data[M - 2]);
    block.data[M - 2] = t.chunk.c12.mul_add(y1, block.data[M - 2]);
    block.data[M - 1] = t.chunk.c21.mul_add(y2, block.data[M - 1]);
    block.data[M - 1] = t.chunk.c11.mul_add(y1, block.data[M - 1]);

    let yi2 = block.data[M - 2].shift_in(block.y_inits[0]);
    let yi1 = block.data[M - 1].shift_in(block.y_inits[1]);

    let h2 = t.h2.to_lanes();
    let h1 = t.h1.to_lanes();
    for n in 0..M - 2 {
        block.data[n] = yi2.mul_add(V::splat(h2[n]), block.data[n]);
        block.data[n] = yi1.mul_add(V::splat(h1[n]), block.data[n]);
    }
}
