//! Intra-block recursive doubling

use crate::block::DataBlock;
use crate::coeff::SectionTables;
use crate::simd::LaneVector;

/// Chains the lanes of the last two rows of a ZIC block.
///
/// After the ZIC kernel each lane of rows M-2 and M-1 holds the tail of an
/// independent sample chunk, still missing the y-history flowing in from
/// the chunks to its left. Pass `k` lets every lane absorb the carry from
/// the lane `2^k` below it, advanced by the matching companion power, so
/// after log2(M) passes the two rows hold the correct chunk tails under the
/// block-entering history (0, 0). The remaining rows are repaired later by
/// the forward correction, and the block-entering history by the
/// inter-block pass.
pub fn apply<V, H, const M: usize>(t: &SectionTables<V, H, M>, block: &mut DataBlock<V, M>)
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    let mut r2 = block.data[M - 2];
    let mut r1 = block.data[M - 1];

    for (k, pass) in t.intra.iter().enumerate() {
        let c2 = r2.rd_gather(k as u32);
        let c1 = r1.rd_gather(k as u32);
        let mut n2 = c2.mul_add(pass.c22, r2);
        n2 = c1.mul_add(pass.c12, n2);
        let mut n1 = c2.mul_add(pass.c21, r1);
        n1 = c1.mul_add(pass.c11, n1);
        r2 = n2;
        r1 = n1;
    }

    block.data[M - 2] = r2;
    block.data[M - 1] = r1;
}
