//! Zero-initial-condition block kernel

use crate::block::DataBlock;
use crate::coeff::SectionTables;
use crate::simd::LaneVector;

/// Runs the section's recursion over a permuted block as if the entering
/// y-history were zero, using the true x-history carried in `x_inits`.
///
/// Each lane is an independent run of M consecutive samples; the lane-0
/// shift-in of `x_inits` and the neighbouring rows supply every lane's two
/// preceding inputs. The output is the particular part of the solution; the
/// homogeneous part driven by the real y-history is folded in later by the
/// recursive-doubling stages.
///
/// On the last block the final two true input samples are recorded into
/// `post_inits` before they are overwritten.
pub fn apply<V, H, const M: usize>(t: &SectionTables<V, H, M>, block: &mut DataBlock<V, M>)
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    if block.last {
        block.post_inits.push(block.data[M - 2].lane(M - 1));
        block.post_inits.push(block.data[M - 1].lane(M - 1));
    }

    let b1 = V::splat(t.biquad.b1);
    let b2 = V::splat(t.biquad.b2);
    let a1 = V::splat(t.biquad.a1);
    let a2 = V::splat(t.biquad.a2);

    // Rows M-2 and M-1 hold each lane's two preceding samples once shifted
    // up by one lane, with the block-level history entering at lane 0.
    let xi2 = block.data[M - 2].shift_in(block.x_inits[0]);
    let xi1 = block.data[M - 1].shift_in(block.x_inits[1]);

    let mut w = [V::zero(); M];

    let mut v = xi2.mul_add(b2, block.data[0]);
    v = xi1.mul_add(b1, v);
    w[0] = v;

    let mut v = xi1.mul_add(b2, block.data[1]);
    v = block.data[0].mul_add(b1, v);
    w[1] = w[0].mul_add(a1, v);

    for n in 2..M {
        let mut v = block.data[n - 2].mul_add(b2, block.data[n]);
        v = block.data[n - 1].mul_add(b1, v);
        let mut y = w[n - 2].mul_add(a2, v);
        y = w[n - 1].mul_add(a1, y);
        w[n] = y;
    }

    block.data = w;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::transpose;
    use crate::coeff::Biquad;
    use approx::assert_relative_eq;
    use wide::{f32x4, f32x8};

    fn tables() -> SectionTables<f32x8, f32x4, 8> {
        SectionTables::new(Biquad {
            b1: 0.1,
            b2: -0.5,
            a1: 0.2,
            a2: 0.3,
        })
    }

    fn zero_block() -> DataBlock<f32x8, 8> {
        DataBlock::from_samples(0, &[0.0f32; 64], false)
    }

    #[test]
    fn lane_zero_response_to_x_history_is_the_p_tails() {
        // With zero input data and a lone x(-2) = 1, the first sample chunk
        // must trace out the precomputed p2 weights; likewise x(-1) and p1.
        let t = tables();

        let mut block = zero_block();
        block.x_inits = [1.0, 0.0];
        apply(&t, &mut block);
        for n in 0..8 {
            assert_relative_eq!(block.data[n].to_array()[0], t.p2.to_array()[n], epsilon = 1e-6);
        }

        let mut block = zero_block();
        block.x_inits = [0.0, 1.0];
        apply(&t, &mut block);
        for n in 0..8 {
            assert_relative_eq!(block.data[n].to_array()[0], t.p1.to_array()[n], epsilon = 1e-6);
        }
    }

    #[test]
    fn first_chunk_matches_the_scalar_recursion() {
        // Lane 0 of the permuted block is the first 8 samples; with true
        // x-history and zero y-history it must equal the direct recursion.
        let t = tables();
        let samples: Vec<f32> = (0..64).map(|v| v as f32 * 0.25).collect();
        let mut block = DataBlock::from_samples(0, &samples, false);
        block.data = transpose(&block.data);
        block.x_inits = [3.0, 2.0]; // x(-2), x(-1)

        apply(&t, &mut block);

        let (mut x1, mut x2) = (2.0f32, 3.0f32);
        let (mut y1, mut y2) = (0.0f32, 0.0f32);
        for n in 0..8 {
            let x = samples[n];
            let y = x + 0.1 * x1 - 0.5 * x2 + 0.2 * y1 + 0.3 * y2;
            assert_relative_eq!(block.data[n].to_array()[0], y, epsilon = 1e-4);
            x2 = x1;
            x1 = x;
            y2 = y1;
            y1 = y;
        }
    }

    #[test]
    fn last_block_records_final_inputs_before_overwrite() {
        let t = tables();
        let samples: Vec<f32> = (0..64).map(|v| v as f32).collect();
        let mut block = DataBlock::from_samples(0, &samples, true);
        block.data = transpose(&block.data);

        apply(&t, &mut block);

        // The stream's last two x values, in (x(-2), x(-1)) order.
        assert_eq!(block.post_inits, vec![62.0, 63.0]);
    }
}
