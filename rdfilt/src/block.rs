//! Blocks of samples in flight through the pipeline

use crate::simd::LaneVector;

/// One unit of work: an M×M matrix of samples plus the history values and
/// bookkeeping attached to it along the way.
///
/// A block is created at the source, mutated in place by each stage, and
/// consumed at the sink; it moves by value along the edges so no stage can
/// alias another's block. `tag` is the block's position in the stream and is
/// what the sequencers key on.
#[derive(Debug, Clone)]
pub struct DataBlock<V: LaneVector, const M: usize> {
    /// Position of this block in the stream, gap-free from 0.
    pub tag: usize,
    /// Row-major on entry; after the prior permute, row `n` lane `j` holds
    /// the sample originally at `j * M + n`.
    pub data: [V; M],
    /// x-history entering this block: `[0]` is x(-2), `[1]` is x(-1).
    pub x_inits: [V::Scalar; 2],
    /// y-history entering this block, filled in by the inter-block pass:
    /// `[0]` is y(-2), `[1]` is y(-1).
    pub y_inits: [V::Scalar; 2],
    /// Set on the final block of a multicore pass.
    pub last: bool,
    /// Only populated on the last block: each section appends its final
    /// (x(-2), x(-1), y(-2), y(-1)) in pipeline order, for the driver to
    /// re-seed its state from.
    pub post_inits: Vec<V::Scalar>,
}

impl<V: LaneVector, const M: usize> DataBlock<V, M> {
    /// Builds a block from `M * M` contiguous samples, row-major.
    pub fn from_samples(tag: usize, samples: &[V::Scalar], last: bool) -> Self {
        debug_assert_eq!(samples.len(), M * M);
        let mut data = [V::zero(); M];
        for (n, row) in data.iter_mut().enumerate() {
            *row = V::from_slice(&samples[n * M..(n + 1) * M]);
        }
        Self {
            tag,
            data,
            x_inits: [V::Scalar::default(); 2],
            y_inits: [V::Scalar::default(); 2],
            last,
            post_inits: Vec::new(),
        }
    }
}

/// Transposes an M×M lane matrix between row-major and column-major views.
///
/// Applying it twice is the identity, so the same function serves as both
/// the prior and the post permute. The constant-index lane rebuild below
/// compiles to plain shuffles for the widths in use.
pub fn transpose<V: LaneVector, const M: usize>(m: &[V; M]) -> [V; M] {
    debug_assert_eq!(M, V::LANES);
    let rows: [V::Lanes; M] = core::array::from_fn(|n| m[n].to_lanes());
    core::array::from_fn(|n| {
        let mut lanes = V::zero().to_lanes();
        // Constant indices throughout, so this whole gather loop lowers to
        // shuffles rather than per-element copies.
        for (j, row) in rows.iter().enumerate() {
            lanes[j] = row[n];
        }
        V::from_lanes(lanes)
    })
}
