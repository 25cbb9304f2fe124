//! Per-section coefficient precomputation
//!
//! Everything here is a pure function of one section's (b1, b2, a1, a2),
//! built once when the filter is constructed and shared read-only by the
//! concurrent kernels afterwards.
//!
//! The central objects are the impulse tails of the recursion. With
//! h(0) = 1, h(1) = a1, h(n) = a1·h(n-1) + a2·h(n-2), the output of a
//! section at offset n splits into a part driven by the inputs and a part
//! driven by the entering y-history:
//!
//!   y(n) = w(n) + h2(n)·y(-2) + h1(n)·y(-1)
//!
//! where h2 = a2·h and h1 is h delayed by one. Reading that identity at
//! offsets M-2 and M-1 gives the 2×2 matrix advancing (y(-2), y(-1)) across
//! M samples; its powers are what the recursive-doubling passes compose, at
//! a stride of one sample chunk within a block and one whole block between
//! blocks.

use num_traits::{One, Zero};

use crate::simd::LaneVector;

/// One second-order section, with b0 already normalised to 1.
#[derive(Debug, Clone, Copy)]
pub struct Biquad<T> {
    pub b1: T,
    pub b2: T,
    pub a1: T,
    pub a2: T,
}

/// The four positions of a 2×2 state-advance matrix, one power per lane.
#[derive(Debug, Clone, Copy)]
pub struct CompanionVectors<W> {
    pub c22: W,
    pub c12: W,
    pub c21: W,
    pub c11: W,
}

/// All tables one section needs, at full width `V` for the block kernels
/// and half width `H` for the inter-block group fallback.
#[derive(Debug, Clone)]
pub struct SectionTables<V, H, const M: usize>
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    pub biquad: Biquad<V::Scalar>,

    /// Lane response to the entering y-history: h2 = a2·h(0..M),
    /// h1 = h(1..=M).
    pub h2: V,
    pub h1: V,

    /// Lane response to the entering x-history (x(-2) and x(-1)).
    pub p2: V,
    pub p1: V,

    /// Scalar companion-power tables: index n holds the matrix advancing
    /// the y-history by (n+1)·M samples. Length M·M/2, enough for the
    /// deepest inter-block pass.
    pub c22: Vec<V::Scalar>,
    pub c12: Vec<V::Scalar>,
    pub c21: Vec<V::Scalar>,
    pub c11: Vec<V::Scalar>,

    /// The first M powers, one per lane; lane j advances by (j+1)·M
    /// samples. Used by the forward correction.
    pub chunk: CompanionVectors<V>,

    /// Intra-block pass vectors, one entry per recursive-doubling pass,
    /// strided in sample chunks.
    pub intra: Vec<CompanionVectors<V>>,

    /// Inter-block seed (previous group's tail into lane 0) and pass
    /// vectors, strided in whole blocks.
    pub inter_seed: CompanionVectors<V>,
    pub inter: Vec<CompanionVectors<V>>,

    /// Same as `inter_seed`/`inter` at half width, for the M/2 group
    /// fallback at end of stream.
    pub half_seed: CompanionVectors<H>,
    pub half: Vec<CompanionVectors<H>>,
}

impl<V, H, const M: usize> SectionTables<V, H, M>
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    pub fn new(biquad: Biquad<V::Scalar>) -> Self {
        debug_assert_eq!(M, V::LANES);
        debug_assert_eq!(M / 2, H::LANES);

        let Biquad { b1, b2, a1, a2 } = biquad;

        // Impulse tail h and the two input-weight tails, all sharing the
        // same recurrence.
        let mut h0 = vec![V::Scalar::zero(); M + 1];
        let mut p2 = vec![V::Scalar::zero(); M];
        let mut p1 = vec![V::Scalar::zero(); M];
        h0[0] = V::Scalar::one();
        h0[1] = a1;
        p2[0] = b2;
        p2[1] = a1 * b2;
        p1[0] = b1;
        p1[1] = a1 * b1 + b2;
        for n in 2..M {
            h0[n] = a1 * h0[n - 1] + a2 * h0[n - 2];
            p2[n] = a1 * p2[n - 1] + a2 * p2[n - 2];
            p1[n] = a1 * p1[n - 1] + a2 * p1[n - 2];
        }
        h0[M] = a1 * h0[M - 1] + a2 * h0[M - 2];

        let h2l: Vec<V::Scalar> = h0[..M].iter().map(|&h| a2 * h).collect();
        let h1l: Vec<V::Scalar> = h0[1..=M].to_vec();

        // Companion powers: start from the M-sample advance matrix read off
        // the impulse tails, then square up by repeated multiplication.
        let clen = M * M / 2;
        let mut c22 = vec![V::Scalar::zero(); clen];
        let mut c12 = vec![V::Scalar::zero(); clen];
        let mut c21 = vec![V::Scalar::zero(); clen];
        let mut c11 = vec![V::Scalar::zero(); clen];
        c22[0] = h2l[M - 2];
        c12[0] = h1l[M - 2];
        c21[0] = h2l[M - 1];
        c11[0] = h1l[M - 1];
        for n in 1..clen {
            c22[n] = h2l[M - 2] * c22[n - 1] + h1l[M - 2] * c21[n - 1];
            c12[n] = h2l[M - 2] * c12[n - 1] + h1l[M - 2] * c11[n - 1];
            c21[n] = h2l[M - 1] * c22[n - 1] + h1l[M - 1] * c21[n - 1];
            c11[n] = h2l[M - 1] * c12[n - 1] + h1l[M - 1] * c11[n - 1];
        }

        let chunk = CompanionVectors {
            c22: V::from_slice(&c22[..M]),
            c12: V::from_slice(&c12[..M]),
            c21: V::from_slice(&c21[..M]),
            c11: V::from_slice(&c11[..M]),
        };

        let passes = M.trailing_zeros();
        let intra = (0..passes)
            .map(|k| pass_vectors::<V>(&c22, &c12, &c21, &c11, k, 1))
            .collect();
        let inter = (0..passes)
            .map(|k| pass_vectors::<V>(&c22, &c12, &c21, &c11, k, M))
            .collect();
        let inter_seed = seed_vectors::<V>(&c22, &c12, &c21, &c11, M);

        let half_passes = (M / 2).trailing_zeros();
        let half = (0..half_passes)
            .map(|k| pass_vectors::<H>(&c22, &c12, &c21, &c11, k, M))
            .collect();
        let half_seed = seed_vectors::<H>(&c22, &c12, &c21, &c11, M);

        Self {
            biquad,
            h2: V::from_slice(&h2l),
            h1: V::from_slice(&h1l),
            p2: V::from_slice(&p2),
            p1: V::from_slice(&p1),
            c22,
            c12,
            c21,
            c11,
            chunk,
            intra,
            inter_seed,
            inter,
            half_seed,
            half,
        }
    }
}

/// Builds the coefficient vectors matching `LaneVector::rd_gather` pass `k`:
/// where the gather reads lane `s` into lane `j`, the coefficient lane holds
/// the power advancing by `(j - s) * stride` samples worth of M-chunks.
fn pass_vectors<W: LaneVector>(
    c22: &[W::Scalar],
    c12: &[W::Scalar],
    c21: &[W::Scalar],
    c11: &[W::Scalar],
    k: u32,
    stride: usize,
) -> CompanionVectors<W> {
    let mut l22 = W::zero().to_lanes();
    let mut l12 = W::zero().to_lanes();
    let mut l21 = W::zero().to_lanes();
    let mut l11 = W::zero().to_lanes();
    let half = 1usize << k;
    for j in 0..W::LANES {
        if j & half != 0 {
            let src = (j >> (k + 1) << (k + 1)) + half - 1;
            let n = (j - src) * stride - 1;
            l22[j] = c22[n];
            l12[j] = c12[n];
            l21[j] = c21[n];
            l11[j] = c11[n];
        }
    }
    CompanionVectors {
        c22: W::from_lanes(l22),
        c12: W::from_lanes(l12),
        c21: W::from_lanes(l21),
        c11: W::from_lanes(l11),
    }
}

/// The seed correction: the previous group's tail enters lane 0 only,
/// advanced by one full stride.
fn seed_vectors<W: LaneVector>(
    c22: &[W::Scalar],
    c12: &[W::Scalar],
    c21: &[W::Scalar],
    c11: &[W::Scalar],
    stride: usize,
) -> CompanionVectors<W> {
    let mut l22 = W::zero().to_lanes();
    let mut l12 = W::zero().to_lanes();
    let mut l21 = W::zero().to_lanes();
    let mut l11 = W::zero().to_lanes();
    l22[0] = c22[stride - 1];
    l12[0] = c12[stride - 1];
    l21[0] = c21[stride - 1];
    l11[0] = c11[stride - 1];
    CompanionVectors {
        c22: W::from_lanes(l22),
        c12: W::from_lanes(l12),
        c21: W::from_lanes(l21),
        c11: W::from_lanes(l11),
    }
}
