//! Lane-wise arithmetic abstraction
//!
//! The kernels only need a handful of operations from a SIMD vector: splat,
//! lane extraction, fused multiply-add, a "shift lanes right and insert a
//! scalar at lane 0" blend, and the gather used by the recursive-doubling
//! passes. Everything is expressed through constant-index lane rebuilds on
//! top of `wide`, which LLVM turns into single shuffle instructions for the
//! widths used here.

// TODO: move this trait onto `std::simd` once portable SIMD stabilises
use wide::{f32x4, f32x8, f64x2, f64x4};

use core::fmt::Debug;
use core::ops::{Add, Index, IndexMut, Mul, Sub};

use num_traits::{Float, Zero};

/// Scalar sample type: `f32` or `f64`.
pub trait Scalar: Float + Default + Debug + Send + Sync + 'static {}

impl Scalar for f32 {}
impl Scalar for f64 {}

/// A fixed-width vector of scalar lanes.
pub trait LaneVector:
    Copy
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
{
    type Scalar: Scalar;

    /// Plain array with one element per lane.
    type Lanes: Copy
        + Index<usize, Output = Self::Scalar>
        + IndexMut<usize>
        + AsRef<[Self::Scalar]>
        + Send
        + Sync;

    const LANES: usize;

    fn splat(v: Self::Scalar) -> Self;
    fn from_lanes(lanes: Self::Lanes) -> Self;
    fn to_lanes(self) -> Self::Lanes;

    /// Fused `self * m + a`, lane-wise.
    fn mul_add(self, m: Self, a: Self) -> Self;

    fn zero() -> Self {
        Self::splat(Self::Scalar::zero())
    }

    fn lane(self, i: usize) -> Self::Scalar {
        self.to_lanes()[i]
    }

    /// Loads the first `LANES` elements of a slice.
    fn from_slice(s: &[Self::Scalar]) -> Self {
        debug_assert!(s.len() >= Self::LANES);
        let mut lanes = Self::zero().to_lanes();
        for j in 0..Self::LANES {
            lanes[j] = s[j];
        }
        Self::from_lanes(lanes)
    }

    /// Stores all lanes into the front of a slice.
    fn write_to(self, out: &mut [Self::Scalar]) {
        debug_assert!(out.len() >= Self::LANES);
        let lanes = self.to_lanes();
        for j in 0..Self::LANES {
            out[j] = lanes[j];
        }
    }

    /// Shifts every lane one position up and inserts `v` at lane 0.
    ///
    /// Lane `j` of the result is lane `j - 1` of the input; the top lane
    /// falls off. This is how a block reaches one or two samples into its
    /// own history.
    fn shift_in(self, v: Self::Scalar) -> Self {
        let src = self.to_lanes();
        let mut out = Self::zero().to_lanes();
        out[0] = v;
        for j in 1..Self::LANES {
            out[j] = src[j - 1];
        }
        Self::from_lanes(out)
    }

    /// The source gather of recursive-doubling pass `k` (0-based).
    ///
    /// Lane `j` of the result is lane `j - 2^k` rounded down to the last
    /// carry position of its group of `2^(k+1)` lanes, or zero for lanes in
    /// the lower half of their group. Concretely for 8 lanes the three
    /// passes read from lanes `[-,0,-,2,-,4,-,6]`, `[-,-,1,1,-,-,5,5]` and
    /// `[-,-,-,-,3,3,3,3]`, with `-` meaning a zeroed lane.
    fn rd_gather(self, k: u32) -> Self {
        let src = self.to_lanes();
        let mut out = Self::zero().to_lanes();
        let half = 1usize << k;
        for j in 0..Self::LANES {
            if j & half != 0 {
                out[j] = src[(j >> (k + 1) << (k + 1)) + half - 1];
            }
        }
        Self::from_lanes(out)
    }
}

macro_rules! impl_lane_vector {
    ($vec:ty, $scalar:ty, $lanes:expr) => {
        impl LaneVector for $vec {
            type Scalar = $scalar;
            type Lanes = [$scalar; $lanes];

            const LANES: usize = $lanes;

            #[inline]
            fn splat(v: $scalar) -> Self {
                <$vec>::splat(v)
            }

            #[inline]
            fn from_lanes(lanes: Self::Lanes) -> Self {
                <$vec>::from(lanes)
            }

            #[inline]
            fn to_lanes(self) -> Self::Lanes {
                self.to_array()
            }

            #[inline]
            fn mul_add(self, m: Self, a: Self) -> Self {
                <$vec>::mul_add(self, m, a)
            }
        }
    };
}

impl_lane_vector!(f32x8, f32, 8);
impl_lane_vector!(f32x4, f32, 4);
impl_lane_vector!(f64x4, f64, 4);
impl_lane_vector!(f64x2, f64, 2);
