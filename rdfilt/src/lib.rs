//! Cascaded second-order IIR filtering with block-parallel recursive doubling
//!
//! A biquad's output feeds back on itself, which normally forces one sample
//! at a time. This crate breaks that dependence: the stream is cut into
//! M×M blocks, each block is filtered as if its y-history were zero (a
//! stateless, lane-parallel computation), and the missing history is then
//! folded back in by composing powers of the recursion's companion matrix —
//! pairwise within a block and pairwise across blocks, both at logarithmic
//! depth. The stateless kernels run concurrently on a dataflow graph; only
//! the thin history bookkeeping between them is serial.
//!
//! The public surface is [`SosFilter32`] and [`SosFilter64`]: build one
//! from a coefficient and an initial-condition table, then feed it slices
//! of any length. Results match the plain per-sample recursion to within
//! floating-point reassociation, for any split of the stream across calls.

mod block;
mod coeff;
mod error;
mod filter;
mod history;
mod kernel;
mod pipeline;
mod series;
mod simd;

pub use error::{Error, Result};
pub use filter::{SosFilter, SosFilter32, SosFilter64};
pub use simd::{LaneVector, Scalar};
