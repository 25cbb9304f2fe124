//! The public filter driver

use num_traits::{Float, One};
use tracing::trace;
use wide::{f32x4, f32x8, f64x2, f64x4};

use crate::coeff::{Biquad, SectionTables};
use crate::error::{Error, Result};
use crate::pipeline;
use crate::series::{SectionState, Series};
use crate::simd::LaneVector;

/// A cascade of second-order sections filtering a sample stream.
///
/// Construction takes an `(N, 5)` coefficient table in (b0, b1, b2, a1, a2)
/// order with b0 normalised to 1, and an `(N, 4)` initial-condition table
/// in (x(-1), x(-2), y(-1), y(-2)) order. The filter is stateful:
/// successive `process` calls continue the same stream, no matter how its
/// length splits across calls.
///
/// Each call takes the widest path the remaining input allows: whole
/// multiples of M² samples go through the multicore block pipeline, whole
/// vectors of M through the single-vector cascade, and the rest through the
/// plain scalar recursion. One canonical per-section state is threaded
/// through all three, so the paths splice without seams.
///
/// Use the [`SosFilter32`] and [`SosFilter64`] aliases; they pin the lane
/// widths `wide` provides for each sample type.
#[derive(Debug, Clone)]
pub struct SosFilter<V, H, const M: usize>
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    tables: Vec<SectionTables<V, H, M>>,
    series: Series<V::Scalar>,
}

/// Single-precision filter: 8 lanes, 64-sample blocks.
pub type SosFilter32 = SosFilter<f32x8, f32x4, 8>;

/// Double-precision filter: 4 lanes, 16-sample blocks.
pub type SosFilter64 = SosFilter<f64x4, f64x2, 4>;

impl<V, H, const M: usize> SosFilter<V, H, M>
where
    V: LaneVector,
    H: LaneVector<Scalar = V::Scalar>,
{
    pub fn new(coeffs: &[[V::Scalar; 5]], inits: &[[V::Scalar; 4]]) -> Result<Self> {
        if coeffs.is_empty() {
            return Err(Error::NoSections);
        }
        if coeffs.len() != inits.len() {
            return Err(Error::SectionCountMismatch {
                coeffs: coeffs.len(),
                inits: inits.len(),
            });
        }

        let mut tables = Vec::with_capacity(coeffs.len());
        let mut sections = Vec::with_capacity(coeffs.len());
        for (n, (row, init)) in coeffs.iter().zip(inits).enumerate() {
            if (row[0] - V::Scalar::one()).abs() > V::Scalar::epsilon() {
                return Err(Error::UnnormalizedSection(n));
            }
            let biquad = Biquad {
                b1: row[1],
                b2: row[2],
                a1: row[3],
                a2: row[4],
            };
            tables.push(SectionTables::new(biquad));
            sections.push((
                biquad,
                SectionState {
                    x1: init[0],
                    x2: init[1],
                    y1: init[2],
                    y2: init[3],
                },
            ));
        }

        Ok(Self {
            tables,
            series: Series::new(sections),
        })
    }

    /// Filters `input` into the front of `output`, returning the number of
    /// samples written (always `input.len()`).
    ///
    /// # Panics
    ///
    /// If `output` is shorter than `input`.
    pub fn process(&mut self, input: &[V::Scalar], output: &mut [V::Scalar]) -> usize {
        assert!(
            output.len() >= input.len(),
            "output buffer shorter than input"
        );

        let block_len = M * M;
        let mut pos = 0;

        // Whole blocks go multicore; the harvested history re-seeds the
        // serial state so the remaining paths continue the stream.
        if input.len() >= block_len {
            let d = input.len() / block_len * block_len;
            let post = pipeline::run(
                &self.tables,
                &self.series.states(),
                &input[..d],
                &mut output[..d],
            );
            self.series.refresh(&post);
            pos = d;
        }

        while input.len() - pos >= M {
            let x = V::from_slice(&input[pos..pos + M]);
            let y = self.series.step_vector::<V, M>(x);
            y.write_to(&mut output[pos..pos + M]);
            pos += M;
        }

        while pos < input.len() {
            output[pos] = self.series.step_scalar(input[pos]);
            pos += 1;
        }

        trace!(samples = input.len(), "stream advanced");
        input.len()
    }

    /// Discards the running history and re-seeds it, section by section,
    /// in the same (x(-1), x(-2), y(-1), y(-2)) order as construction.
    pub fn reset(&mut self, inits: &[[V::Scalar; 4]]) -> Result<()> {
        if inits.len() != self.series.len() {
            return Err(Error::SectionCountMismatch {
                coeffs: self.series.len(),
                inits: inits.len(),
            });
        }
        let states: Vec<_> = inits
            .iter()
            .map(|init| SectionState {
                x1: init[0],
                x2: init[1],
                y1: init[2],
                y2: init[3],
            })
            .collect();
        self.series.reseed(&states);
        Ok(())
    }

    /// Number of cascaded sections.
    pub fn sections(&self) -> usize {
        self.series.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const COEFFS: [f32; 5] = [1.0, 0.1, -0.5, 0.2, 0.3];
    const INITS: [f32; 4] = [2.0, 3.0, -0.5, 1.5];

    #[test]
    fn rejects_bad_tables() {
        assert_eq!(SosFilter32::new(&[], &[]).unwrap_err(), Error::NoSections);
        assert_eq!(
            SosFilter32::new(&[COEFFS], &[INITS, INITS]).unwrap_err(),
            Error::SectionCountMismatch {
                coeffs: 1,
                inits: 2
            }
        );
        assert_eq!(
            SosFilter32::new(&[[2.0, 0.1, -0.5, 0.2, 0.3]], &[INITS]).unwrap_err(),
            Error::UnnormalizedSection(0)
        );
    }

    #[test]
    fn scalar_tail_matches_the_direct_recursion() {
        let mut filter = SosFilter32::new(&[COEFFS], &[INITS]).unwrap();
        let input = [1.0f32, 2.0, 3.0];
        let mut output = [0.0f32; 3];
        assert_eq!(filter.process(&input, &mut output), 3);

        let (mut x1, mut x2, mut y1, mut y2) = (2.0f32, 3.0, -0.5, 1.5);
        for (n, &x) in input.iter().enumerate() {
            let y = x + 0.1 * x1 - 0.5 * x2 + 0.2 * y1 + 0.3 * y2;
            assert_relative_eq!(output[n], y, epsilon = 1e-6);
            x2 = x1;
            x1 = x;
            y2 = y1;
            y1 = y;
        }
    }

    #[test]
    fn reset_restarts_the_stream() {
        let mut filter = SosFilter32::new(&[COEFFS], &[INITS]).unwrap();
        let input: Vec<f32> = (0..100).map(|v| v as f32).collect();
        let mut first = vec![0.0f32; 100];
        let mut second = vec![0.0f32; 100];

        filter.process(&input, &mut first);
        filter.reset(&[INITS]).unwrap();
        filter.process(&input, &mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn double_precision_path_works() {
        let coeffs = [[1.0f64, 0.1, -0.5, 0.2, 0.3]];
        let inits = [[2.0f64, 3.0, -0.5, 1.5]];
        let mut filter = SosFilter64::new(&coeffs, &inits).unwrap();

        // 16-sample blocks for f64: 40 samples covers the multicore,
        // vector and scalar paths in one call.
        let input: Vec<f64> = (0..40).map(|v| (v as f64 * 0.1).sin()).collect();
        let mut output = vec![0.0f64; 40];
        filter.process(&input, &mut output);

        let (mut x1, mut x2, mut y1, mut y2) = (2.0f64, 3.0, -0.5, 1.5);
        for (n, &x) in input.iter().enumerate() {
            let y = x + 0.1 * x1 - 0.5 * x2 + 0.2 * y1 + 0.3 * y2;
            assert_relative_eq!(output[n], y, epsilon = 1e-9, max_relative = 1e-9);
            x2 = x1;
            x1 = x;
            y2 = y1;
            y1 = y;
        }
    }
}
