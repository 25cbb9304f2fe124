//! Single-core cascade paths
//!
//! The driver falls back to these whenever fewer than a whole block of
//! samples remains: a one-vector step that keeps the non-recursive part of
//! every section lane-parallel, and a plain scalar recursion for the final
//! few samples. Both advance the same per-section state the multicore
//! pipeline is seeded from, so a stream may hop between paths freely.

use crate::coeff::Biquad;
use crate::simd::{LaneVector, Scalar};

/// The four running history values of one section.
#[derive(Debug, Clone, Copy)]
pub struct SectionState<T> {
    pub x1: T,
    pub x2: T,
    pub y1: T,
    pub y2: T,
}

/// A cascade of second-order sections with their running state.
#[derive(Debug, Clone)]
pub struct Series<T> {
    sections: Vec<(Biquad<T>, SectionState<T>)>,
}

impl<T: Scalar> Series<T> {
    pub fn new(sections: Vec<(Biquad<T>, SectionState<T>)>) -> Self {
        Self { sections }
    }

    pub fn states(&self) -> Vec<SectionState<T>> {
        self.sections.iter().map(|(_, s)| *s).collect()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Replaces every section's state from a flat `post_inits` run:
    /// four values per section in (x(-2), x(-1), y(-2), y(-1)) order.
    pub fn refresh(&mut self, post_inits: &[T]) {
        debug_assert_eq!(post_inits.len(), 4 * self.sections.len());
        for ((_, state), chunk) in self.sections.iter_mut().zip(post_inits.chunks_exact(4)) {
            state.x2 = chunk[0];
            state.x1 = chunk[1];
            state.y2 = chunk[2];
            state.y1 = chunk[3];
        }
    }

    /// Re-seeds every section's state directly.
    pub fn reseed(&mut self, states: &[SectionState<T>]) {
        debug_assert_eq!(states.len(), self.sections.len());
        for ((_, state), new) in self.sections.iter_mut().zip(states) {
            *state = *new;
        }
    }

    /// Advances the cascade by one sample.
    pub fn step_scalar(&mut self, x: T) -> T {
        let mut acc = x;
        for (c, s) in &mut self.sections {
            let y = acc + c.b1 * s.x1 + c.b2 * s.x2 + c.a1 * s.y1 + c.a2 * s.y2;
            s.x2 = s.x1;
            s.x1 = acc;
            s.y2 = s.y1;
            s.y1 = y;
            acc = y;
        }
        acc
    }

    /// Advances the cascade by one vector of M consecutive samples.
    ///
    /// Per section, the feed-forward part is computed on all lanes at once
    /// with the carried x-history shifted into lanes 0 and 1; the feedback
    /// part is inherently serial in time, so it walks the lanes carrying
    /// the running y pair.
    pub fn step_vector<V, const M: usize>(&mut self, x: V) -> V
    where
        V: LaneVector<Scalar = T>,
    {
        let mut acc = x;
        for (c, s) in &mut self.sections {
            let x1v = acc.shift_in(s.x1);
            let x2v = x1v.shift_in(s.x2);
            let mut v = x1v.mul_add(V::splat(c.b1), acc);
            v = x2v.mul_add(V::splat(c.b2), v);

            let fir = v.to_lanes();
            let mut out = V::zero().to_lanes();
            let (mut y1, mut y2) = (s.y1, s.y2);
            for j in 0..M {
                let y = fir[j] + c.a1 * y1 + c.a2 * y2;
                y2 = y1;
                y1 = y;
                out[j] = y;
            }

            let inputs = acc.to_lanes();
            s.x2 = inputs[M - 2];
            s.x1 = inputs[M - 1];
            s.y2 = y2;
            s.y1 = y1;
            acc = V::from_lanes(out);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wide::f32x8;

    fn cascade(n: usize) -> Series<f32> {
        let biquad = Biquad {
            b1: 0.1,
            b2: -0.5,
            a1: 0.2,
            a2: 0.3,
        };
        let state = SectionState {
            x1: 2.0,
            x2: 3.0,
            y1: -0.5,
            y2: 1.5,
        };
        Series::new(vec![(biquad, state); n])
    }

    #[test]
    fn vector_step_equals_eight_scalar_steps() {
        let mut by_vector = cascade(2);
        let mut by_scalar = cascade(2);

        let samples: Vec<f32> = (0..24).map(|v| (v as f32 * 0.11).cos()).collect();
        for chunk in samples.chunks_exact(8) {
            let y = by_vector.step_vector::<f32x8, 8>(f32x8::from_slice(chunk));
            let ys = y.to_array();
            for (j, &x) in chunk.iter().enumerate() {
                let expected = by_scalar.step_scalar(x);
                assert_relative_eq!(ys[j], expected, epsilon = 1e-5, max_relative = 1e-5);
            }
        }

        // Both paths must agree on the carried state as well.
        for (a, b) in by_vector.states().iter().zip(by_scalar.states()) {
            assert_relative_eq!(a.x1, b.x1);
            assert_relative_eq!(a.x2, b.x2);
            assert_relative_eq!(a.y1, b.y1, epsilon = 1e-5);
            assert_relative_eq!(a.y2, b.y2, epsilon = 1e-5);
        }
    }

    #[test]
    fn refresh_reorders_post_inits_into_state() {
        let mut series = cascade(2);
        series.refresh(&[10.0, 11.0, 12.0, 13.0, 20.0, 21.0, 22.0, 23.0]);
        let states = series.states();
        assert_eq!(states[0].x2, 10.0);
        assert_eq!(states[0].x1, 11.0);
        assert_eq!(states[0].y2, 12.0);
        assert_eq!(states[0].y1, 13.0);
        assert_eq!(states[1].x1, 21.0);
        assert_eq!(states[1].y1, 23.0);
    }
}
