//! Shared scalar reference for the integration tests

use num_traits::Float;

/// The straightforward per-sample biquad cascade, carrying history across
/// samples. Everything the engine produces is judged against this.
pub struct ScalarRef<T> {
    sections: Vec<Section<T>>,
}

struct Section<T> {
    b1: T,
    b2: T,
    a1: T,
    a2: T,
    x1: T,
    x2: T,
    y1: T,
    y2: T,
}

impl<T: Float> ScalarRef<T> {
    /// Same table layout as the filter: (b0, b1, b2, a1, a2) and
    /// (x(-1), x(-2), y(-1), y(-2)).
    pub fn new(coeffs: &[[T; 5]], inits: &[[T; 4]]) -> Self {
        assert_eq!(coeffs.len(), inits.len());
        let sections = coeffs
            .iter()
            .zip(inits)
            .map(|(c, i)| Section {
                b1: c[1],
                b2: c[2],
                a1: c[3],
                a2: c[4],
                x1: i[0],
                x2: i[1],
                y1: i[2],
                y2: i[3],
            })
            .collect();
        Self { sections }
    }

    pub fn step(&mut self, x: T) -> T {
        let mut acc = x;
        for s in &mut self.sections {
            let y = acc + s.b1 * s.x1 + s.b2 * s.x2 + s.a1 * s.y1 + s.a2 * s.y2;
            s.x2 = s.x1;
            s.x1 = acc;
            s.y2 = s.y1;
            s.y1 = y;
            acc = y;
        }
        acc
    }

    pub fn run(&mut self, input: &[T]) -> Vec<T> {
        input.iter().map(|&x| self.step(x)).collect()
    }
}

/// Checks `actual` against `expected` with a relative tolerance scaled the
/// way floating-point reassociation error grows: `tol` per unit magnitude,
/// with an absolute floor of `tol` around zero.
pub fn assert_close<T: Float + std::fmt::Display>(actual: &[T], expected: &[T], tol: T) {
    assert_eq!(actual.len(), expected.len());
    for (n, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        let scale = T::one() + a.abs().max(e.abs());
        assert!(
            (a - e).abs() <= tol * scale,
            "sample {}: {} vs {} (tol {})",
            n,
            a,
            e,
            tol
        );
    }
}

/// Tolerance for a stream of this length: reassociation error grows
/// linearly with the number of samples folded together.
pub fn stream_tol_f32(len: usize) -> f32 {
    16.0 * f32::EPSILON * len as f32
}
