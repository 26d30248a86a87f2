//! Cubic interpolating spline with not-a-knot end conditions.
//!
//! We solve for the second derivatives `M_i` at the knots. Interior rows are the
//! usual continuity equations:
//!
//! ```text
//! h_{i-1} M_{i-1} + 2 (h_{i-1} + h_i) M_i + h_i M_{i+1}
//!     = 6 [ (y_{i+1} - y_i) / h_i - (y_i - y_{i-1}) / h_{i-1} ]
//! ```
//!
//! The first and last rows force the third derivative to be continuous across
//! the second and second-to-last knots. With exactly four knots this yields the
//! single cubic through all four points.
//!
//! The system is at most a few dozen rows, so a dense LU from nalgebra is plenty.

use nalgebra::{DMatrix, DVector};

/// Minimum knot count for a not-a-knot cubic.
pub const MIN_KNOTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    m: Vec<f64>,
}

impl CubicSpline {
    /// Fit through `(xs[i], ys[i])`.
    ///
    /// Returns `None` if there are fewer than `MIN_KNOTS` knots, the inputs differ
    /// in length, `xs` is not strictly increasing, or the system is singular.
    pub fn not_a_knot(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len();
        if n < MIN_KNOTS || ys.len() != n {
            return None;
        }
        if !xs.iter().chain(ys.iter()).all(|v| v.is_finite()) {
            return None;
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

        let mut a = DMatrix::<f64>::zeros(n, n);
        let mut b = DVector::<f64>::zeros(n);

        a[(0, 0)] = h[1];
        a[(0, 1)] = -(h[0] + h[1]);
        a[(0, 2)] = h[0];

        for i in 1..n - 1 {
            a[(i, i - 1)] = h[i - 1];
            a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
            a[(i, i + 1)] = h[i];
            b[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
        }

        a[(n - 1, n - 3)] = h[n - 2];
        a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
        a[(n - 1, n - 1)] = h[n - 3];

        let m = a.lu().solve(&b)?;
        if !m.iter().all(|v| v.is_finite()) {
            return None;
        }

        Some(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            m: m.iter().copied().collect(),
        })
    }

    /// First and last knot.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate at `x`. Outside the knots the end pieces are extended.
    pub fn eval(&self, x: f64) -> f64 {
        let last_piece = self.xs.len() - 2;
        let i = self
            .xs
            .partition_point(|&k| k <= x)
            .saturating_sub(1)
            .min(last_piece);

        let h = self.xs[i + 1] - self.xs[i];
        let left = self.xs[i + 1] - x;
        let right = x - self.xs[i];
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);

        m0 * left.powi(3) / (6.0 * h)
            + m1 * right.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * left
            + (y1 / h - m1 * h / 6.0) * right
    }
}
