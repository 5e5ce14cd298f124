//! The Linear Complementarity Problem record.
//!
//! Find z ≥ 0 such that w = Az + q ≥ 0 and zᵀw = 0. This type only holds
//! the problem and a candidate solution; the pivoting algorithms live in
//! [`crate::solver`] and the physical acceptance logic in the driver.

use nalgebra::{DMatrix, DVector};

use crate::error::CollisionError;

/// A dense LCP `(A, q)` with a mutable candidate solution `z`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lcp {
    /// Problem matrix, `dim × dim`.
    pub a: DMatrix<f64>,
    /// Right-hand side, length `dim`.
    pub q: DVector<f64>,
    /// Candidate solution, length `dim`. Zero until a solver writes it.
    pub z: DVector<f64>,
}

impl Lcp {
    /// Create an LCP with a zero candidate solution.
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError::DimensionMismatch`] if `a` is not square
    /// with side `q.len()`.
    pub fn new(a: DMatrix<f64>, q: DVector<f64>) -> Result<Self, CollisionError> {
        if a.nrows() != a.ncols() || a.nrows() != q.len() {
            return Err(CollisionError::DimensionMismatch {
                context: "LCP matrix",
                expected: q.len(),
                actual: if a.nrows() == a.ncols() {
                    a.nrows()
                } else {
                    a.ncols()
                },
            });
        }
        let dim = q.len();
        Ok(Self {
            a,
            q,
            z: DVector::zeros(dim),
        })
    }

    /// Problem dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.q.len()
    }

    /// Slack w = Az + q for the current candidate.
    #[must_use]
    pub fn slack(&self) -> DVector<f64> {
        &self.a * &self.z + &self.q
    }

    /// Complementarity residual of the current candidate:
    /// ‖min(z, Az + q)‖₂, zero at an exact solution.
    #[must_use]
    pub fn complementarity_error(&self) -> f64 {
        self.error_for(&self.z)
    }

    /// Complementarity residual of an arbitrary candidate against this
    /// problem's matrices.
    #[must_use]
    pub fn error_for(&self, z: &DVector<f64>) -> f64 {
        let w = &self.a * z + &self.q;
        let mut sum = 0.0;
        for i in 0..self.dim() {
            let m = z[i].min(w[i]);
            sum += m * m;
        }
        sum.sqrt()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{dmatrix, dvector};

    #[test]
    fn test_rejects_non_square() {
        let a = DMatrix::zeros(2, 3);
        let q = DVector::zeros(2);
        assert!(Lcp::new(a, q).is_err());
    }

    #[test]
    fn test_error_zero_at_solution() {
        // w = z + q with q >= 0: z = 0 solves.
        let lcp = Lcp::new(dmatrix![1.0, 0.0; 0.0, 1.0], dvector![1.0, 2.0]).unwrap();
        assert_relative_eq!(lcp.complementarity_error(), 0.0);
    }

    #[test]
    fn test_error_measures_violation() {
        let mut lcp = Lcp::new(dmatrix![2.0], dvector![-2.0]).unwrap();
        // z = 0: w = -2, min(z, w) = -2.
        assert_relative_eq!(lcp.complementarity_error(), 2.0);
        // z = 1: w = 0, solved.
        lcp.z = dvector![1.0];
        assert_relative_eq!(lcp.complementarity_error(), 0.0);
        // z = 2: w = 2, min = 2.
        lcp.z = dvector![2.0];
        assert_relative_eq!(lcp.complementarity_error(), 2.0);
    }
}
