//! Projected Gauss-Seidel refinement.
//!
//! Fills the cascade's iterative slot: a cheap sweep-based solver that
//! polishes a candidate from the pivoting methods (or starts cold) on the
//! pristine matrices. Each sweep updates one component at a time from its
//! residual and projects onto z ≥ 0; rows with a (near-)zero diagonal are
//! left to the complementary structure of the other rows.

use nalgebra::DVector;

use crate::lcp::Lcp;

/// Diagonal magnitude below which a row is skipped by the sweep.
const DIAG_MIN: f64 = 1e-14;

/// Iteratively refine `lcp.z` by projected Gauss-Seidel sweeps.
///
/// Starts from `warm_start` when given (length permitting), otherwise from
/// zero. Returns `true` once the complementarity error drops to `tol`
/// within `max_sweeps` sweeps; the last iterate is written to `lcp.z`
/// either way.
#[must_use]
pub fn projected_gauss_seidel(
    lcp: &mut Lcp,
    warm_start: Option<&DVector<f64>>,
    max_sweeps: usize,
    tol: f64,
) -> bool {
    let dim = lcp.dim();
    let mut z = match warm_start {
        Some(w) if w.len() == dim => w.clone(),
        _ => DVector::zeros(dim),
    };

    for _ in 0..max_sweeps {
        for i in 0..dim {
            let d = lcp.a[(i, i)];
            if d.abs() < DIAG_MIN {
                continue;
            }
            let mut residual = lcp.q[i];
            for j in 0..dim {
                if j != i {
                    residual += lcp.a[(i, j)] * z[j];
                }
            }
            z[i] = (-residual / d).max(0.0);
        }

        if lcp.error_for(&z) <= tol {
            lcp.z = z;
            return true;
        }
    }

    lcp.z = z;
    false
}
