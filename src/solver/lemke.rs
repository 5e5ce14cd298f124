//! Classic Lemke complementary pivoting.

use crate::lcp::Lcp;

use super::{Tableau, PIVOT_CAP_FACTOR, PIVOT_TOL};

/// Solve `lcp` by Lemke's algorithm with a unit covering vector.
///
/// On success, writes the solution into `lcp.z` and returns `true`.
/// Fails on ray termination (no positive ratio for the driving variable)
/// or when the pivot count exceeds `10 · dim`. `lcp.a` and `lcp.q` are
/// never modified.
#[must_use]
pub fn lemke(lcp: &mut Lcp) -> bool {
    let mut tableau = Tableau::new(&lcp.a, &lcp.q);
    if tableau.feasible() {
        lcp.z.fill(0.0);
        return true;
    }

    let z0 = tableau.z0();
    let entry_row = tableau.most_negative_row();
    let leaving = tableau.pivot(entry_row, z0);
    let mut drive = tableau.complement(leaving);

    for _ in 0..PIVOT_CAP_FACTOR * tableau.dim() {
        let Some(row) = min_ratio_row(&tableau, drive) else {
            return false; // ray termination
        };
        let leaving = tableau.pivot(row, drive);
        if leaving == z0 {
            lcp.z = tableau.solution();
            return true;
        }
        drive = tableau.complement(leaving);
    }

    false
}

/// Minimum-ratio test. Ties prefer the row carrying z₀ (so the algorithm
/// can terminate), then the lowest row index.
fn min_ratio_row(tableau: &Tableau, drive: usize) -> Option<usize> {
    const RATIO_TOL: f64 = 1e-10;

    let mut best: Option<(usize, f64)> = None;
    for row in 0..tableau.dim() {
        let pivot = tableau.coeff(row, drive);
        if pivot <= PIVOT_TOL {
            continue;
        }
        let ratio = tableau.rhs(row) / pivot;
        match best {
            None => best = Some((row, ratio)),
            Some((best_row, best_ratio)) => {
                if ratio < best_ratio - RATIO_TOL {
                    best = Some((row, ratio));
                } else if (ratio - best_ratio).abs() <= RATIO_TOL
                    && tableau.basis_var(row) == tableau.z0()
                    && tableau.basis_var(best_row) != tableau.z0()
                {
                    best = Some((row, ratio));
                }
            }
        }
    }
    best.map(|(row, _)| row)
}
