//! Lemke pivoting with lexicographic tie-breaking.
//!
//! Identical pivot structure to [`super::lemke`], but minimum-ratio ties are
//! resolved by comparing the rows' full ratio vectors against the inverse
//! basis (the evolving identity block of the tableau) lexicographically.
//! Since those rows are linearly independent, the lexicographic order is
//! strict, which rules out the cycling that plain Lemke can fall into on
//! degenerate problems. Slower per pivot, but robust.

use crate::lcp::Lcp;

use super::{Tableau, PIVOT_CAP_FACTOR, PIVOT_TOL};

/// Solve `lcp` by Lemke pivoting with the lexicographic ratio test.
///
/// Same contract as [`super::lemke`]: writes `lcp.z` and returns `true` on
/// success; fails on ray termination or pivot-cap overrun; never touches
/// `lcp.a` or `lcp.q`.
#[must_use]
pub fn lexico_lemke(lcp: &mut Lcp) -> bool {
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
        let Some(row) = lexico_min_ratio_row(&tableau, drive) else {
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

/// Lexicographic minimum-ratio test.
///
/// Candidates first minimise `rhs / pivot`; remaining ties are refined
/// column-by-column over the inverse-basis block until a single row
/// survives. A candidate row holding z₀ wins outright, since driving z₀
/// out terminates the algorithm.
fn lexico_min_ratio_row(tableau: &Tableau, drive: usize) -> Option<usize> {
    const RATIO_TOL: f64 = 1e-10;

    let mut candidates: Vec<usize> = (0..tableau.dim())
        .filter(|&row| tableau.coeff(row, drive) > PIVOT_TOL)
        .collect();
    if candidates.is_empty() {
        return None;
    }

    retain_minimal(&mut candidates, RATIO_TOL, |row| {
        tableau.rhs(row) / tableau.coeff(row, drive)
    });

    if let Some(&row) = candidates
        .iter()
        .find(|&&row| tableau.basis_var(row) == tableau.z0())
    {
        return Some(row);
    }

    for col in 0..tableau.dim() {
        if candidates.len() == 1 {
            break;
        }
        retain_minimal(&mut candidates, RATIO_TOL, |row| {
            tableau.coeff(row, col) / tableau.coeff(row, drive)
        });
    }

    candidates.first().copied()
}

/// Keep only the candidates whose key is within `tol` of the minimum.
fn retain_minimal(candidates: &mut Vec<usize>, tol: f64, key: impl Fn(usize) -> f64) {
    let mut min = f64::INFINITY;
    for &row in candidates.iter() {
        let k = key(row);
        if k < min {
            min = k;
        }
    }
    candidates.retain(|&row| key(row) <= min + tol);
}
