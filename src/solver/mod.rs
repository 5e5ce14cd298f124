//! Pure numerical LCP solvers.
//!
//! Two complementary-pivoting algorithms over a shared dense tableau, plus
//! an iterative projected Gauss-Seidel refinement. All three operate on the
//! problem's `(A, q)`, mutate only `z`, and report success as a `bool`;
//! physical acceptance of a numerically "successful" solution is the
//! driver's responsibility, as is screening NaNs.

mod lemke;
mod lexico_lemke;
mod pgs;
mod tableau;

pub use lemke::lemke;
pub use lexico_lemke::lexico_lemke;
pub use pgs::projected_gauss_seidel;

pub(crate) use tableau::Tableau;

/// Pivot budget per problem dimension: a pivot count above `10 · dim` is
/// treated as non-termination and the solve fails.
pub(crate) const PIVOT_CAP_FACTOR: usize = 10;

/// Entries below this magnitude are not eligible as pivots.
pub(crate) const PIVOT_TOL: f64 = 1e-12;
