//! Shared complementary-pivoting tableau.
//!
//! Both Lemke variants work on the augmented system
//!
//! ```text
//! [ I | −d | −A ] · [w; z₀; z] = q,    d = (1, …, 1)
//! ```
//!
//! kept in Gauss-Jordan form: the columns of the current basis are unit
//! vectors and `rhs` holds the basic solution. The `w` block starts as the
//! identity and therefore always holds the inverse of the current basis,
//! which is what the lexicographic ratio test compares against.
//!
//! Variable encoding: `w_i` is `i`, `z₀` is `n`, `z_j` is `n + 1 + j`.

use nalgebra::{DMatrix, DVector};

pub(crate) struct Tableau {
    n: usize,
    c: DMatrix<f64>,
    rhs: DVector<f64>,
    basis: Vec<usize>,
}

impl Tableau {
    pub(crate) fn new(a: &DMatrix<f64>, q: &DVector<f64>) -> Self {
        let n = q.len();
        let mut c = DMatrix::zeros(n, 2 * n + 1);
        for i in 0..n {
            c[(i, i)] = 1.0;
            c[(i, n)] = -1.0;
            for j in 0..n {
                c[(i, n + 1 + j)] = -a[(i, j)];
            }
        }
        Self {
            n,
            c,
            rhs: q.clone(),
            basis: (0..n).collect(),
        }
    }

    pub(crate) fn dim(&self) -> usize {
        self.n
    }

    /// Column index of the artificial variable z₀.
    pub(crate) fn z0(&self) -> usize {
        self.n
    }

    pub(crate) fn rhs(&self, row: usize) -> f64 {
        self.rhs[row]
    }

    pub(crate) fn coeff(&self, row: usize, col: usize) -> f64 {
        self.c[(row, col)]
    }

    pub(crate) fn basis_var(&self, row: usize) -> usize {
        self.basis[row]
    }

    /// The complementary variable driven in after `var` leaves the basis.
    pub(crate) fn complement(&self, var: usize) -> usize {
        debug_assert_ne!(var, self.n, "z0 has no complement");
        if var < self.n {
            var + self.n + 1
        } else {
            var - self.n - 1
        }
    }

    /// True when the initial basis is already feasible (q ≥ 0).
    pub(crate) fn feasible(&self) -> bool {
        self.rhs.iter().all(|&v| v >= 0.0)
    }

    /// Row holding the most negative basic value; entry row for z₀.
    pub(crate) fn most_negative_row(&self) -> usize {
        let mut row = 0;
        for i in 1..self.n {
            if self.rhs[i] < self.rhs[row] {
                row = i;
            }
        }
        row
    }

    /// Gauss-Jordan pivot on `(row, col)` and swap `col` into the basis.
    /// Returns the variable that left the basis.
    pub(crate) fn pivot(&mut self, row: usize, col: usize) -> usize {
        let p = self.c[(row, col)];
        let inv = 1.0 / p;
        for j in 0..self.c.ncols() {
            self.c[(row, j)] *= inv;
        }
        self.rhs[row] *= inv;

        for i in 0..self.n {
            if i == row {
                continue;
            }
            let f = self.c[(i, col)];
            if f == 0.0 {
                continue;
            }
            for j in 0..self.c.ncols() {
                self.c[(i, j)] -= f * self.c[(row, j)];
            }
            self.rhs[i] -= f * self.rhs[row];
        }

        let leaving = self.basis[row];
        self.basis[row] = col;
        leaving
    }

    /// Extract z from the current basis (non-basic components are zero).
    pub(crate) fn solution(&self) -> DVector<f64> {
        let mut z = DVector::zeros(self.n);
        for row in 0..self.n {
            let var = self.basis[row];
            if var > self.n {
                z[var - self.n - 1] = self.rhs[row];
            }
        }
        z
    }
}
