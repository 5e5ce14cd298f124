//! Assembly of the frictional-contact LCP for one sub-problem.
//!
//! Given the contacts of a sub-problem and the current floe states, builds
//! the physical companion matrices — block-diagonal mass matrix M and its
//! inverse, normal Jacobian J (3n × m), tangent Jacobian D (3n × 2m, two
//! opposed columns per contact), pre-collision generalized velocity W — and
//! from them the LCP
//!
//! ```text
//!       | JᵀM⁻¹J   JᵀM⁻¹D   0 |        | (1+e)∘(JᵀW) |
//!   A = | DᵀM⁻¹J   DᵀM⁻¹D   E |,   q = |     DᵀW     |
//!       |   μ       −Eᵀ     0 |        |      0      |
//! ```
//!
//! where E sums the two tangent components per contact and μ is the
//! diagonal of friction coefficients. Construction is deterministic: floes
//! are enumerated in ascending vertex order, contacts in edge-then-list
//! order, both fixed by the sub-problem.

use nalgebra::{DMatrix, DVector};

use crate::error::CollisionError;
use crate::floe::Floe;
use crate::graph::{ContactGraph, SubProblem};
use crate::lcp::Lcp;

/// Tolerance on `‖normal‖ − 1` before a contact normal is rejected.
const NORMAL_UNIT_TOL: f64 = 1e-6;

/// 2-D cross product (z-component of the 3-D cross).
fn cross2(r: nalgebra::Vector2<f64>, v: nalgebra::Vector2<f64>) -> f64 {
    r.x * v.y - r.y * v.x
}

/// The LCP of one sub-problem together with its physical companions.
#[derive(Debug, Clone)]
pub(crate) struct GraphLcp {
    /// Number of floes in the sub-problem.
    pub n: usize,
    /// Number of contacts.
    pub m: usize,
    /// Block-diagonal mass matrix, 3n × 3n.
    pub mass: DMatrix<f64>,
    /// Its inverse.
    pub inv_mass: DMatrix<f64>,
    /// Normal Jacobian, 3n × m.
    pub j: DMatrix<f64>,
    /// Tangent Jacobian, 3n × 2m.
    pub d: DMatrix<f64>,
    /// Pre-collision generalized velocity, 3n.
    pub w: DVector<f64>,
    /// Per-contact local endpoint indices.
    pub pairs: Vec<(usize, usize)>,
    /// Per-contact signed gaps.
    pub gaps: Vec<f64>,
    /// Per-contact restitution coefficients.
    pub restitution: Vec<f64>,
    /// Per-contact friction coefficients.
    pub friction: Vec<f64>,
}

impl GraphLcp {
    /// Build the matrices for `problem`, reading floe state through
    /// `floe_at` (the scheduler passes its per-component snapshot).
    pub(crate) fn build(
        graph: &ContactGraph,
        problem: &SubProblem,
        floe_at: &dyn Fn(usize) -> Floe,
    ) -> Result<Self, CollisionError> {
        let vertices = problem.vertices();
        let n = vertices.len();
        let m = problem.num_contacts();

        let floes: Vec<Floe> = vertices.iter().map(|&v| floe_at(v)).collect();
        for (local, floe) in floes.iter().enumerate() {
            if !floe.has_valid_mass() {
                return Err(CollisionError::InvalidMassProperties {
                    index: vertices[local],
                    mass: floe.mass,
                    inertia: floe.inertia,
                });
            }
        }

        let mut mass = DMatrix::zeros(3 * n, 3 * n);
        let mut inv_mass = DMatrix::zeros(3 * n, 3 * n);
        let mut w = DVector::zeros(3 * n);
        for (v, floe) in floes.iter().enumerate() {
            mass[(3 * v, 3 * v)] = floe.mass;
            mass[(3 * v + 1, 3 * v + 1)] = floe.mass;
            mass[(3 * v + 2, 3 * v + 2)] = floe.inertia;
            inv_mass[(3 * v, 3 * v)] = 1.0 / floe.mass;
            inv_mass[(3 * v + 1, 3 * v + 1)] = 1.0 / floe.mass;
            inv_mass[(3 * v + 2, 3 * v + 2)] = 1.0 / floe.inertia;
            w[3 * v] = floe.velocity.x;
            w[3 * v + 1] = floe.velocity.y;
            w[3 * v + 2] = floe.angular_velocity;
        }

        let mut j = DMatrix::zeros(3 * n, m);
        let mut d = DMatrix::zeros(3 * n, 2 * m);
        let mut pairs = Vec::with_capacity(m);
        let mut gaps = Vec::with_capacity(m);
        let mut restitution = Vec::with_capacity(m);
        let mut friction = Vec::with_capacity(m);

        for (c, &slot) in problem.contacts().iter().enumerate() {
            let (ga, gb) = graph.edge_endpoints(slot.0);
            let la = local_index(vertices, ga)?;
            let lb = local_index(vertices, gb)?;

            let contact = graph.contact(slot);
            let norm = contact.normal.norm();
            if (norm - 1.0).abs() > NORMAL_UNIT_TOL {
                return Err(CollisionError::DegenerateNormal { norm });
            }

            let normal = contact.normal;
            let tangent = contact.tangent();
            let ra = contact.point - floes[la].position;
            let rb = contact.point - floes[lb].position;

            j[(3 * la, c)] = -normal.x;
            j[(3 * la + 1, c)] = -normal.y;
            j[(3 * la + 2, c)] = -cross2(ra, normal);
            j[(3 * lb, c)] = normal.x;
            j[(3 * lb + 1, c)] = normal.y;
            j[(3 * lb + 2, c)] = cross2(rb, normal);

            d[(3 * la, 2 * c)] = -tangent.x;
            d[(3 * la + 1, 2 * c)] = -tangent.y;
            d[(3 * la + 2, 2 * c)] = -cross2(ra, tangent);
            d[(3 * lb, 2 * c)] = tangent.x;
            d[(3 * lb + 1, 2 * c)] = tangent.y;
            d[(3 * lb + 2, 2 * c)] = cross2(rb, tangent);
            for row in 0..3 * n {
                d[(row, 2 * c + 1)] = -d[(row, 2 * c)];
            }

            pairs.push((la, lb));
            gaps.push(contact.gap);
            restitution.push(contact.restitution);
            friction.push(contact.friction);
        }

        Ok(Self {
            n,
            m,
            mass,
            inv_mass,
            j,
            d,
            w,
            pairs,
            gaps,
            restitution,
            friction,
        })
    }

    /// Assemble the LCP matrices from the physical companions.
    ///
    /// The problem dimension is 4m: z stacks the m normal impulses, the 2m
    /// tangent impulses and the m friction-cone multipliers.
    pub(crate) fn lcp(&self) -> Lcp {
        let m = self.m;
        let dim = 4 * m;
        let jt = self.j.transpose();
        let dt = self.d.transpose();
        let jt_minv = &jt * &self.inv_mass;
        let dt_minv = &dt * &self.inv_mass;

        let mut a = DMatrix::zeros(dim, dim);
        a.view_mut((0, 0), (m, m)).copy_from(&(&jt_minv * &self.j));
        a.view_mut((0, m), (m, 2 * m))
            .copy_from(&(&jt_minv * &self.d));
        a.view_mut((m, 0), (2 * m, m))
            .copy_from(&(&dt_minv * &self.j));
        a.view_mut((m, m), (2 * m, 2 * m))
            .copy_from(&(&dt_minv * &self.d));
        for c in 0..m {
            a[(m + 2 * c, 3 * m + c)] = 1.0; // E
            a[(m + 2 * c + 1, 3 * m + c)] = 1.0;
            a[(3 * m + c, c)] = self.friction[c]; // μ
            a[(3 * m + c, m + 2 * c)] = -1.0; // −Eᵀ
            a[(3 * m + c, m + 2 * c + 1)] = -1.0;
        }

        let jt_w = &jt * &self.w;
        let dt_w = &dt * &self.w;
        let mut q = DVector::zeros(dim);
        for c in 0..m {
            q[c] = (1.0 + self.restitution[c]) * jt_w[c];
        }
        for k in 0..2 * m {
            q[m + k] = dt_w[k];
        }

        Lcp {
            a,
            q,
            z: DVector::zeros(dim),
        }
    }

    /// Post-collision generalized velocity for a solution z:
    /// `W + M⁻¹ (J z_N + D z_T)`.
    pub(crate) fn solution(&self, z: &DVector<f64>) -> DVector<f64> {
        let z_n = z.rows(0, self.m);
        let z_t = z.rows(self.m, 2 * self.m);
        &self.w + &self.inv_mass * (&self.j * z_n + &self.d * z_t)
    }

    /// Post-collision contact-normal velocities `Jᵀ · sol`.
    pub(crate) fn normal_velocities(&self, sol: &DVector<f64>) -> DVector<f64> {
        self.j.transpose() * sol
    }

    /// Kinetic-energy ratio `(SᵀMS) / (WᵀMW)` of a candidate update.
    pub(crate) fn energy_ratio(&self, sol: &DVector<f64>) -> f64 {
        let before = (&self.mass * &self.w).dot(&self.w);
        let after = (&self.mass * sol).dot(sol);
        if before == 0.0 {
            if after == 0.0 {
                1.0
            } else {
                f64::INFINITY
            }
        } else {
            after / before
        }
    }

    /// Per-floe summed normal impulse for a solution z.
    pub(crate) fn impulses(&self, z: &DVector<f64>) -> DVector<f64> {
        let mut impulses = DVector::zeros(self.n);
        for (c, &(la, lb)) in self.pairs.iter().enumerate() {
            impulses[la] += z[c];
            impulses[lb] += z[c];
        }
        impulses
    }
}

fn local_index(vertices: &[usize], global: usize) -> Result<usize, CollisionError> {
    vertices
        .binary_search(&global)
        .map_err(|_| CollisionError::UnknownFloe {
            index: global,
            num_floes: vertices.len(),
        })
}
