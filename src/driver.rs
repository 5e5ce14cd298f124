//! The solver driver: strategy cascade and physical acceptance.
//!
//! A numerically "successful" pivot solve is not necessarily a physically
//! acceptable collision response. The driver runs a fixed cascade of
//! (strategy, acceptance-tier) attempts, keeps the candidate with the
//! smallest complementarity error seen so far, and accepts the first best
//! candidate that passes the tier's acceptance test:
//!
//! - the kinetic-energy ratio must not exceed the tier's bound,
//! - the complementarity error must be within the tier's tolerance
//!   (tiers 1-2 only),
//! - every contact still approaching after the update must keep its
//!   per-step closure under the gap/50 margin.
//!
//! Numerical failures (ray termination, pivot caps, NaNs) are silently
//! skipped; if the whole cascade is exhausted the driver hands back the
//! pre-collision velocities with `success = false` and lets the scheduler
//! retry or give up.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::Rng;

use crate::builder::GraphLcp;
use crate::config::CollisionConfig;
use crate::error::CollisionError;
use crate::floe::Floe;
use crate::graph::{ContactGraph, SubProblem};
use crate::solver::{lemke, lexico_lemke, projected_gauss_seidel};
use crate::stats::{AttemptOutcome, AttemptSink, PhaseFailures};

/// Amplitude of the random perturbation applied to nonzero matrix entries.
const PERTURB_AMPLITUDE: f64 = 1e-10;

/// Energy-ratio slack for acceptance tiers 1 and 2.
const TIER12_ENERGY_SLACK: f64 = 1e-4;
/// Energy-ratio slack for acceptance tier 3.
const TIER3_ENERGY_SLACK: f64 = 1e-2;
/// Complementarity-error bound for tier 1.
const TIER1_ERROR: f64 = 1e-11;
/// Complementarity-error bound for tier 2.
const TIER2_ERROR: f64 = 1e-8;

/// A contact is rejected when it would close more than `gap / 50` in one
/// default time step.
const GAP_MARGIN_DIVISOR: f64 = 50.0;

/// Sweep budget and target for the iterative refinement slot.
const REFINE_SWEEPS: usize = 100;
const REFINE_TOL: f64 = 1e-11;

/// One strategy of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Classic Lemke pivoting.
    Lemke,
    /// Lexicographic Lemke pivoting.
    LexicoLemke,
    /// Projected Gauss-Seidel refinement, warm-started on the best z.
    IterativeRefine,
    /// Randomly perturb the working matrix; never produces a solution.
    Perturb,
}

/// The fixed cascade: three tier-1 solver passes separated by perturbation
/// steps, then two tier-2 passes, then a last-resort tier-3 pass.
const CASCADE: [(Strategy, u8); 23] = [
    (Strategy::Lemke, 1),
    (Strategy::LexicoLemke, 1),
    (Strategy::IterativeRefine, 1),
    (Strategy::Perturb, 1),
    (Strategy::Lemke, 1),
    (Strategy::LexicoLemke, 1),
    (Strategy::IterativeRefine, 1),
    (Strategy::Perturb, 1),
    (Strategy::Lemke, 1),
    (Strategy::LexicoLemke, 1),
    (Strategy::IterativeRefine, 1),
    (Strategy::Perturb, 2),
    (Strategy::Lemke, 2),
    (Strategy::LexicoLemke, 2),
    (Strategy::IterativeRefine, 2),
    (Strategy::Perturb, 2),
    (Strategy::Lemke, 2),
    (Strategy::LexicoLemke, 2),
    (Strategy::IterativeRefine, 2),
    (Strategy::Perturb, 3),
    (Strategy::Lemke, 3),
    (Strategy::LexicoLemke, 3),
    (Strategy::IterativeRefine, 3),
];

/// Result of resolving one sub-problem.
#[derive(Debug, Clone)]
pub struct ProblemSolution {
    /// Whether a candidate passed acceptance. When false, `velocities`
    /// holds the pre-collision state and `impulses` is zero.
    pub success: bool,
    /// Post-collision generalized velocities, three entries
    /// (vx, vy, ω) per sub-problem vertex, in vertex order.
    pub velocities: DVector<f64>,
    /// Summed normal impulse per sub-problem vertex.
    pub impulses: DVector<f64>,
}

/// Cascade driver for individual sub-problems.
#[derive(Debug, Clone)]
pub struct LcpSolver {
    time_step: f64,
}

impl LcpSolver {
    /// Create a driver using the configuration's default time step.
    #[must_use]
    pub fn new(config: &CollisionConfig) -> Self {
        Self {
            time_step: config.time_step,
        }
    }

    /// Resolve one sub-problem against the graph's own floe states.
    ///
    /// # Errors
    ///
    /// Returns a [`CollisionError`] for structural problems (invalid mass
    /// properties, degenerate normals, unknown floe indices). Numerical
    /// failure is not an error: it yields `success = false`.
    pub fn solve_problem(
        &self,
        graph: &ContactGraph,
        problem: &SubProblem,
        rng: &mut StdRng,
    ) -> Result<ProblemSolution, CollisionError> {
        let lookup = |v: usize| graph.floes()[v];
        let mut failures = PhaseFailures::default();
        self.solve_with(graph, problem, &lookup, rng, &mut failures, None)
    }

    /// Full-control entry point used by the scheduler: floe states come
    /// from `floe_at` (per-component snapshots), failure counters and the
    /// attempt sink are threaded through.
    pub(crate) fn solve_with(
        &self,
        graph: &ContactGraph,
        problem: &SubProblem,
        floe_at: &dyn Fn(usize) -> Floe,
        rng: &mut StdRng,
        failures: &mut PhaseFailures,
        sink: Option<&dyn AttemptSink>,
    ) -> Result<ProblemSolution, CollisionError> {
        let glcp = GraphLcp::build(graph, problem, floe_at)?;
        let pristine = glcp.lcp();
        let mut working = pristine.clone();

        let mut best_z: Option<DVector<f64>> = None;
        let mut best_err = f64::MAX;

        for &(strategy, tier) in &CASCADE {
            let solved = match strategy {
                Strategy::Perturb => {
                    perturb(&mut working.a, rng);
                    record(sink, &working, AttemptOutcome::Perturbed);
                    continue;
                }
                Strategy::Lemke => lemke(&mut working),
                Strategy::LexicoLemke => lexico_lemke(&mut working),
                Strategy::IterativeRefine => {
                    let mut refine = pristine.clone();
                    let ok = projected_gauss_seidel(
                        &mut refine,
                        best_z.as_ref(),
                        REFINE_SWEEPS,
                        REFINE_TOL,
                    );
                    working.z = refine.z;
                    ok
                }
            };

            if !solved || working.z.iter().any(|v| v.is_nan()) {
                record(sink, &working, AttemptOutcome::Failed);
                continue;
            }

            // Candidates are always judged against the pristine matrices,
            // and acceptance always re-tests the best candidate so far.
            let err = pristine.error_for(&working.z);
            if err < best_err {
                best_err = err;
                best_z = Some(working.z.clone());
            }
            let Some(z_best) = best_z.as_ref() else {
                record(sink, &working, AttemptOutcome::Failed);
                continue;
            };

            let sol = glcp.solution(z_best);
            if sol.iter().any(|v| v.is_nan()) {
                record(sink, &working, AttemptOutcome::Failed);
                continue;
            }

            let energy_ratio = glcp.energy_ratio(&sol);
            let u = glcp.normal_velocities(&sol);
            let v_ok = self.normal_velocities_ok(&u, &glcp.gaps);

            if accept(tier, energy_ratio, best_err, v_ok) {
                working.z.copy_from(z_best);
                record(sink, &working, AttemptOutcome::Accepted);
                let impulses = glcp.impulses(z_best);
                return Ok(ProblemSolution {
                    success: true,
                    velocities: sol,
                    impulses,
                });
            }
            record(sink, &working, AttemptOutcome::Rejected);
        }

        failures.compression += 1;
        Ok(ProblemSolution {
            success: false,
            velocities: glcp.w.clone(),
            impulses: DVector::zeros(glcp.n),
        })
    }

    /// Post-collision normal-velocity screen: for every contact still
    /// approaching after the update, the signed closure over one default
    /// time step is compared against the gap/50 margin; rising above it
    /// rejects the candidate.
    fn normal_velocities_ok(&self, u: &DVector<f64>, gaps: &[f64]) -> bool {
        for (c, &gap) in gaps.iter().enumerate() {
            if u[c] < 0.0 {
                let closure = u[c] * self.time_step;
                if closure > gap / GAP_MARGIN_DIVISOR {
                    return false;
                }
            }
        }
        true
    }
}

/// Acceptance oracle for one tier.
fn accept(tier: u8, energy_ratio: f64, err: f64, v_ok: bool) -> bool {
    match tier {
        1 => energy_ratio <= 1.0 + TIER12_ENERGY_SLACK && err.abs() <= TIER1_ERROR && v_ok,
        2 => energy_ratio <= 1.0 + TIER12_ENERGY_SLACK && err.abs() <= TIER2_ERROR && v_ok,
        _ => energy_ratio <= 1.0 + TIER3_ENERGY_SLACK && v_ok,
    }
}

/// Add a uniform random value in ±[`PERTURB_AMPLITUDE`] to every nonzero
/// entry of the working matrix.
fn perturb(a: &mut DMatrix<f64>, rng: &mut StdRng) {
    for value in a.iter_mut() {
        if *value != 0.0 {
            *value += rng.gen_range(-PERTURB_AMPLITUDE..=PERTURB_AMPLITUDE);
        }
    }
}

fn record(sink: Option<&dyn AttemptSink>, lcp: &crate::lcp::Lcp, outcome: AttemptOutcome) {
    if let Some(sink) = sink {
        sink.record_attempt(lcp, outcome);
    }
}
