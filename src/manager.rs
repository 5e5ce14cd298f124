//! The sub-graph scheduler.
//!
//! One collision episode resolves a whole contact graph:
//!
//! 1. split the graph into connected components (independent collision
//!    groups — these never share a floe, so they may run in parallel);
//! 2. per component, repeatedly extract the *active* subgraphs (edges whose
//!    contacts are still approaching), solve each as its own LCP — split
//!    into spatial quadrants above the 50-contact threshold — and write the
//!    velocity/impulse updates back;
//! 3. stop when no active subgraph remains, when an inner pass makes no
//!    progress, or when the iteration cap `min(60·contacts, 1000)` runs
//!    out. Contacts still active at that point are marked unsolved.
//!
//! Each component is solved on a private snapshot of its floes and its
//! outcome merged back afterwards, so the sequential and rayon paths share
//! the same code; within a component the loop is inherently serial because
//! every solve changes the velocities that define the next activity
//! pattern.

use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;

use crate::config::CollisionConfig;
use crate::contact::ContactId;
use crate::driver::LcpSolver;
use crate::error::CollisionError;
use crate::floe::Floe;
use crate::graph::{ContactGraph, SubGraph, SubProblem};
use crate::stats::{AttemptSink, ComponentReport, EpisodeStats, PhaseFailures};

/// Active subgraphs above this contact count are split into quadrants.
const QUAD_CUT_THRESHOLD: usize = 50;

/// Iteration cap factor: at most `60 · num_contacts` activity iterations.
const MAX_ITERATIONS_PER_CONTACT: usize = 60;

/// Absolute activity-iteration cap per component.
const MAX_ITERATIONS: usize = 1000;

/// Outcome of one component's episode, merged by the manager.
struct ComponentOutcome {
    /// Final floe states, `(graph index, state)`.
    floes: Vec<(usize, Floe)>,
    /// Ledger updates in occurrence order.
    solved: Vec<(ContactId, bool)>,
    report: ComponentReport,
    failures: PhaseFailures,
    nb_success: usize,
}

/// Scheduler resolving all contacts of an episode through the LCP driver.
pub struct LcpManager {
    config: CollisionConfig,
    solver: LcpSolver,
    base_seed: u64,
    episode_counter: u64,
    last_episode: EpisodeStats,
    total_lcp: u64,
    total_solved: u64,
    total_failures: PhaseFailures,
    sink: Option<Arc<dyn AttemptSink>>,
}

impl LcpManager {
    /// Create a manager for the given configuration.
    #[must_use]
    pub fn new(config: CollisionConfig) -> Self {
        let base_seed = config.seed.unwrap_or_else(rand::random);
        let solver = LcpSolver::new(&config);
        Self {
            config,
            solver,
            base_seed,
            episode_counter: 0,
            last_episode: EpisodeStats::default(),
            total_lcp: 0,
            total_solved: 0,
            total_failures: PhaseFailures::default(),
            sink: None,
        }
    }

    /// Attach a per-attempt recording sink (diagnostics only; the episode
    /// outcome is identical with or without one).
    pub fn set_sink(&mut self, sink: Arc<dyn AttemptSink>) {
        self.sink = Some(sink);
    }

    /// Resolve all contacts of `graph`, mutating floe velocities, angular
    /// velocities and impulses, and the per-contact solved flags.
    ///
    /// Returns the number of LCPs solved successfully this episode.
    ///
    /// # Errors
    ///
    /// Propagates structural [`CollisionError`]s from the builder. The
    /// graph is left partially updated in that case; numerical trouble
    /// never produces an error.
    pub fn solve_contacts(&mut self, graph: &mut ContactGraph) -> Result<usize, CollisionError> {
        let components = graph.collision_subgraphs();
        let episode_seed = self
            .base_seed
            .wrapping_add(self.episode_counter.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.episode_counter += 1;

        let this = &*self;
        let shared: &ContactGraph = graph;
        let run = |(index, component): (usize, &SubGraph)| {
            let seed = episode_seed.wrapping_add((index as u64).wrapping_mul(0x517C_C1B7_2722_0A95));
            this.solve_component(shared, component, seed)
        };

        let outcomes: Vec<Result<ComponentOutcome, CollisionError>> =
            if self.config.parallel && components.len() >= self.config.min_components_for_parallel {
                components.par_iter().enumerate().map(run).collect()
            } else {
                components.iter().enumerate().map(run).collect()
            };

        let mut episode = EpisodeStats::default();
        let mut nb_success = 0;
        for outcome in outcomes {
            let outcome = outcome?;
            for (index, floe) in outcome.floes {
                graph.floes_mut()[index] = floe;
            }
            for (id, solved) in outcome.solved {
                graph.set_solved(id, solved);
            }
            nb_success += outcome.nb_success;
            episode.absorb(outcome.report, &outcome.failures, outcome.nb_success);
        }

        self.total_lcp += episode.lcp_attempted as u64;
        self.total_solved += episode.lcp_solved as u64;
        self.total_failures.merge(&episode.failures);
        if episode.lcp_attempted > 0 {
            tracing::debug!(
                solved = episode.lcp_solved,
                attempted = episode.lcp_attempted,
                "contact LCPs solved"
            );
        }
        self.last_episode = episode;
        Ok(nb_success)
    }

    /// Statistics of the most recent episode.
    #[must_use]
    pub fn last_episode(&self) -> &EpisodeStats {
        &self.last_episode
    }

    /// Lifetime `(solved, attempted)` LCP counts.
    #[must_use]
    pub fn totals(&self) -> (u64, u64) {
        (self.total_solved, self.total_lcp)
    }

    /// Lifetime per-phase failure counters.
    #[must_use]
    pub fn total_failures(&self) -> PhaseFailures {
        self.total_failures
    }

    /// Lifetime solving success ratio in percent (100 when idle).
    #[must_use]
    pub fn success_ratio(&self) -> f64 {
        if self.total_lcp == 0 {
            100.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                100.0 * self.total_solved as f64 / self.total_lcp as f64
            }
        }
    }

    /// Run the activity fixed-point loop on one connected component,
    /// against a private snapshot of its floes.
    fn solve_component(
        &self,
        graph: &ContactGraph,
        component: &SubGraph,
        seed: u64,
    ) -> Result<ComponentOutcome, CollisionError> {
        let vertices: Vec<usize> = component.vertices().to_vec();
        let mut local: Vec<Floe> = vertices.iter().map(|&v| graph.floes()[v]).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let sink = self.sink.as_deref();

        let mut solved_updates: Vec<(ContactId, bool)> = Vec::new();
        let mut failures = PhaseFailures::default();
        let mut lcp_count = 0;
        let mut nb_success = 0;

        let cap = (MAX_ITERATIONS_PER_CONTACT * component.num_contacts()).min(MAX_ITERATIONS);
        let mut active = active_with_snapshot(graph, component, &vertices, &local);
        let initial_active = active.len();
        let mut loop_count = 0;
        let mut made_progress = true;

        while !active.is_empty() && loop_count < cap && made_progress {
            made_progress = false;

            for sub in &active {
                let problems: Vec<SubProblem> = if sub.num_contacts() > QUAD_CUT_THRESHOLD {
                    graph.quad_cut(sub)
                } else {
                    vec![sub.to_problem(graph)]
                };
                lcp_count += problems.len();

                for problem in &problems {
                    let snapshot = local.clone();
                    let lookup = |v: usize| snapshot[local_pos(&vertices, v)];
                    let solution = self.solver.solve_with(
                        graph,
                        problem,
                        &lookup,
                        &mut rng,
                        &mut failures,
                        sink,
                    )?;

                    for (k, &v) in problem.vertices().iter().enumerate() {
                        let floe = &mut local[local_pos(&vertices, v)];
                        floe.velocity = Vector2::new(
                            solution.velocities[3 * k],
                            solution.velocities[3 * k + 1],
                        );
                        floe.angular_velocity = solution.velocities[3 * k + 2];
                        if solution.success {
                            floe.add_impulse(solution.impulses[k]);
                        }
                    }

                    if solution.success {
                        made_progress = true;
                        nb_success += 1;
                        for &slot in problem.contacts() {
                            solved_updates.push((graph.contact(slot).id, true));
                        }
                    }
                }
            }

            active = active_with_snapshot(graph, component, &vertices, &local);
            loop_count += 1;
        }

        let all_solved = active.is_empty();
        if !all_solved {
            // Give up: whatever stayed active is reported unsolved.
            lcp_count += active.len();
            for sub in &active {
                for &edge in sub.edges() {
                    for contact in &graph.edges()[edge].contacts {
                        solved_updates.push((contact.id, false));
                    }
                }
            }
            tracing::warn!(
                remaining = active.len(),
                iterations = loop_count,
                "component gave up with active contacts"
            );
        }

        Ok(ComponentOutcome {
            floes: vertices.into_iter().zip(local).collect(),
            solved: solved_updates,
            report: ComponentReport {
                lcp_count,
                loop_count,
                initial_active,
                all_solved,
            },
            failures,
            nb_success,
        })
    }
}

impl Drop for LcpManager {
    fn drop(&mut self) {
        if self.total_lcp > 0 {
            tracing::info!(
                solved = self.total_solved,
                attempted = self.total_lcp,
                ratio = self.success_ratio(),
                compression_failures = self.total_failures.compression,
                decompression_failures = self.total_failures.decompression,
                energy_preserving = self.total_failures.energy_preserving,
                "lifetime contact LCP totals"
            );
        }
    }
}

/// Position of a global floe index within a sorted vertex list.
fn local_pos(vertices: &[usize], global: usize) -> usize {
    vertices.partition_point(|&v| v < global)
}

/// Active subgraphs of `component` evaluated against snapshot velocities.
fn active_with_snapshot(
    graph: &ContactGraph,
    component: &SubGraph,
    vertices: &[usize],
    local: &[Floe],
) -> Vec<SubGraph> {
    let lookup = |v: usize| {
        let floe = &local[local_pos(vertices, v)];
        (floe.velocity, floe.angular_velocity)
    };
    graph.active_subgraphs_with(component, &lookup)
}
