//! Episode statistics and the optional per-attempt recording hook.

use crate::lcp::Lcp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What happened to one cascade attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttemptOutcome {
    /// A solution passed the physical acceptance test.
    Accepted,
    /// The solver produced a solution, but acceptance refused it.
    Rejected,
    /// Numerical failure: ray termination, pivot cap, or NaN.
    Failed,
    /// A perturbation step (mutates the working matrix, never accepted).
    Perturbed,
}

/// Observer of individual cascade attempts.
///
/// The driver calls [`AttemptSink::record_attempt`] exactly once per cascade
/// entry. Implementations are shared across worker threads, so recording
/// goes through `&self`; use interior mutability (atomics or a mutex).
pub trait AttemptSink: Send + Sync {
    /// Record one attempt on `lcp` with the given outcome.
    fn record_attempt(&self, lcp: &Lcp, outcome: AttemptOutcome);
}

/// Failure counters per solver phase:
/// compression, decompression, energy-preserving decompression.
///
/// Only the compression slot is fed by the single-phase driver; the other
/// two exist so a two-phase solver can report through the same surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseFailures {
    /// LCPs that exhausted the cascade in the compression phase.
    pub compression: u64,
    /// LCPs that failed during decompression.
    pub decompression: u64,
    /// LCPs solved while maintaining kinetic energy in decompression.
    pub energy_preserving: u64,
}

impl PhaseFailures {
    /// Accumulate another set of counters.
    pub fn merge(&mut self, other: &Self) {
        self.compression += other.compression;
        self.decompression += other.decompression;
        self.energy_preserving += other.energy_preserving;
    }
}

/// Summary of how one connected component was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentReport {
    /// LCPs dispatched over the component's whole episode.
    pub lcp_count: usize,
    /// Outer activity iterations performed.
    pub loop_count: usize,
    /// Active subgraphs on entry.
    pub initial_active: usize,
    /// Whether the component reached quiescence (no give-up).
    pub all_solved: bool,
}

/// Statistics of one collision episode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpisodeStats {
    /// Total LCPs dispatched to the driver.
    pub lcp_attempted: usize,
    /// LCPs whose solution was accepted.
    pub lcp_solved: usize,
    /// Per-phase failure counters.
    pub failures: PhaseFailures,
    /// One report per connected component, in traversal order.
    pub components: Vec<ComponentReport>,
}

impl EpisodeStats {
    /// Fold one component's contribution into the episode.
    pub(crate) fn absorb(
        &mut self,
        report: ComponentReport,
        failures: &PhaseFailures,
        solved: usize,
    ) {
        self.lcp_attempted += report.lcp_count;
        self.lcp_solved += solved;
        self.failures.merge(failures);
        self.components.push(report);
    }
}
