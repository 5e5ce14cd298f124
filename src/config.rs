//! Episode configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a collision-resolution episode.
///
/// Most simulations only ever override the default time step and, for
/// large domains, the parallelism toggle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionConfig {
    /// Default time step (seconds), used only by the normal-velocity
    /// acceptance test: a contact still approaching after a solve is
    /// rejected when it would close more than 1/50 of its gap in one step.
    pub time_step: f64,
    /// Solve independent connected components on the rayon thread pool.
    /// Within a component solving is always sequential: each sub-graph
    /// solve changes the velocities that define the next activity pattern.
    pub parallel: bool,
    /// Minimum number of components before the parallel path is taken.
    /// Below this the sequential path avoids rayon overhead.
    pub min_components_for_parallel: usize,
    /// Seed for the perturbation RNG. Components fork deterministically
    /// from this seed, so a fixed seed gives reproducible episodes even
    /// with `parallel` enabled. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            time_step: 1.0 / 60.0,
            parallel: false,
            min_components_for_parallel: 2,
            seed: None,
        }
    }
}

impl CollisionConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default time step used by the acceptance test.
    #[must_use]
    pub const fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Enable or disable component-level parallelism.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the minimum component count for the parallel path.
    #[must_use]
    pub const fn with_min_components_for_parallel(mut self, min: usize) -> Self {
        self.min_components_for_parallel = min;
        self
    }

    /// Set a random seed for reproducible perturbations.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
