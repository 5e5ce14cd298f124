//! Error types for collision resolution.
//!
//! Only *structural* problems are errors: malformed graphs, inconsistent
//! dimensions, non-physical mass properties. Numerical solver failures
//! (ray termination, pivot caps, NaN solutions) are expected events handled
//! by the strategy cascade and never surface as `CollisionError`.

use thiserror::Error;

/// Errors that can occur while resolving a collision episode.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CollisionError {
    /// A contact references a floe index outside the graph.
    #[error("contact references unknown floe index {index} (graph has {num_floes} floes)")]
    UnknownFloe {
        /// The out-of-range floe index.
        index: usize,
        /// Number of floes in the graph.
        num_floes: usize,
    },

    /// A floe has a non-positive or non-finite mass or moment of inertia.
    #[error("floe {index} has invalid mass properties: mass={mass}, inertia={inertia}")]
    InvalidMassProperties {
        /// The offending floe index.
        index: usize,
        /// Its mass.
        mass: f64,
        /// Its moment of inertia.
        inertia: f64,
    },

    /// Two matrices or vectors that must agree in size do not.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Where the mismatch was detected.
        context: &'static str,
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// A contact normal is not a unit vector.
    #[error("contact normal has norm {norm}, expected a unit vector")]
    DegenerateNormal {
        /// Norm of the offending normal.
        norm: f64,
    },
}

impl CollisionError {
    /// Check if this error concerns mass properties.
    #[must_use]
    pub fn is_mass_error(&self) -> bool {
        matches!(self, Self::InvalidMassProperties { .. })
    }

    /// Check if this error concerns graph structure.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnknownFloe { .. } | Self::DimensionMismatch { .. } | Self::DegenerateNormal { .. }
        )
    }
}
