//! Rigid-floe state.
//!
//! A floe is a 2-D rigid body with three degrees of freedom: planar
//! translation and rotation about the out-of-plane axis. Collision
//! resolution reads the pose and mass properties, and mutates only the
//! velocities and the accumulated collision impulse.

use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// State of a single floe.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Floe {
    /// Centre position in world coordinates.
    pub position: Point2<f64>,
    /// Orientation (radians).
    pub orientation: f64,
    /// Linear velocity of the centre.
    pub velocity: Vector2<f64>,
    /// Angular velocity (rad/s, positive counter-clockwise).
    pub angular_velocity: f64,
    /// Mass.
    pub mass: f64,
    /// Moment of inertia about the centre.
    pub inertia: f64,
    /// Accumulated normal collision impulse received so far.
    pub collision_impulse: f64,
}

impl Floe {
    /// Create a floe at rest.
    #[must_use]
    pub fn new(position: Point2<f64>, mass: f64, inertia: f64) -> Self {
        Self {
            position,
            orientation: 0.0,
            velocity: Vector2::zeros(),
            angular_velocity: 0.0,
            mass,
            inertia,
            collision_impulse: 0.0,
        }
    }

    /// Set the linear velocity.
    #[must_use]
    pub const fn with_velocity(mut self, velocity: Vector2<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the angular velocity.
    #[must_use]
    pub const fn with_angular_velocity(mut self, omega: f64) -> Self {
        self.angular_velocity = omega;
        self
    }

    /// Accumulate received collision impulse.
    pub fn add_impulse(&mut self, impulse: f64) {
        self.collision_impulse += impulse;
    }

    /// Kinetic energy, translational plus rotational.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
            + 0.5 * self.inertia * self.angular_velocity * self.angular_velocity
    }

    /// Velocity of a world-frame point rigidly attached to this floe.
    #[must_use]
    pub fn point_velocity(&self, point: Point2<f64>) -> Vector2<f64> {
        let r = point - self.position;
        // omega x r in 2-D: omega * (-r.y, r.x)
        self.velocity + self.angular_velocity * Vector2::new(-r.y, r.x)
    }

    /// Whether the mass properties admit a well-defined inverse mass matrix.
    #[must_use]
    pub fn has_valid_mass(&self) -> bool {
        self.mass.is_finite() && self.mass > 0.0 && self.inertia.is_finite() && self.inertia > 0.0
    }
}
