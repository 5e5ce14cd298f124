//! Contact points between floe pairs.

use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable identifier of a contact.
///
/// Ghost/mirror copies of the same physical contact (e.g. across periodic
/// boundaries) carry the same id, so they resolve to the same entry in the
/// graph's solved ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactId(pub u64);

impl ContactId {
    /// Create a new contact id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for ContactId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Contact({})", self.0)
    }
}

/// A single contact point between two floes.
///
/// The normal points from the first floe of the owning edge towards the
/// second; the tangent is its right-hand (counter-clockwise) rotation and is
/// derived rather than stored, so normal and tangent can never disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactPoint {
    /// Stable contact identifier, shared by ghost copies.
    pub id: ContactId,
    /// Contact point in world coordinates.
    pub point: Point2<f64>,
    /// Outward unit normal, first floe → second floe.
    pub normal: Vector2<f64>,
    /// Signed separation distance (negative when penetrating).
    pub gap: f64,
    /// Coulomb friction coefficient μ.
    pub friction: f64,
    /// Restitution coefficient e.
    pub restitution: f64,
}

impl ContactPoint {
    /// Create a frictionless, perfectly inelastic contact.
    #[must_use]
    pub fn new(id: ContactId, point: Point2<f64>, normal: Vector2<f64>, gap: f64) -> Self {
        Self {
            id,
            point,
            normal,
            gap,
            friction: 0.0,
            restitution: 0.0,
        }
    }

    /// Set the friction coefficient.
    #[must_use]
    pub const fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Set the restitution coefficient.
    #[must_use]
    pub const fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Tangent direction: the normal rotated 90° counter-clockwise.
    #[must_use]
    pub fn tangent(&self) -> Vector2<f64> {
        Vector2::new(-self.normal.y, self.normal.x)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tangent_is_ccw_rotation() {
        let c = ContactPoint::new(
            ContactId::new(0),
            Point2::origin(),
            Vector2::new(1.0, 0.0),
            0.1,
        );
        let t = c.tangent();
        assert_relative_eq!(t.x, 0.0);
        assert_relative_eq!(t.y, 1.0);
        // Tangent is orthogonal to the normal and unit length.
        assert_relative_eq!(t.dot(&c.normal), 0.0);
        assert_relative_eq!(t.norm(), 1.0);
    }

    #[test]
    fn test_ghost_copies_share_id() {
        let a = ContactPoint::new(
            ContactId::new(3),
            Point2::new(0.0, 0.0),
            Vector2::new(0.0, 1.0),
            0.05,
        );
        let ghost = ContactPoint::new(
            ContactId::new(3),
            Point2::new(100.0, 0.0), // mirrored across a periodic boundary
            Vector2::new(0.0, 1.0),
            0.05,
        );
        assert_eq!(a.id, ghost.id);
    }
}
