//! LCP-based collision resolution for 2-D rigid floes.
//!
//! This crate is the collision-resolution core of a granular-medium
//! simulator: given a contact graph produced by an external broad/narrow
//! phase, it resolves all simultaneous contacts of one simulation step by
//! building and solving a sequence of frictional-contact Linear
//! Complementarity Problems, then writes corrected velocities and
//! accumulated impulses back onto the floes.
//!
//! # Architecture
//!
//! - [`ContactGraph`] — floes as vertices, contact lists as edges, plus the
//!   per-contact solved ledger;
//! - [`solver`] — pure pivoting algorithms (Lemke, lexicographic Lemke) and
//!   a projected Gauss-Seidel refinement;
//! - [`LcpSolver`] — the driver: a fixed cascade of numerical strategies
//!   with a physical acceptance oracle (kinetic energy, complementarity
//!   error, normal relative velocity);
//! - [`LcpManager`] — the scheduler: iterates active subgraphs of each
//!   connected component until quiescence, splitting oversized subgraphs
//!   into spatial quadrants, with optional component-level parallelism.
//!
//! Geometry, proximity detection, time integration and persistence live in
//! other crates; this one only consumes the contact graph and a default
//! time step, and produces velocity/impulse updates plus per-contact
//! solved flags.
//!
//! # Example
//!
//! ```
//! use floe_collision::{
//!     CollisionConfig, ContactGraph, ContactId, ContactPoint, Floe, LcpManager,
//! };
//! use nalgebra::{Point2, Vector2};
//!
//! // Two unit disks drifting into each other head-on.
//! let floes = vec![
//!     Floe::new(Point2::new(-1.01, 0.0), 1.0, 0.5).with_velocity(Vector2::new(1.0, 0.0)),
//!     Floe::new(Point2::new(1.01, 0.0), 1.0, 0.5).with_velocity(Vector2::new(-1.0, 0.0)),
//! ];
//! let mut graph = ContactGraph::new(floes);
//! graph.add_edge(
//!     0,
//!     1,
//!     vec![ContactPoint::new(
//!         ContactId::new(0),
//!         Point2::origin(),
//!         Vector2::x(),
//!         0.02,
//!     )],
//! )?;
//!
//! let mut manager = LcpManager::new(CollisionConfig::default().with_seed(0));
//! let solved = manager.solve_contacts(&mut graph)?;
//!
//! assert_eq!(solved, 1);
//! // A perfectly inelastic head-on collision stops both disks.
//! assert!(graph.floes()[0].velocity.norm() < 1e-9);
//! assert!(graph.is_solved(ContactId::new(0)));
//! # Ok::<(), floe_collision::CollisionError>(())
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod builder;
mod config;
mod contact;
mod driver;
mod error;
mod floe;
mod graph;
mod lcp;
mod manager;
pub mod solver;
mod stats;

pub use config::CollisionConfig;
pub use contact::{ContactId, ContactPoint};
pub use driver::{LcpSolver, ProblemSolution};
pub use error::CollisionError;
pub use floe::Floe;
pub use graph::{ContactEdge, ContactGraph, SubGraph, SubProblem};
pub use lcp::Lcp;
pub use manager::LcpManager;
pub use stats::{AttemptOutcome, AttemptSink, ComponentReport, EpisodeStats, PhaseFailures};
