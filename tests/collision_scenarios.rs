//! End-to-end collision scenarios.
//!
//! Each test drives the full pipeline — contact graph in, velocities,
//! impulses and solved flags out — and checks the physical invariants:
//! kinetic energy never grows beyond the acceptance slack, resolved
//! contacts stop approaching, repeated episodes are idempotent, and fixed
//! seeds reproduce bitwise-identical results.

#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use floe_collision::{
    CollisionConfig, ContactGraph, ContactId, ContactPoint, Floe, LcpManager,
};
use nalgebra::{Point2, Vector2};

fn total_kinetic_energy(graph: &ContactGraph) -> f64 {
    graph.floes().iter().map(Floe::kinetic_energy).sum()
}

/// The gap/50 screen of the acceptance oracle, as a test predicate: a
/// solved contact may not keep approaching with a per-step closure above
/// its gap margin.
fn penetration_margin_ok(graph: &ContactGraph, time_step: f64) -> bool {
    for edge in graph.edges() {
        let a = &graph.floes()[edge.first];
        let b = &graph.floes()[edge.second];
        for contact in &edge.contacts {
            if !graph.is_solved(contact.id) {
                continue;
            }
            let u = (b.point_velocity(contact.point) - a.point_velocity(contact.point))
                .dot(&contact.normal);
            if u < 0.0 && u * time_step > contact.gap / 50.0 {
                return false;
            }
        }
    }
    true
}

fn disk_pair(restitution: f64) -> ContactGraph {
    let floes = vec![
        Floe::new(Point2::new(-1.01, 0.0), 1.0, 0.5).with_velocity(Vector2::new(1.0, 0.0)),
        Floe::new(Point2::new(1.01, 0.0), 1.0, 0.5).with_velocity(Vector2::new(-1.0, 0.0)),
    ];
    let mut graph = ContactGraph::new(floes);
    graph
        .add_edge(
            0,
            1,
            vec![ContactPoint::new(
                ContactId::new(0),
                Point2::origin(),
                Vector2::x(),
                0.02,
            )
            .with_restitution(restitution)],
        )
        .unwrap();
    graph
}

#[test]
fn zero_contact_graph_changes_nothing() {
    let mut graph = ContactGraph::new(vec![
        Floe::new(Point2::new(0.0, 0.0), 1.0, 0.5).with_velocity(Vector2::new(3.0, 0.0)),
        Floe::new(Point2::new(10.0, 0.0), 2.0, 1.0),
    ]);
    let mut manager = LcpManager::new(CollisionConfig::default().with_seed(0));

    assert_eq!(manager.solve_contacts(&mut graph).unwrap(), 0);
    assert_relative_eq!(graph.floes()[0].velocity.x, 3.0);
    assert_relative_eq!(graph.floes()[0].collision_impulse, 0.0);
    assert!(manager.last_episode().components.is_empty());
}

#[test]
fn inelastic_head_on_pair_stops() {
    let mut graph = disk_pair(0.0);
    let energy_before = total_kinetic_energy(&graph);
    let mut manager = LcpManager::new(CollisionConfig::default().with_seed(0));

    let solved = manager.solve_contacts(&mut graph).unwrap();
    assert_eq!(solved, 1);

    for floe in graph.floes() {
        assert_relative_eq!(floe.velocity.norm(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(floe.angular_velocity, 0.0, epsilon = 1e-9);
        // Equal and opposite normal impulses of magnitude ~1 on each disk.
        assert_relative_eq!(floe.collision_impulse, 1.0, epsilon = 1e-9);
    }
    // A perfectly inelastic impact strictly dissipates energy.
    assert!(total_kinetic_energy(&graph) < energy_before);
    assert!(graph.is_solved(ContactId::new(0)));
}

#[test]
fn elastic_head_on_pair_bounces_back() {
    let mut graph = disk_pair(1.0);
    let energy_before = total_kinetic_energy(&graph);
    let mut manager = LcpManager::new(CollisionConfig::default().with_seed(0));

    manager.solve_contacts(&mut graph).unwrap();

    assert_relative_eq!(graph.floes()[0].velocity.x, -1.0, epsilon = 1e-9);
    assert_relative_eq!(graph.floes()[1].velocity.x, 1.0, epsilon = 1e-9);
    let energy_after = total_kinetic_energy(&graph);
    assert_relative_eq!(energy_after, energy_before, epsilon = 1e-9);
}

#[test]
fn elastic_equal_masses_swap_normal_keep_tangent() {
    // Frictionless elastic impact: the normal components swap, the
    // tangential components and spins pass through untouched.
    let floes = vec![
        Floe::new(Point2::new(-1.01, 0.0), 1.0, 0.5).with_velocity(Vector2::new(1.0, 0.3)),
        Floe::new(Point2::new(1.01, 0.0), 1.0, 0.5).with_velocity(Vector2::new(-1.0, -0.2)),
    ];
    let mut graph = ContactGraph::new(floes);
    graph
        .add_edge(
            0,
            1,
            vec![ContactPoint::new(
                ContactId::new(0),
                Point2::origin(),
                Vector2::x(),
                0.02,
            )
            .with_restitution(1.0)],
        )
        .unwrap();

    let mut manager = LcpManager::new(CollisionConfig::default().with_seed(0));
    manager.solve_contacts(&mut graph).unwrap();

    assert_relative_eq!(graph.floes()[0].velocity.x, -1.0, epsilon = 1e-9);
    assert_relative_eq!(graph.floes()[0].velocity.y, 0.3, epsilon = 1e-9);
    assert_relative_eq!(graph.floes()[1].velocity.x, 1.0, epsilon = 1e-9);
    assert_relative_eq!(graph.floes()[1].velocity.y, -0.2, epsilon = 1e-9);
    assert_relative_eq!(graph.floes()[0].angular_velocity, 0.0, epsilon = 1e-9);
}

#[test]
fn newtons_cradle_propagates_through_the_chain() {
    // Three aligned disks, left one incoming, elastic and frictionless.
    // The scheduler needs several activity iterations: the first impact
    // transfers the momentum to the middle disk, the second passes it on.
    let floes = vec![
        Floe::new(Point2::new(0.0, 0.0), 1.0, 0.5).with_velocity(Vector2::new(1.0, 0.0)),
        Floe::new(Point2::new(2.02, 0.0), 1.0, 0.5),
        Floe::new(Point2::new(4.04, 0.0), 1.0, 0.5),
    ];
    let mut graph = ContactGraph::new(floes);
    for (id, (a, b, x)) in [(0, 1, 1.01), (1, 2, 3.03)].iter().enumerate() {
        graph
            .add_edge(
                *a,
                *b,
                vec![ContactPoint::new(
                    ContactId::new(id as u64),
                    Point2::new(*x, 0.0),
                    Vector2::x(),
                    0.02,
                )
                .with_restitution(1.0)],
            )
            .unwrap();
    }

    let mut manager = LcpManager::new(CollisionConfig::default().with_seed(0));
    let solved = manager.solve_contacts(&mut graph).unwrap();

    assert_eq!(solved, 2);
    assert_relative_eq!(graph.floes()[0].velocity.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(graph.floes()[1].velocity.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(graph.floes()[2].velocity.x, 1.0, epsilon = 1e-9);
    assert!(graph.is_solved(ContactId::new(0)));
    assert!(graph.is_solved(ContactId::new(1)));
    // The whole episode took more than one activity iteration.
    assert!(manager.last_episode().components[0].loop_count >= 2);
}

#[test]
fn duplicate_contacts_make_a_degenerate_lcp_that_still_resolves() {
    // Two aliases of the same geometric contact give co-linear Jacobian
    // columns; plain Lemke may ray-terminate on the singular matrix, but
    // the cascade falls through to the lexicographic solver.
    let floes = vec![
        Floe::new(Point2::new(-1.01, 0.0), 1.0, 0.5).with_velocity(Vector2::new(1.0, 0.0)),
        Floe::new(Point2::new(1.01, 0.0), 1.0, 0.5).with_velocity(Vector2::new(-1.0, 0.0)),
    ];
    let mut graph = ContactGraph::new(floes);
    graph
        .add_edge(
            0,
            1,
            vec![
                ContactPoint::new(ContactId::new(0), Point2::origin(), Vector2::x(), 0.02),
                ContactPoint::new(ContactId::new(1), Point2::origin(), Vector2::x(), 0.02),
            ],
        )
        .unwrap();

    let mut manager = LcpManager::new(CollisionConfig::default().with_seed(0));
    let solved = manager.solve_contacts(&mut graph).unwrap();

    assert_eq!(solved, 1);
    for floe in graph.floes() {
        assert_relative_eq!(floe.velocity.norm(), 0.0, epsilon = 1e-8);
        // The unit of incoming momentum is absorbed across both aliases.
        assert_relative_eq!(floe.collision_impulse, 1.0, epsilon = 1e-8);
    }
}

/// Sixty disks stacked in columns, falling with a velocity gradient so
/// every vertical contact approaches, with friction engaged by lateral
/// drift.
fn pile_graph() -> ContactGraph {
    let columns = 6;
    let rows = 10;
    let mut floes = Vec::new();
    for col in 0..columns {
        for row in 0..rows {
            let x = 3.0 * f64::from(col);
            let y = 1.02 * f64::from(row);
            // Higher disks fall faster, so each pair closes; a small
            // alternating drift exercises the tangential directions.
            let vy = -0.1 * f64::from(row + 1);
            let vx = 0.02 * f64::from(row % 3) - 0.02;
            floes.push(
                Floe::new(Point2::new(x, y), 1.0, 0.125)
                    .with_velocity(Vector2::new(vx, vy)),
            );
        }
    }

    let mut graph = ContactGraph::new(floes);
    let mut id = 0;
    for col in 0..columns {
        for row in 0..rows - 1 {
            let lower = (col * rows + row) as usize;
            let upper = lower + 1;
            let x = 3.0 * f64::from(col);
            let y = 1.02 * f64::from(row) + 0.51;
            graph
                .add_edge(
                    lower,
                    upper,
                    vec![ContactPoint::new(
                        ContactId::new(id),
                        Point2::new(x, y),
                        Vector2::y(),
                        0.02,
                    )
                    .with_friction(0.3)],
                )
                .unwrap();
            id += 1;
        }
    }
    graph
}

#[test]
fn pile_under_gravity_dissipates_and_respects_gap_margins() {
    let config = CollisionConfig::default().with_seed(3);
    let mut graph = pile_graph();
    let energy_before = total_kinetic_energy(&graph);

    let mut manager = LcpManager::new(config.clone());
    let solved = manager.solve_contacts(&mut graph).unwrap();

    assert!(solved > 0);
    // Inelastic frictional contacts only dissipate; the acceptance slack
    // bounds whatever numerical wiggle remains.
    let energy_after = total_kinetic_energy(&graph);
    assert!(
        energy_after <= energy_before * 1.01,
        "energy grew: {energy_before} -> {energy_after}"
    );
    assert!(penetration_margin_ok(&graph, config.time_step));
}

#[test]
fn repeated_episode_is_idempotent() {
    let mut graph = pile_graph();
    let mut manager = LcpManager::new(CollisionConfig::default().with_seed(3));
    manager.solve_contacts(&mut graph).unwrap();

    let velocities: Vec<Vector2<f64>> = graph.floes().iter().map(|f| f.velocity).collect();
    // Second run on the already-resolved state: nothing should change.
    let solved_again = manager.solve_contacts(&mut graph).unwrap();
    let unchanged = graph
        .floes()
        .iter()
        .zip(&velocities)
        .all(|(floe, before)| floe.velocity == *before);

    assert!(unchanged);
    assert_eq!(solved_again, 0);
}

#[test]
fn fixed_seed_reproduces_bitwise_identical_episodes() {
    let run = || {
        let mut graph = pile_graph();
        let mut manager = LcpManager::new(CollisionConfig::default().with_seed(42));
        let solved = manager.solve_contacts(&mut graph).unwrap();
        (solved, graph)
    };

    let (solved_a, graph_a) = run();
    let (solved_b, graph_b) = run();

    assert_eq!(solved_a, solved_b);
    for (a, b) in graph_a.floes().iter().zip(graph_b.floes()) {
        assert_eq!(a.velocity, b.velocity);
        assert_eq!(a.angular_velocity, b.angular_velocity);
        assert_eq!(a.collision_impulse, b.collision_impulse);
    }
}

/// A 9×8 raft of disks in a contraction flow: all 127 neighbour contacts
/// approach at once, forming a single active subgraph far above the
/// quadrant-split threshold.
fn contracting_raft() -> ContactGraph {
    let width = 9_usize;
    let height = 8_usize;
    let spacing = 1.02;
    let mut floes = Vec::new();
    let centre = Vector2::new(
        spacing * (width as f64 - 1.0) / 2.0,
        spacing * (height as f64 - 1.0) / 2.0,
    );
    for j in 0..height {
        for i in 0..width {
            let p = Point2::new(spacing * i as f64, spacing * j as f64);
            let v = -0.05 * (p.coords - centre);
            floes.push(Floe::new(p, 1.0, 0.125).with_velocity(v));
        }
    }

    let mut graph = ContactGraph::new(floes);
    let mut id = 0;
    for j in 0..height {
        for i in 0..width {
            let v = j * width + i;
            if i + 1 < width {
                graph
                    .add_edge(
                        v,
                        v + 1,
                        vec![ContactPoint::new(
                            ContactId::new(id),
                            Point2::new(spacing * i as f64 + 0.51, spacing * j as f64),
                            Vector2::x(),
                            0.02,
                        )],
                    )
                    .unwrap();
                id += 1;
            }
            if j + 1 < height {
                graph
                    .add_edge(
                        v,
                        v + width,
                        vec![ContactPoint::new(
                            ContactId::new(id),
                            Point2::new(spacing * i as f64, spacing * j as f64 + 0.51),
                            Vector2::y(),
                            0.02,
                        )],
                    )
                    .unwrap();
                id += 1;
            }
        }
    }
    graph
}

#[test]
fn oversized_active_subgraph_is_quadrant_split() {
    let graph = contracting_raft();
    let component = graph.collision_subgraphs().remove(0);
    assert_eq!(component.num_contacts(), 127);

    let active = graph.active_subgraphs(&component);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].num_contacts(), 127);

    let cut = graph.quad_cut(&active[0]);
    assert_eq!(cut.len(), 4);
    let total: usize = cut.iter().map(|p| p.num_contacts()).sum();
    assert_eq!(total, 127);
    for problem in &cut {
        assert!(problem.num_contacts() <= 50);
    }
}

#[test]
fn contracting_raft_episode_keeps_global_invariants() {
    let config = CollisionConfig::default().with_seed(11);
    let mut graph = contracting_raft();
    let energy_before = total_kinetic_energy(&graph);

    let mut manager = LcpManager::new(config.clone());
    let solved = manager.solve_contacts(&mut graph).unwrap();

    assert!(solved > 0);
    let energy_after = total_kinetic_energy(&graph);
    assert!(
        energy_after <= energy_before * 1.01,
        "energy grew: {energy_before} -> {energy_after}"
    );
    assert!(penetration_margin_ok(&graph, config.time_step));
}

#[test]
fn parallel_components_match_sequential_results() {
    // Several disjoint colliding pairs: the component-parallel path must
    // produce exactly the sequential outcome.
    let build = || {
        let mut floes = Vec::new();
        let mut graph_edges = Vec::new();
        for k in 0..6_usize {
            let x0 = 10.0 * k as f64;
            floes.push(
                Floe::new(Point2::new(x0 - 1.01, 0.0), 1.0, 0.5)
                    .with_velocity(Vector2::new(1.0, 0.0)),
            );
            floes.push(
                Floe::new(Point2::new(x0 + 1.01, 0.0), 1.0, 0.5)
                    .with_velocity(Vector2::new(-1.0, 0.0)),
            );
            graph_edges.push((2 * k, 2 * k + 1, x0));
        }
        let mut graph = ContactGraph::new(floes);
        for (id, (a, b, x)) in graph_edges.into_iter().enumerate() {
            graph
                .add_edge(
                    a,
                    b,
                    vec![ContactPoint::new(
                        ContactId::new(id as u64),
                        Point2::new(x, 0.0),
                        Vector2::x(),
                        0.02,
                    )],
                )
                .unwrap();
        }
        graph
    };

    let mut sequential = build();
    let mut parallel = build();

    let mut manager_seq = LcpManager::new(CollisionConfig::default().with_seed(5));
    let mut manager_par =
        LcpManager::new(CollisionConfig::default().with_seed(5).with_parallel(true));

    let solved_seq = manager_seq.solve_contacts(&mut sequential).unwrap();
    let solved_par = manager_par.solve_contacts(&mut parallel).unwrap();

    assert_eq!(solved_seq, 6);
    assert_eq!(solved_par, 6);
    for (a, b) in sequential.floes().iter().zip(parallel.floes()) {
        assert_eq!(a.velocity, b.velocity);
        assert_eq!(a.collision_impulse, b.collision_impulse);
    }
}
