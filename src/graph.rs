//! Contact graph: floes as vertices, contact lists as edges.
//!
//! The graph is supplied once per collision episode by the proximity
//! detector and discarded afterwards. Three operations drive the scheduler:
//!
//! - [`ContactGraph::collision_subgraphs`] — connected components of the
//!   whole graph (independent collision groups);
//! - [`ContactGraph::active_subgraphs`] — connected components restricted to
//!   edges where at least one contact is still approaching;
//! - [`ContactGraph::quad_cut`] — spatial 4-way split of an oversized
//!   subgraph's contact set, to keep LCP dimensions bounded.
//!
//! Component discovery uses a union-find over floe indices; vertices are
//! kept sorted and components ordered by their lowest vertex, so traversal
//! order is deterministic.
//!
//! Solved flags live in a ledger keyed by [`ContactId`], not on the contact
//! itself: ghost copies of a contact (periodic boundaries) carry the same id
//! and therefore observe the same flag.

use hashbrown::HashMap;
use nalgebra::Vector2;

use crate::contact::{ContactId, ContactPoint};
use crate::error::CollisionError;
use crate::floe::Floe;

/// Velocity lookup used when evaluating contact activity: maps a floe index
/// to its (linear velocity, angular velocity).
pub(crate) type VelocityLookup<'a> = &'a dyn Fn(usize) -> (Vector2<f64>, f64);

/// An edge of the contact graph: all contact points between one floe pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEdge {
    /// Index of the first floe.
    pub first: usize,
    /// Index of the second floe.
    pub second: usize,
    /// Contact points between the pair, in detector order.
    pub contacts: Vec<ContactPoint>,
}

/// Contact graph for one collision episode.
#[derive(Debug, Clone)]
pub struct ContactGraph {
    floes: Vec<Floe>,
    edges: Vec<ContactEdge>,
    solved: HashMap<ContactId, bool>,
}

impl ContactGraph {
    /// Create a graph over the given floes, with no contacts yet.
    #[must_use]
    pub fn new(floes: Vec<Floe>) -> Self {
        Self {
            floes,
            edges: Vec::new(),
            solved: HashMap::new(),
        }
    }

    /// Add an edge carrying the contacts between floes `first` and `second`.
    ///
    /// Every contact id is registered in the solved ledger as solved; the
    /// scheduler downgrades ids it gives up on at the end of the episode.
    /// Edges with an empty contact list are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError::UnknownFloe`] when an endpoint index is
    /// outside the graph.
    pub fn add_edge(
        &mut self,
        first: usize,
        second: usize,
        contacts: Vec<ContactPoint>,
    ) -> Result<(), CollisionError> {
        for index in [first, second] {
            if index >= self.floes.len() {
                return Err(CollisionError::UnknownFloe {
                    index,
                    num_floes: self.floes.len(),
                });
            }
        }
        if contacts.is_empty() {
            return Ok(());
        }
        for contact in &contacts {
            self.solved.insert(contact.id, true);
        }
        self.edges.push(ContactEdge {
            first,
            second,
            contacts,
        });
        Ok(())
    }

    /// All floes, indexed by vertex id.
    #[must_use]
    pub fn floes(&self) -> &[Floe] {
        &self.floes
    }

    /// Mutable floe access (scheduler write-back).
    pub(crate) fn floes_mut(&mut self) -> &mut [Floe] {
        &mut self.floes
    }

    /// All edges.
    #[must_use]
    pub fn edges(&self) -> &[ContactEdge] {
        &self.edges
    }

    /// Number of floes (vertices).
    #[must_use]
    pub fn num_floes(&self) -> usize {
        self.floes.len()
    }

    /// Total number of contacts across all edges.
    #[must_use]
    pub fn num_contacts(&self) -> usize {
        self.edges.iter().map(|e| e.contacts.len()).sum()
    }

    /// Solved flag for a contact id. Contacts unknown to this graph report
    /// as unsolved.
    #[must_use]
    pub fn is_solved(&self, id: ContactId) -> bool {
        self.solved.get(&id).copied().unwrap_or(false)
    }

    pub(crate) fn set_solved(&mut self, id: ContactId, solved: bool) {
        self.solved.insert(id, solved);
    }

    pub(crate) fn contact(&self, slot: (usize, usize)) -> &ContactPoint {
        &self.edges[slot.0].contacts[slot.1]
    }

    pub(crate) fn edge_endpoints(&self, edge: usize) -> (usize, usize) {
        let e = &self.edges[edge];
        (e.first, e.second)
    }

    /// Connected components of the whole graph.
    ///
    /// Floes without any incident edge form no component. Components are
    /// returned ordered by their lowest vertex index.
    #[must_use]
    pub fn collision_subgraphs(&self) -> Vec<SubGraph> {
        let all: Vec<usize> = (0..self.edges.len()).collect();
        self.components_from_edges(&all)
    }

    /// Active subgraphs of `parent`: connected components among its edges
    /// where at least one contact has negative normal relative velocity,
    /// evaluated with the graph's own floe velocities.
    #[must_use]
    pub fn active_subgraphs(&self, parent: &SubGraph) -> Vec<SubGraph> {
        let lookup = |v: usize| (self.floes[v].velocity, self.floes[v].angular_velocity);
        self.active_subgraphs_with(parent, &lookup)
    }

    /// Like [`Self::active_subgraphs`], but with an explicit velocity
    /// lookup (the scheduler works on per-component floe snapshots).
    pub(crate) fn active_subgraphs_with(
        &self,
        parent: &SubGraph,
        velocities: VelocityLookup<'_>,
    ) -> Vec<SubGraph> {
        let active: Vec<usize> = parent
            .edges
            .iter()
            .copied()
            .filter(|&e| self.edge_is_active(e, velocities))
            .collect();
        self.components_from_edges(&active)
    }

    /// Split the contact set of `sub` into up to four quadrants around the
    /// centroid of its contact points.
    ///
    /// Each non-empty quadrant becomes an independent sub-problem; the outer
    /// scheduling loop re-couples them through activity recomputation.
    #[must_use]
    pub fn quad_cut(&self, sub: &SubGraph) -> Vec<SubProblem> {
        let slots: Vec<(usize, usize)> = sub
            .edges
            .iter()
            .flat_map(|&e| (0..self.edges[e].contacts.len()).map(move |s| (e, s)))
            .collect();
        if slots.is_empty() {
            return Vec::new();
        }

        let mut centroid = Vector2::zeros();
        for &slot in &slots {
            centroid += self.contact(slot).point.coords;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            centroid /= slots.len() as f64;
        }

        let mut buckets: [Vec<(usize, usize)>; 4] = Default::default();
        for &slot in &slots {
            let p = self.contact(slot).point;
            let quadrant = usize::from(p.x >= centroid.x) + 2 * usize::from(p.y >= centroid.y);
            buckets[quadrant].push(slot);
        }

        buckets
            .into_iter()
            .filter(|b| !b.is_empty())
            .map(|contacts| self.problem_from_slots(contacts))
            .collect()
    }

    /// Normal relative velocity of one contact: negative when the floes are
    /// approaching at the contact point.
    pub(crate) fn contact_normal_velocity(
        &self,
        edge: usize,
        slot: usize,
        velocities: VelocityLookup<'_>,
    ) -> f64 {
        let e = &self.edges[edge];
        let c = &e.contacts[slot];
        let (va, wa) = velocities(e.first);
        let (vb, wb) = velocities(e.second);
        let ra = c.point - self.floes[e.first].position;
        let rb = c.point - self.floes[e.second].position;
        let point_va = va + wa * Vector2::new(-ra.y, ra.x);
        let point_vb = vb + wb * Vector2::new(-rb.y, rb.x);
        (point_vb - point_va).dot(&c.normal)
    }

    fn edge_is_active(&self, edge: usize, velocities: VelocityLookup<'_>) -> bool {
        (0..self.edges[edge].contacts.len())
            .any(|s| self.contact_normal_velocity(edge, s, velocities) < 0.0)
    }

    fn problem_from_slots(&self, contacts: Vec<(usize, usize)>) -> SubProblem {
        let mut vertices: Vec<usize> = Vec::new();
        for &(e, _) in &contacts {
            let edge = &self.edges[e];
            for v in [edge.first, edge.second] {
                if let Err(pos) = vertices.binary_search(&v) {
                    vertices.insert(pos, v);
                }
            }
        }
        SubProblem { vertices, contacts }
    }

    /// Connected components among a set of edge indices, via union-find.
    fn components_from_edges(&self, edge_indices: &[usize]) -> Vec<SubGraph> {
        if edge_indices.is_empty() {
            return Vec::new();
        }

        let mut uf = UnionFind::new(self.floes.len());
        for &e in edge_indices {
            uf.union(self.edges[e].first, self.edges[e].second);
        }

        // Group edges by component root; map roots to components in order
        // of first appearance when scanning vertices ascending, so the
        // result is ordered by lowest vertex index.
        let mut root_to_component: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<SubGraph> = Vec::new();

        let mut touched: Vec<usize> = edge_indices
            .iter()
            .flat_map(|&e| [self.edges[e].first, self.edges[e].second])
            .collect();
        touched.sort_unstable();
        touched.dedup();

        for &v in &touched {
            let root = uf.find(v);
            let idx = *root_to_component.entry(root).or_insert_with(|| {
                components.push(SubGraph {
                    vertices: Vec::new(),
                    edges: Vec::new(),
                    num_contacts: 0,
                });
                components.len() - 1
            });
            components[idx].vertices.push(v);
        }

        for &e in edge_indices {
            let root = uf.find(self.edges[e].first);
            if let Some(&idx) = root_to_component.get(&root) {
                components[idx].edges.push(e);
                components[idx].num_contacts += self.edges[e].contacts.len();
            }
        }

        components
    }
}

/// A connected component of the contact graph (or of its active part).
#[derive(Debug, Clone, PartialEq)]
pub struct SubGraph {
    /// Vertex (floe) indices, ascending.
    vertices: Vec<usize>,
    /// Edge indices into the parent graph, ascending.
    edges: Vec<usize>,
    /// Total contacts across the edges.
    num_contacts: usize,
}

impl SubGraph {
    /// Floe indices of this subgraph, ascending.
    #[must_use]
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    /// Edge indices of this subgraph.
    #[must_use]
    pub fn edges(&self) -> &[usize] {
        &self.edges
    }

    /// Number of contacts carried by the subgraph's edges.
    #[must_use]
    pub fn num_contacts(&self) -> usize {
        self.num_contacts
    }

    /// Expand into the explicit contact list the LCP builder consumes,
    /// in edge-then-list order.
    #[must_use]
    pub fn to_problem(&self, graph: &ContactGraph) -> SubProblem {
        let contacts: Vec<(usize, usize)> = self
            .edges
            .iter()
            .flat_map(|&e| (0..graph.edges()[e].contacts.len()).map(move |s| (e, s)))
            .collect();
        SubProblem {
            vertices: self.vertices.clone(),
            contacts,
        }
    }
}

/// An explicit set of contacts to resolve as one LCP.
///
/// Either a whole subgraph, or one quadrant of an oversized one. Unlike a
/// [`SubGraph`] it is not necessarily connected.
#[derive(Debug, Clone, PartialEq)]
pub struct SubProblem {
    vertices: Vec<usize>,
    contacts: Vec<(usize, usize)>,
}

impl SubProblem {
    /// Floe indices touched by the contacts, ascending.
    #[must_use]
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    /// Number of contacts in the problem.
    #[must_use]
    pub fn num_contacts(&self) -> usize {
        self.contacts.len()
    }

    /// `(edge, slot)` contact references, in edge-then-list order.
    pub(crate) fn contacts(&self) -> &[(usize, usize)] {
        &self.contacts
    }
}

/// Union-find over floe indices, with path compression and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}
