//! Depth-first search with edge classification.
//!
//! This module provides the timestamped depth-first search that underpins the
//! rest of the graph library: it classifies every examined edge as tree, back,
//! forward, or cross, records discovery and finish times, and produces a
//! topological sort that is valid if and only if the graph is acyclic.
//! The search is iterative (explicit visit stack), so it is not bounded by
//! host stack depth.
//!
//! # Algorithm
//!
//! The classic three-color scheme (Cormen et al., *Introduction to
//! Algorithms*): white vertices are undiscovered, gray vertices are on the
//! current search path, black vertices are fully explored. An edge to a white
//! vertex is a tree edge; an edge to a gray vertex is a back edge (and
//! implies a cycle); an edge to a black vertex cannot be classified until the
//! sweep completes, after which discovery times disambiguate forward edges
//! (source discovered before target) from cross edges.
//!
//! Both search polarities are supported: a [`Direction::Reverse`] search
//! walks incoming edges, treating each edge's source as its logical target.
//! The two-pass SCC computation relies on this.
//!
//! The [`postorder`] and [`reverse_postorder`] helpers provide the traversal
//! orders used to seed dataflow worklists; they are generic over
//! [`Successors`] so domain graphs can use them directly.

use crate::graph::{DirectedGraph, EdgeId, NodeId, Successors};

const WHITE: u8 = 0;
const GRAY: u8 = 1;
const BLACK: u8 = 2;

/// Classification of an edge by a completed depth-first search.
///
/// After [`DepthFirstSearch::search`] returns, every edge whose source was
/// visited carries exactly one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfsEdgeKind {
    /// Edge to a previously undiscovered vertex; part of the search tree.
    Tree,
    /// Edge to an ancestor on the current search path. Implies a cycle.
    Back,
    /// Edge to a fully explored descendant discovered after the source.
    Forward,
    /// Edge to a fully explored vertex in another subtree or search tree.
    Cross,
}

/// The polarity of a depth-first search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Walk outgoing edges; the logical target of an edge is its target.
    Forward,
    /// Walk incoming edges; the logical target of an edge is its source.
    Reverse,
}

/// Options controlling a depth-first search.
///
/// The defaults give a plain forward search visiting every vertex.
pub struct DfsOptions<'a> {
    /// Search polarity.
    pub direction: Direction,
    /// Predicate selecting which vertices the search may visit.
    ///
    /// Edges out of visited vertices are still examined and classified even
    /// when their target is not chosen; the target just never becomes a
    /// search tree root or tree child.
    pub chooser: Option<&'a dyn Fn(NodeId) -> bool>,
    /// Order in which to consider vertices as search tree roots.
    ///
    /// When absent, roots are chosen in ascending label order. The two-pass
    /// SCC computation supplies descending finish times here.
    pub root_order: Option<&'a [NodeId]>,
}

impl Default for DfsOptions<'_> {
    fn default() -> Self {
        Self {
            direction: Direction::Forward,
            chooser: None,
            root_order: None,
        }
    }
}

/// Results of a completed depth-first search over a [`DirectedGraph`].
///
/// Records discovery/finish timestamps per vertex, a [`DfsEdgeKind`] per
/// examined edge, the search tree each visited vertex belongs to, and a
/// topological order (valid iff the graph is acyclic).
///
/// # Examples
///
/// ```rust
/// use byteflow::graph::{DirectedGraph, algorithms::{DepthFirstSearch, DfsEdgeKind}};
///
/// let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
/// let a = graph.add_node(());
/// let b = graph.add_node(());
/// let ab = graph.add_edge(a, b, ())?;
/// let ba = graph.add_edge(b, a, ())?;
///
/// let dfs = DepthFirstSearch::search(&graph);
/// assert_eq!(dfs.edge_kind(ab), Some(DfsEdgeKind::Tree));
/// assert_eq!(dfs.edge_kind(ba), Some(DfsEdgeKind::Back));
/// assert!(dfs.contains_cycle());
/// # Ok::<(), byteflow::Error>(())
/// ```
pub struct DepthFirstSearch {
    discovery_time: Vec<usize>,
    finish_time: Vec<usize>,
    color: Vec<u8>,
    edge_kind: Vec<Option<DfsEdgeKind>>,
    search_tree: Vec<Option<usize>>,
    tree_count: usize,
    topological: Vec<NodeId>,
    finish_order: Vec<NodeId>,
}

impl DepthFirstSearch {
    /// Runs a forward depth-first search visiting every vertex.
    #[must_use]
    pub fn search<N, E>(graph: &DirectedGraph<N, E>) -> Self {
        Self::search_with(graph, &DfsOptions::default())
    }

    /// Runs a reverse depth-first search (walking incoming edges) visiting
    /// every vertex.
    #[must_use]
    pub fn search_reverse<N, E>(graph: &DirectedGraph<N, E>) -> Self {
        Self::search_with(
            graph,
            &DfsOptions {
                direction: Direction::Reverse,
                ..DfsOptions::default()
            },
        )
    }

    /// Runs a depth-first search with explicit options.
    ///
    /// # Arguments
    ///
    /// * `graph` - The graph to search
    /// * `options` - Direction, vertex chooser, and root order
    #[must_use]
    pub fn search_with<N, E>(graph: &DirectedGraph<N, E>, options: &DfsOptions<'_>) -> Self {
        let node_bound = graph.node_bound();
        let mut dfs = Self {
            discovery_time: vec![0; node_bound],
            finish_time: vec![0; node_bound],
            color: vec![WHITE; node_bound],
            edge_kind: vec![None; graph.edge_bound()],
            search_tree: vec![None; node_bound],
            tree_count: 0,
            topological: Vec::with_capacity(node_bound),
            finish_order: Vec::with_capacity(node_bound),
        };
        dfs.visit_all(graph, options);
        dfs.classify_unknown_edges(graph, options.direction);
        // Finish times accumulate in ascending order; the topological order
        // is their reverse.
        dfs.topological = dfs.finish_order.iter().rev().copied().collect();
        dfs
    }

    /// Returns the timestamp at which the vertex was discovered.
    #[must_use]
    pub fn discovery_time(&self, node: NodeId) -> usize {
        self.discovery_time[node.index()]
    }

    /// Returns the timestamp at which the vertex was finished (all of its
    /// descendants visited).
    #[must_use]
    pub fn finish_time(&self, node: NodeId) -> usize {
        self.finish_time[node.index()]
    }

    /// Returns `true` if the vertex was visited by the search.
    #[must_use]
    pub fn visited(&self, node: NodeId) -> bool {
        self.color[node.index()] == BLACK
    }

    /// Returns the classification of an edge.
    ///
    /// `None` for edges whose source was never visited (possible only with a
    /// vertex chooser) or for removed edge labels.
    #[must_use]
    pub fn edge_kind(&self, edge: EdgeId) -> Option<DfsEdgeKind> {
        self.edge_kind.get(edge.index()).copied().flatten()
    }

    /// Returns `true` if the search found a cycle, i.e. classified at least
    /// one back edge.
    #[must_use]
    pub fn contains_cycle(&self) -> bool {
        self.edge_kind
            .iter()
            .any(|kind| *kind == Some(DfsEdgeKind::Back))
    }

    /// Returns the index of the search tree the vertex belongs to, or `None`
    /// if it was not visited.
    ///
    /// Trees are numbered in the order their roots were chosen.
    #[must_use]
    pub fn search_tree(&self, node: NodeId) -> Option<usize> {
        self.search_tree[node.index()]
    }

    /// Returns the number of search trees the search produced.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.tree_count
    }

    /// Returns the visited vertices in ascending finish time.
    #[must_use]
    pub fn finish_order(&self) -> &[NodeId] {
        &self.finish_order
    }

    /// Returns the visited vertices in topological sort order.
    ///
    /// The order is a valid topological sort if and only if the graph is
    /// acyclic ([`contains_cycle`](Self::contains_cycle) returns `false`).
    #[must_use]
    pub fn topological_order(&self) -> &[NodeId] {
        &self.topological
    }

    fn visit_me(&self, node: NodeId, options: &DfsOptions<'_>) -> bool {
        self.color[node.index()] == WHITE
            && options.chooser.is_none_or(|chooser| chooser(node))
    }

    fn visit_all<N, E>(&mut self, graph: &DirectedGraph<N, E>, options: &DfsOptions<'_>) {
        let mut timestamp = 0usize;
        let mut root_cursor = 0usize;

        loop {
            let Some(root) = self.next_search_tree_root(graph, options, &mut root_cursor) else {
                break;
            };

            let tree = self.tree_count;
            self.tree_count += 1;

            let mut stack: Vec<Visit> = Vec::new();
            self.enter(graph, root, tree, &mut timestamp, options.direction, &mut stack);

            while let Some(visit) = stack.last_mut() {
                if visit.cursor < visit.edges.len() {
                    let edge = visit.edges[visit.cursor];
                    visit.cursor += 1;

                    let target = logical_target(graph, edge, options.direction);
                    // Forward vs cross cannot be told apart yet; those edges
                    // stay unclassified until the sweep completes.
                    self.edge_kind[edge.index()] = match self.color[target.index()] {
                        WHITE => Some(DfsEdgeKind::Tree),
                        GRAY => Some(DfsEdgeKind::Back),
                        _ => None,
                    };

                    if self.visit_me(target, options) {
                        self.enter(graph, target, tree, &mut timestamp, options.direction, &mut stack);
                    }
                } else {
                    // All edges examined: finish the vertex
                    let node = visit.node;
                    stack.pop();
                    self.color[node.index()] = BLACK;
                    self.finish_time[node.index()] = timestamp;
                    timestamp += 1;
                    self.finish_order.push(node);
                }
            }
        }
    }

    fn enter<N, E>(
        &mut self,
        graph: &DirectedGraph<N, E>,
        node: NodeId,
        tree: usize,
        timestamp: &mut usize,
        direction: Direction,
        stack: &mut Vec<Visit>,
    ) {
        self.color[node.index()] = GRAY;
        self.discovery_time[node.index()] = *timestamp;
        *timestamp += 1;
        self.search_tree[node.index()] = Some(tree);

        let edges: Vec<EdgeId> = match direction {
            Direction::Forward => graph.out_edges(node).collect(),
            Direction::Reverse => graph.in_edges(node).collect(),
        };
        stack.push(Visit {
            node,
            edges,
            cursor: 0,
        });
    }

    fn next_search_tree_root<N, E>(
        &self,
        graph: &DirectedGraph<N, E>,
        options: &DfsOptions<'_>,
        cursor: &mut usize,
    ) -> Option<NodeId> {
        match options.root_order {
            Some(order) => {
                while *cursor < order.len() {
                    let node = order[*cursor];
                    *cursor += 1;
                    if graph.contains_node(node) && self.visit_me(node, options) {
                        return Some(node);
                    }
                }
                None
            }
            None => {
                while *cursor < graph.node_bound() {
                    let node = NodeId::new(*cursor);
                    *cursor += 1;
                    if graph.contains_node(node) && self.visit_me(node, options) {
                        return Some(node);
                    }
                }
                None
            }
        }
    }

    // Disambiguate edges that pointed at black vertices during the sweep:
    // source discovered before target means forward, otherwise cross.
    fn classify_unknown_edges<N, E>(&mut self, graph: &DirectedGraph<N, E>, direction: Direction) {
        for edge in graph.edges() {
            if self.edge_kind[edge.index()].is_some() {
                continue;
            }
            let source = logical_source(graph, edge, direction);
            if self.color[source.index()] == WHITE {
                // Source never visited; leave unclassified
                continue;
            }
            let target = logical_target(graph, edge, direction);
            let kind = if self.discovery_time[source.index()] < self.discovery_time[target.index()]
            {
                DfsEdgeKind::Forward
            } else {
                DfsEdgeKind::Cross
            };
            self.edge_kind[edge.index()] = Some(kind);
        }
    }
}

/// One in-progress vertex visit on the explicit search stack.
struct Visit {
    node: NodeId,
    edges: Vec<EdgeId>,
    cursor: usize,
}

fn logical_target<N, E>(
    graph: &DirectedGraph<N, E>,
    edge: EdgeId,
    direction: Direction,
) -> NodeId {
    let (source, target) = graph
        .edge_endpoints(edge)
        .unwrap_or((NodeId::new(0), NodeId::new(0)));
    match direction {
        Direction::Forward => target,
        Direction::Reverse => source,
    }
}

fn logical_source<N, E>(
    graph: &DirectedGraph<N, E>,
    edge: EdgeId,
    direction: Direction,
) -> NodeId {
    let (source, target) = graph
        .edge_endpoints(edge)
        .unwrap_or((NodeId::new(0), NodeId::new(0)));
    match direction {
        Direction::Forward => source,
        Direction::Reverse => target,
    }
}

/// Computes the postorder traversal of nodes reachable from the start.
///
/// In postorder, a node appears after all its tree descendants. This is the
/// building block for the reverse postorder used to seed forward dataflow
/// worklists.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The starting node
///
/// # Returns
///
/// A vector of `NodeId` in postorder; empty if `start` is out of range.
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_bound = graph.node_bound();
    if start.index() >= node_bound {
        return Vec::new();
    }

    let mut visited = vec![false; node_bound];
    let mut result = Vec::with_capacity(node_bound);
    let mut stack: Vec<(NodeId, bool)> = vec![(start, false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            result.push(node);
            continue;
        }
        if visited[node.index()] {
            continue;
        }
        visited[node.index()] = true;
        stack.push((node, true));

        // Push children in reverse so they are expanded in order
        let successors: Vec<NodeId> = graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !visited[succ.index()] {
                stack.push((succ, false));
            }
        }
    }

    result
}

/// Computes the reverse postorder of nodes reachable from the start.
///
/// In reverse postorder a node precedes all its tree descendants, which is
/// the preferred iteration order for forward dataflow analysis: by the time a
/// node is processed, all of its non-back-edge predecessors already have been.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}
