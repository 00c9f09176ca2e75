//! Strongly connected components via the two-pass algorithm.
//!
//! This module computes the strongly connected components of a directed
//! graph with the classic two-pass (Kosaraju) algorithm:
//!
//! 1. Depth-first search the graph, recording the finish order of vertices.
//! 2. Depth-first search the transpose graph, choosing search tree roots in
//!    descending finish time from pass 1.
//!
//! Each search tree of pass 2, mapped back to the original graph's vertices,
//! is exactly one strongly connected component. Because the arena transpose
//! preserves vertex labels, the mapping back is the identity.
//!
//! The order of components in the output is unspecified beyond "one search
//! tree per SCC".

use crate::graph::{
    algorithms::traversal::{DepthFirstSearch, DfsOptions, Direction},
    DirectedGraph, NodeId,
};

/// Computes the strongly connected components of a directed graph.
///
/// Two vertices end up in the same component if and only if each is
/// reachable from the other.
///
/// # Arguments
///
/// * `graph` - The directed graph to decompose
///
/// # Returns
///
/// A vector of components, each a vector of `NodeId`s from the original
/// graph. Every live vertex appears in exactly one component.
///
/// # Complexity
///
/// - Time: O(V + E) (two depth-first searches plus the transpose)
/// - Space: O(V + E) for the transpose
///
/// # Examples
///
/// ```rust
/// use byteflow::graph::{DirectedGraph, algorithms::strongly_connected_components};
///
/// // Cycle A -> B -> A, plus a tail B -> C
/// let mut graph: DirectedGraph<char, ()> = DirectedGraph::new();
/// let a = graph.add_node('A');
/// let b = graph.add_node('B');
/// let c = graph.add_node('C');
/// graph.add_edge(a, b, ())?;
/// graph.add_edge(b, a, ())?;
/// graph.add_edge(b, c, ())?;
///
/// let sccs = strongly_connected_components(&graph);
/// assert_eq!(sccs.len(), 2);
/// # Ok::<(), byteflow::Error>(())
/// ```
#[must_use]
pub fn strongly_connected_components<N, E>(graph: &DirectedGraph<N, E>) -> Vec<Vec<NodeId>>
where
    N: Clone,
    E: Clone,
{
    if graph.node_count() == 0 {
        return Vec::new();
    }

    // Pass 1: finish order on the original graph
    let first_pass = DepthFirstSearch::search(graph);
    let mut root_order: Vec<NodeId> = first_pass.finish_order().to_vec();
    root_order.reverse();

    // Pass 2: DFS the transpose, roots in descending finish time
    let transposed = graph.transpose();
    let second_pass = DepthFirstSearch::search_with(
        &transposed,
        &DfsOptions {
            direction: Direction::Forward,
            chooser: None,
            root_order: Some(&root_order),
        },
    );

    // Each search tree of the second pass is one component; labels are
    // shared between the transpose and the original graph.
    let mut components: Vec<Vec<NodeId>> = vec![Vec::new(); second_pass.tree_count()];
    for node in graph.nodes() {
        if let Some(tree) = second_pass.search_tree(node) {
            components[tree].push(node);
        }
    }
    components
}
