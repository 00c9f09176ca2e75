//! Graph algorithms for program analysis.
//!
//! Algorithms built on the graph library's adjacency structure:
//!
//! - [`DepthFirstSearch`] - Timestamped DFS with tree/back/forward/cross
//!   edge classification, forward and reverse polarity
//! - [`strongly_connected_components`] - Two-pass SCC decomposition over the
//!   transpose
//! - [`DominatorTree`] - Dominance facts for rooted graphs
//! - [`postorder`] / [`reverse_postorder`] - Traversal orders for dataflow
//!   worklists

mod dominators;
mod scc;
mod traversal;

pub use dominators::DominatorTree;
pub use scc::strongly_connected_components;
pub use traversal::{
    postorder, reverse_postorder, DepthFirstSearch, DfsEdgeKind, DfsOptions, Direction,
};
