//! Control flow graph contract.
//!
//! The [`ControlFlowGraph`] is the structure the analysis engine consumes:
//! basic blocks connected by typed edges, with a designated entry block and
//! per-edge back-edge classification computed by the graph library's
//! depth-first search. Building blocks from raw class-file bytes is the
//! caller's concern; this module only assembles and exposes the result.
//!
//! # Construction
//!
//! Blocks and edges are added incrementally, then [`ControlFlowGraph::seal`]
//! runs the depth-first search that classifies back edges and fixes the
//! traversal orders. Sealing is required before the CFG is handed to the
//! value numbering analysis or the pattern matcher.
//!
//! ```rust
//! use byteflow::bytecode::{Instruction, Opcode};
//! use byteflow::cfg::{BasicBlock, CfgEdgeKind, ControlFlowGraph};
//!
//! let mut cfg = ControlFlowGraph::new();
//! let entry = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Nop)]));
//! let exit = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Return)]));
//! cfg.add_edge(entry, exit, CfgEdgeKind::FallThrough)?;
//! cfg.seal();
//! assert_eq!(cfg.entry(), entry);
//! # Ok::<(), byteflow::Error>(())
//! ```

mod block;
mod edge;

pub use block::{BasicBlock, BlockId, Location};
pub use edge::CfgEdgeKind;

use crate::{
    bytecode::Instruction,
    graph::{
        algorithms::{DepthFirstSearch, DfsEdgeKind},
        DirectedGraph, EdgeId, NodeId, Predecessors, Successors,
    },
    Result,
};

/// A control flow graph over basic blocks.
///
/// Wraps a [`DirectedGraph`] whose node data are [`BasicBlock`]s and whose
/// edge data are [`CfgEdgeKind`]s. Block labels coincide with node labels.
/// The first block added is the entry block.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    graph: DirectedGraph<BasicBlock, CfgEdgeKind>,
    /// Back-edge classification per edge label; filled in by [`seal`](Self::seal).
    back_edge: Vec<bool>,
    sealed: bool,
}

impl Default for ControlFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlFlowGraph {
    /// Creates an empty control flow graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DirectedGraph::new(),
            back_edge: Vec::new(),
            sealed: false,
        }
    }

    /// Adds a basic block and returns its label.
    ///
    /// The first block added becomes the entry block.
    pub fn add_block(&mut self, block: BasicBlock) -> BlockId {
        self.sealed = false;
        BlockId(self.graph.add_node(block).index())
    }

    /// Adds a control flow edge between two blocks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidNode`] if either block label is not
    /// live.
    pub fn add_edge(&mut self, source: BlockId, target: BlockId, kind: CfgEdgeKind) -> Result<EdgeId> {
        self.sealed = false;
        self.graph
            .add_edge(NodeId::new(source.0), NodeId::new(target.0), kind)
    }

    /// Classifies back edges and finalizes the graph for analysis.
    ///
    /// Runs the graph library's depth-first search from the entry block; an
    /// edge is a back edge exactly when the search classifies it as one.
    /// Must be called after construction and before the CFG is consumed by
    /// an analysis.
    pub fn seal(&mut self) {
        let dfs = DepthFirstSearch::search(&self.graph);
        self.back_edge = (0..self.graph.edge_bound())
            .map(|i| dfs.edge_kind(EdgeId::new(i)) == Some(DfsEdgeKind::Back))
            .collect();
        self.sealed = true;
    }

    /// Returns `true` once [`seal`](Self::seal) has run on the current shape.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Returns the entry block.
    ///
    /// The entry is the first block added; an empty graph has no entry and
    /// this returns block 0, which then fails lookups.
    #[must_use]
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns an exclusive upper bound on block labels.
    #[must_use]
    pub fn block_bound(&self) -> usize {
        self.graph.node_bound()
    }

    /// Returns the block with the given label, if it exists.
    #[must_use]
    pub fn block(&self, block: BlockId) -> Option<&BasicBlock> {
        self.graph.node(NodeId::new(block.0))
    }

    /// Returns an iterator over all block labels.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.graph.nodes().map(|node| BlockId(node.index()))
    }

    /// Returns the instruction at a location, if it exists.
    #[must_use]
    pub fn instruction(&self, location: Location) -> Option<&Instruction> {
        self.block(location.block)
            .and_then(|block| block.instructions().get(location.index))
    }

    /// Returns an iterator over the successor blocks of a block.
    pub fn successors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.graph
            .successors(NodeId::new(block.0))
            .map(|node| BlockId(node.index()))
    }

    /// Returns an iterator over the predecessor blocks of a block.
    pub fn predecessors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.graph
            .predecessors(NodeId::new(block.0))
            .map(|node| BlockId(node.index()))
    }

    /// Returns an iterator over a block's outgoing edges as
    /// `(edge, target, kind)` triples.
    pub fn out_edges(&self, block: BlockId) -> impl Iterator<Item = (EdgeId, BlockId, &CfgEdgeKind)> {
        self.graph.out_edges(NodeId::new(block.0)).filter_map(|edge| {
            let target = self.graph.edge_target(edge)?;
            let kind = self.graph.edge(edge)?;
            Some((edge, BlockId(target.index()), kind))
        })
    }

    /// Returns an iterator over a block's incoming edges as
    /// `(edge, source, kind)` triples.
    pub fn in_edges(&self, block: BlockId) -> impl Iterator<Item = (EdgeId, BlockId, &CfgEdgeKind)> {
        self.graph.in_edges(NodeId::new(block.0)).filter_map(|edge| {
            let source = self.graph.edge_source(edge)?;
            let kind = self.graph.edge(edge)?;
            Some((edge, BlockId(source.index()), kind))
        })
    }

    /// Returns `true` if the edge was classified as a back edge.
    ///
    /// Only meaningful after [`seal`](Self::seal); unclassified edges are
    /// not back edges.
    #[must_use]
    pub fn is_back_edge(&self, edge: EdgeId) -> bool {
        self.back_edge.get(edge.index()).copied().unwrap_or(false)
    }

    /// Returns the underlying directed graph.
    ///
    /// Exposed so graph algorithms (dominators in particular) can run over
    /// the block structure directly.
    #[must_use]
    pub fn graph(&self) -> &DirectedGraph<BasicBlock, CfgEdgeKind> {
        &self.graph
    }
}

impl Successors for ControlFlowGraph {
    fn node_bound(&self) -> usize {
        self.graph.node_bound()
    }

    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.successors(node)
    }
}

impl Predecessors for ControlFlowGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.predecessors(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Opcode;

    fn nop_block() -> BasicBlock {
        BasicBlock::new(vec![Instruction::simple(Opcode::Nop)])
    }

    #[test]
    fn test_cfg_entry_is_first_block() {
        let mut cfg = ControlFlowGraph::new();
        let first = cfg.add_block(nop_block());
        let _second = cfg.add_block(nop_block());
        assert_eq!(cfg.entry(), first);
    }

    #[test]
    fn test_cfg_adjacency() {
        let mut cfg = ControlFlowGraph::new();
        let a = cfg.add_block(nop_block());
        let b = cfg.add_block(nop_block());
        let c = cfg.add_block(nop_block());
        cfg.add_edge(a, b, CfgEdgeKind::Branch).unwrap();
        cfg.add_edge(a, c, CfgEdgeKind::FallThrough).unwrap();

        let succ: Vec<BlockId> = cfg.successors(a).collect();
        assert_eq!(succ, vec![b, c]);

        let pred: Vec<BlockId> = cfg.predecessors(b).collect();
        assert_eq!(pred, vec![a]);
    }

    #[test]
    fn test_cfg_back_edge_classification() {
        let mut cfg = ControlFlowGraph::new();
        let head = cfg.add_block(nop_block());
        let body = cfg.add_block(nop_block());
        let forward = cfg.add_edge(head, body, CfgEdgeKind::FallThrough).unwrap();
        let back = cfg.add_edge(body, head, CfgEdgeKind::Branch).unwrap();
        cfg.seal();

        assert!(!cfg.is_back_edge(forward));
        assert!(cfg.is_back_edge(back));
    }

    #[test]
    fn test_cfg_instruction_lookup() {
        let mut cfg = ControlFlowGraph::new();
        let block = cfg.add_block(BasicBlock::new(vec![
            Instruction::simple(Opcode::Nop),
            Instruction::simple(Opcode::Return),
        ]));

        let instruction = cfg.instruction(Location::new(block, 1)).unwrap();
        assert_eq!(instruction.opcode(), Opcode::Return);
        assert!(cfg.instruction(Location::new(block, 2)).is_none());
    }

    #[test]
    fn test_cfg_sealed_flag() {
        let mut cfg = ControlFlowGraph::new();
        let a = cfg.add_block(nop_block());
        assert!(!cfg.is_sealed());
        cfg.seal();
        assert!(cfg.is_sealed());

        // Mutation invalidates the seal
        let b = cfg.add_block(nop_block());
        assert!(!cfg.is_sealed());
        cfg.add_edge(a, b, CfgEdgeKind::FallThrough).unwrap();
        cfg.seal();
        assert!(cfg.is_sealed());
    }
}
