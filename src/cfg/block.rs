//! Basic blocks and program-point locations.

use std::fmt;

use crate::bytecode::Instruction;

/// A strongly-typed label for basic blocks within a control flow graph.
///
/// Block labels are dense integers assigned in insertion order and coincide
/// with the node labels of the underlying graph.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Creates a new `BlockId` from a raw index value.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        BlockId(index)
    }

    /// Returns the raw index value of this block label.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A program point: one instruction position within one basic block.
///
/// Locations key the per-instruction dataflow facts ("frame before" and
/// "frame after") and identify instructions in pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// The containing block.
    pub block: BlockId,
    /// The instruction index within the block, in program order.
    pub index: usize,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub const fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.index)
    }
}

/// A basic block: a maximal straight-line instruction sequence.
///
/// Blocks are assembled by the caller (decoding and block splitting stay
/// outside the engine) and are immutable once added to a
/// [`ControlFlowGraph`](crate::cfg::ControlFlowGraph).
#[derive(Debug, Clone)]
pub struct BasicBlock {
    instructions: Vec<Instruction>,
    exception_handler: bool,
}

impl BasicBlock {
    /// Creates a basic block from its instructions.
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            exception_handler: false,
        }
    }

    /// Creates a basic block that is the entry of an exception handler.
    ///
    /// Dataflow facts merged into a handler block replace the operand stack
    /// with a single caught-exception value.
    #[must_use]
    pub fn handler(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            exception_handler: true,
        }
    }

    /// Returns the block's instructions in program order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns the number of instructions in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the block contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns `true` if this block is an exception handler entry.
    #[must_use]
    pub const fn is_exception_handler(&self) -> bool {
        self.exception_handler
    }
}
