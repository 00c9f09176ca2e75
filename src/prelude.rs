//! # byteflow Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! from the byteflow library. Import this module to get quick access to the
//! essential types for bytecode value-flow analysis and pattern matching.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all byteflow operations
pub use crate::Error;

/// The result type used throughout byteflow
pub use crate::Result;

// ================================================================================================
// Bytecode Model
// ================================================================================================

/// Decoded instruction with opcode and operand
pub use crate::bytecode::{Constant, FieldRef, Instruction, MethodDesc, MethodRef, Opcode};

// ================================================================================================
// Control Flow
// ================================================================================================

/// Control flow graph building blocks
pub use crate::cfg::{BasicBlock, BlockId, CfgEdgeKind, ControlFlowGraph, Location};

/// Graph labels and the algorithms over block structure
pub use crate::graph::{
    algorithms::{strongly_connected_components, DepthFirstSearch, DfsEdgeKind, DominatorTree},
    DirectedGraph, EdgeId, NodeId,
};

// ================================================================================================
// Value Numbering
// ================================================================================================

/// The value numbering analysis and its result types
pub use crate::vna::{
    AvailableLoad, MergeTree, ValueFlags, ValueNumber, ValueNumberAnalysis, ValueNumberFrame,
};

// ================================================================================================
// Pattern Matching
// ================================================================================================

/// Pattern construction and execution
pub use crate::pattern::{
    BindingSet, ByteCodePattern, ByteCodePatternMatch, InvokeMode, PatternElement, PatternMatcher,
    Variable,
};

// ================================================================================================
// Driver
// ================================================================================================

/// Batch analysis units and helpers
pub use crate::engine::{analyze_methods, execute_pattern, MethodUnit};

/// Class hierarchy snapshot for subtype pattern predicates
pub use crate::hierarchy::{ClassHierarchy, LookupFailureCallback};
