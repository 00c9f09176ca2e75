#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]

//! # byteflow
//!
//! A framework for value-flow analysis and structural pattern matching over JVM
//! bytecode methods. `byteflow` reasons about the runtime values and control
//! flow of compiled methods and searches for structural code patterns ("a value
//! obtained from a `New` flows into a constructor call before a field store")
//! expressed over instruction sequences and dataflow-derived value identities.
//!
//! ## Features
//!
//! - **Generic graph library** - Arena-backed directed graphs with depth-first
//!   search, edge classification, strongly connected components, and dominators
//! - **Value numbering** - Forward fixpoint dataflow assigning canonical
//!   identities to the values computed at every program point, with redundant
//!   load elimination and forward substitution
//! - **Pattern matching** - Declarative instruction patterns executed as a
//!   nondeterministic search over control-flow paths, binding matched values
//!   to named variables
//! - **Caller-side parallelism** - Independent per-method analysis units that
//!   fan out across a thread pool
//!
//! ## Quick Start
//!
//! Callers assemble a [`cfg::ControlFlowGraph`] from decoded instructions
//! (class-file decoding lives outside this crate), then run the analyses:
//!
//! ```rust
//! use byteflow::bytecode::{Instruction, MethodDesc, Opcode};
//! use byteflow::cfg::{BasicBlock, ControlFlowGraph};
//! use byteflow::vna::ValueNumberAnalysis;
//!
//! let mut cfg = ControlFlowGraph::new();
//! cfg.add_block(BasicBlock::new(vec![
//!     Instruction::load(0, false),
//!     Instruction::store(1, false),
//!     Instruction::simple(Opcode::Return),
//! ]));
//! cfg.seal();
//!
//! let method = MethodDesc::new("Acme", "copy", "()V", true, 2);
//! let mut analysis = ValueNumberAnalysis::new(&cfg, &method);
//! analysis.execute()?;
//!
//! // The copied local carries the same value identity as the source
//! let block = cfg.entry();
//! let exit = analysis.result_fact(block);
//! assert_eq!(exit.local(0)?, exit.local(1)?);
//! # Ok::<(), byteflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `byteflow` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`graph`] - Generic directed graphs and the algorithms over them
//! - [`bytecode`] - The decoded-instruction contract the engine consumes
//! - [`cfg`] - Control flow graphs over basic blocks
//! - [`vna`] - The value numbering dataflow analysis
//! - [`pattern`] - The bytecode pattern matching engine
//! - [`hierarchy`] - Frozen class-hierarchy snapshots for subtype queries
//! - [`engine`] - Per-method analysis units and the parallel batch driver
//! - [`Error`] and [`Result`] - Error handling
//!
//! Data flows one direction: a control flow graph feeds the value numbering
//! analysis, whose per-location frames feed the pattern matcher, whose
//! matches feed the caller's detectors.
//!
//! ## Error Handling
//!
//! Fatal errors are reserved for internal-consistency faults (a
//! value-numbering cache that would return different outputs for identical
//! inputs, stack accounting violations); they abort the analysis of the
//! current method only. Unresolvable symbols degrade precision and are
//! reported through [`hierarchy::LookupFailureCallback`]; unreachable-code
//! queries and empty match results are normal outcomes, not errors.

#[macro_use]
pub(crate) mod error;

pub mod prelude;

/// Generic directed-graph library.
///
/// Arena-backed graphs with dense integer labels, plus the traversal and
/// decomposition algorithms the rest of the crate builds on: timestamped
/// depth-first search with tree/back/forward/cross edge classification,
/// two-pass strongly-connected-component decomposition, and dominator
/// computation.
pub mod graph;

/// Decoded-instruction model.
///
/// The narrow contract through which bytecode reaches the engine: a closed
/// opcode set with declared stack effects, instructions with typed operands,
/// and symbolic field/method references.
pub mod bytecode;

/// Control flow graph contract.
///
/// Basic blocks connected by typed edges, with back-edge classification
/// computed by the graph library's depth-first search.
pub mod cfg;

/// Value numbering dataflow analysis.
///
/// Forward fixpoint iteration assigning canonical value identities at every
/// program point, including redundant load elimination and forward
/// substitution for object and class fields.
pub mod vna;

/// Bytecode pattern matching engine.
///
/// Declarative instruction patterns executed as nondeterministic search over
/// control-flow paths, producing variable bindings tied to value identities.
pub mod pattern;

/// Class-hierarchy snapshots and symbol-resolution reporting.
pub mod hierarchy;

/// Per-method analysis units and the parallel batch driver.
pub mod engine;

/// `byteflow` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`]. Used consistently throughout the crate for all fallible
/// operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `byteflow` Error type
///
/// The main error type for all operations in this crate. Fatal errors are
/// internal-consistency faults that abort the current method's analysis;
/// everything else is handled in-band.
pub use error::Error;
