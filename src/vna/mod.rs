//! Value numbering dataflow analysis.
//!
//! Assigns canonical identities ([`ValueNumber`]) to the values computed and
//! loaded at every program point of a method, by forward fixpoint iteration
//! over its control flow graph. Equal value numbers within one run denote
//! provably identical runtime values; the pattern matcher builds its
//! variable bindings on top of this identity.
//!
//! # Key Types
//!
//! - [`ValueNumber`] / [`ValueFlags`] - Per-run value identities with
//!   provenance hints
//! - [`ValueNumberFactory`] - Per-run allocator, exclusively owned
//! - [`ValueNumberCache`] - (instruction, inputs) → outputs memoization;
//!   the determinism contract the fixpoint depends on
//! - [`ValueNumberFrame`] - The stack/locals lattice element, including the
//!   available-load map for redundant load elimination
//! - [`MergeTree`] - Phi provenance, with transitive-closure queries
//! - [`ValueNumberAnalysis`] - The worklist fixpoint driver
//!
//! # Soundness note
//!
//! The redundant-load-elimination / forward-substitution heuristic is
//! intentionally approximate: it does not account for every way a call could
//! mutate heap state. It is preserved in that form deliberately — detectors
//! are tuned against its behavior.

mod analysis;
mod cache;
mod factory;
mod frame;
mod merge_tree;
mod transfer;
mod value;

pub use analysis::ValueNumberAnalysis;
pub use cache::{CacheEntry, ValueNumberCache};
pub use factory::ValueNumberFactory;
pub use frame::{AvailableLoad, ValueNumberFrame};
pub use merge_tree::MergeTree;
pub use value::{ValueFlags, ValueNumber};
