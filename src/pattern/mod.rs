//! Bytecode pattern matching.
//!
//! A declarative [`ByteCodePattern`] describes a structural code shape — "a
//! value obtained from a `New` flows into a constructor call before a field
//! store" — as a chain of [`PatternElement`]s with occurrence windows. The
//! [`PatternMatcher`] searches every control-flow path of a method for
//! instruction sequences satisfying the pattern, binding recognized values
//! to named variables whose identities come from the value numbering
//! analysis.
//!
//! # Key Types
//!
//! - [`PatternElement`] / [`ElementKind`] - Pattern units over a closed set
//!   of matching behaviors
//! - [`ByteCodePattern`] - The element chain, with wildcard interleaving
//! - [`BindingSet`] / [`Variable`] - Persistent variable bindings with O(1)
//!   fork
//! - [`PatternMatcher`] - The explicit-work-stack search engine
//! - [`ByteCodePatternMatch`] - A completed match: history plus bindings

mod binding;
mod element;
mod matched;
mod matcher;
#[allow(clippy::module_inception)]
mod pattern;

pub use binding::{Binding, BindingIter, BindingSet, Variable};
pub use element::{ClassMatch, ElementKind, InvokeMode, MatchContext, NameMatch, PatternElement};
pub use matched::{ByteCodePatternMatch, MatchedInstruction, PatternElementMatch};
pub use matcher::PatternMatcher;
pub use pattern::ByteCodePattern;
