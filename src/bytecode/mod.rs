//! Decoded-instruction model.
//!
//! The narrow contract through which bytecode reaches the analysis engine:
//! a closed [`Opcode`] set with declared stack effects, [`Instruction`]s
//! carrying typed operands, symbolic [`FieldRef`]/[`MethodRef`] references,
//! and the [`MethodDesc`] of the method under analysis. Decoding raw
//! class-file bytes into these types is the caller's concern.
//!
//! # Key Types
//!
//! - [`Opcode`] - Closed operation set, exhaustively matchable
//! - [`Instruction`] - Opcode plus operand, with resolved stack word counts
//! - [`FieldRef`] / [`MethodRef`] - Symbolic references with the access
//!   flags and signature arity the analysis consults
//! - [`MethodDesc`] - Entry-frame setup data for one method

mod instruction;
mod method;
mod opcode;

pub use instruction::{Constant, FieldRef, Instruction, MethodRef, Operand};
pub use method::{argument_words, return_words, MethodDesc};
pub use opcode::{Opcode, StackEffect};
