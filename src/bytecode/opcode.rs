//! The closed set of bytecode operations the engine reasons about.
//!
//! Opcodes carry their declared stack effect in operand words (a `long` or
//! `double` occupies two words, everything else one), matching the frame
//! model used by the value numbering analysis. Operations whose stack effect
//! depends on a symbolic reference (field accesses, invocations) or on an
//! operand (constant pushes, local loads) report [`StackEffect::Operand`]
//! and are resolved by [`Instruction`](crate::bytecode::Instruction).
//!
//! The set is intentionally closed: every instruction-shaped decision in the
//! analysis and the pattern matcher is an exhaustive `match` over this enum.

use strum::{EnumCount, EnumIter};

/// Declared stack consumption or production of an opcode, in operand words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEffect {
    /// A fixed number of words.
    Fixed(u16),
    /// Depends on the instruction's operand (constant width, local width,
    /// field signature, or method signature).
    Operand,
}

/// A bytecode operation.
///
/// The enum is a JVM-flavored selection: local loads and stores are collapsed
/// to a single [`Opcode::Load`]/[`Opcode::Store`] pair whose width rides on
/// the operand, while field access, invocation, object and array operations
/// keep their distinct identities because the analysis and the pattern
/// elements treat them specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum Opcode {
    /// Do nothing.
    Nop,
    /// Push the null reference.
    AconstNull,
    /// Push a constant from the constant pool (width from the operand).
    Ldc,
    /// Load a local variable (width from the operand).
    Load,
    /// Store into a local variable (width from the operand).
    Store,
    /// Increment a local variable in place.
    Iinc,

    // Stack shuffles
    /// Pop one word.
    Pop,
    /// Pop two words.
    Pop2,
    /// Duplicate the top word.
    Dup,
    /// Duplicate the top word beneath the second word.
    DupX1,
    /// Duplicate the top two words.
    Dup2,
    /// Swap the top two words.
    Swap,

    // Arithmetic and logic
    /// Integer add.
    IAdd,
    /// Integer subtract.
    ISub,
    /// Integer multiply.
    IMul,
    /// Integer divide.
    IDiv,
    /// Integer remainder.
    IRem,
    /// Integer negate.
    INeg,
    /// Integer bitwise and.
    IAnd,
    /// Integer bitwise or.
    IOr,
    /// Integer bitwise xor.
    IXor,
    /// Integer shift left.
    IShl,
    /// Integer arithmetic shift right.
    IShr,
    /// Long add.
    LAdd,
    /// Long subtract.
    LSub,
    /// Long multiply.
    LMul,
    /// Long compare.
    LCmp,
    /// Float add.
    FAdd,
    /// Float multiply.
    FMul,
    /// Float compare (NaN yields -1).
    FCmpL,
    /// Double add.
    DAdd,
    /// Double multiply.
    DMul,
    /// Double compare (NaN yields -1).
    DCmpL,

    // Conversions
    /// int to long.
    I2L,
    /// int to float.
    I2F,
    /// int to double.
    I2D,
    /// long to int.
    L2I,
    /// float to int.
    F2I,
    /// double to int.
    D2I,

    // Conditional branches
    /// Branch if int is zero.
    IfEq,
    /// Branch if int is nonzero.
    IfNe,
    /// Branch if int is negative.
    IfLt,
    /// Branch if int is non-negative.
    IfGe,
    /// Branch if int is positive.
    IfGt,
    /// Branch if int is non-positive.
    IfLe,
    /// Branch if two ints are equal.
    IfIcmpEq,
    /// Branch if two ints differ.
    IfIcmpNe,
    /// Branch if first int is less.
    IfIcmpLt,
    /// Branch if first int is not less.
    IfIcmpGe,
    /// Branch if two references are identical.
    IfAcmpEq,
    /// Branch if two references differ.
    IfAcmpNe,
    /// Branch if the reference is null.
    IfNull,
    /// Branch if the reference is not null.
    IfNonNull,
    /// Unconditional branch.
    Goto,
    /// Indexed jump table.
    TableSwitch,
    /// Keyed jump table.
    LookupSwitch,

    // Returns
    /// Return void.
    Return,
    /// Return an int.
    IReturn,
    /// Return a long.
    LReturn,
    /// Return a float.
    FReturn,
    /// Return a double.
    DReturn,
    /// Return a reference.
    AReturn,

    // Field access
    /// Load an instance field.
    GetField,
    /// Store an instance field.
    PutField,
    /// Load a static field.
    GetStatic,
    /// Store a static field.
    PutStatic,

    // Invocations
    /// Invoke a virtual method.
    InvokeVirtual,
    /// Invoke a constructor, private method, or superclass method.
    InvokeSpecial,
    /// Invoke a static method.
    InvokeStatic,
    /// Invoke an interface method.
    InvokeInterface,
    /// Invoke a dynamically bound call site.
    InvokeDynamic,

    // Objects and arrays
    /// Allocate an uninitialized object.
    New,
    /// Allocate a primitive array.
    NewArray,
    /// Allocate a reference array.
    ANewArray,
    /// Push the length of an array.
    ArrayLength,
    /// Load an int from an array.
    IALoad,
    /// Load a long from an array.
    LALoad,
    /// Load a reference from an array.
    AALoad,
    /// Store an int into an array.
    IAStore,
    /// Store a long into an array.
    LAStore,
    /// Store a reference into an array.
    AAStore,
    /// Checked reference cast.
    Checkcast,
    /// Type test.
    InstanceOf,
    /// Throw the reference on top of the stack.
    Athrow,
    /// Acquire a monitor.
    MonitorEnter,
    /// Release a monitor.
    MonitorExit,
}

impl Opcode {
    /// Returns the declared stack consumption of this opcode in words.
    #[must_use]
    pub const fn consumed(self) -> StackEffect {
        use StackEffect::{Fixed, Operand};
        match self {
            Self::Nop
            | Self::AconstNull
            | Self::Ldc
            | Self::Load
            | Self::Iinc
            | Self::Goto
            | Self::Return
            | Self::GetStatic
            | Self::New => Fixed(0),
            Self::Pop
            | Self::Dup
            | Self::INeg
            | Self::I2L
            | Self::I2F
            | Self::I2D
            | Self::F2I
            | Self::IfEq
            | Self::IfNe
            | Self::IfLt
            | Self::IfGe
            | Self::IfGt
            | Self::IfLe
            | Self::IfNull
            | Self::IfNonNull
            | Self::TableSwitch
            | Self::LookupSwitch
            | Self::IReturn
            | Self::FReturn
            | Self::AReturn
            | Self::GetField
            | Self::NewArray
            | Self::ANewArray
            | Self::ArrayLength
            | Self::Checkcast
            | Self::InstanceOf
            | Self::Athrow
            | Self::MonitorEnter
            | Self::MonitorExit => Fixed(1),
            Self::Pop2
            | Self::DupX1
            | Self::Dup2
            | Self::Swap
            | Self::IAdd
            | Self::ISub
            | Self::IMul
            | Self::IDiv
            | Self::IRem
            | Self::IAnd
            | Self::IOr
            | Self::IXor
            | Self::IShl
            | Self::IShr
            | Self::FAdd
            | Self::FMul
            | Self::FCmpL
            | Self::L2I
            | Self::D2I
            | Self::IfIcmpEq
            | Self::IfIcmpNe
            | Self::IfIcmpLt
            | Self::IfIcmpGe
            | Self::IfAcmpEq
            | Self::IfAcmpNe
            | Self::LReturn
            | Self::DReturn
            | Self::IALoad
            | Self::LALoad
            | Self::AALoad => Fixed(2),
            Self::IAStore | Self::AAStore => Fixed(3),
            Self::LAdd
            | Self::LSub
            | Self::LMul
            | Self::LCmp
            | Self::DAdd
            | Self::DMul
            | Self::DCmpL
            | Self::LAStore => Fixed(4),
            Self::Store
            | Self::PutField
            | Self::PutStatic
            | Self::InvokeVirtual
            | Self::InvokeSpecial
            | Self::InvokeStatic
            | Self::InvokeInterface
            | Self::InvokeDynamic => Operand,
        }
    }

    /// Returns the declared stack production of this opcode in words.
    #[must_use]
    pub const fn produced(self) -> StackEffect {
        use StackEffect::{Fixed, Operand};
        match self {
            Self::AconstNull
            | Self::INeg
            | Self::IAdd
            | Self::ISub
            | Self::IMul
            | Self::IDiv
            | Self::IRem
            | Self::IAnd
            | Self::IOr
            | Self::IXor
            | Self::IShl
            | Self::IShr
            | Self::FAdd
            | Self::FMul
            | Self::FCmpL
            | Self::DCmpL
            | Self::LCmp
            | Self::I2F
            | Self::L2I
            | Self::F2I
            | Self::D2I
            | Self::New
            | Self::NewArray
            | Self::ANewArray
            | Self::ArrayLength
            | Self::Checkcast
            | Self::InstanceOf
            | Self::IALoad
            | Self::AALoad => Fixed(1),
            Self::Dup
            | Self::Swap
            | Self::LAdd
            | Self::LSub
            | Self::LMul
            | Self::DAdd
            | Self::DMul
            | Self::I2L
            | Self::I2D
            | Self::LALoad => Fixed(2),
            Self::DupX1 => Fixed(3),
            Self::Dup2 => Fixed(4),
            Self::Ldc
            | Self::Load
            | Self::GetField
            | Self::GetStatic
            | Self::InvokeVirtual
            | Self::InvokeSpecial
            | Self::InvokeStatic
            | Self::InvokeInterface
            | Self::InvokeDynamic => Operand,
            _ => Fixed(0),
        }
    }

    /// Returns `true` for method invocation opcodes.
    #[must_use]
    pub const fn is_invoke(self) -> bool {
        matches!(
            self,
            Self::InvokeVirtual
                | Self::InvokeSpecial
                | Self::InvokeStatic
                | Self::InvokeInterface
                | Self::InvokeDynamic
        )
    }

    /// Returns `true` for field load and store opcodes.
    #[must_use]
    pub const fn is_field_access(self) -> bool {
        matches!(
            self,
            Self::GetField | Self::PutField | Self::GetStatic | Self::PutStatic
        )
    }

    /// Returns `true` for field load opcodes.
    #[must_use]
    pub const fn is_field_load(self) -> bool {
        matches!(self, Self::GetField | Self::GetStatic)
    }

    /// Returns `true` for array element load and store opcodes.
    #[must_use]
    pub const fn is_array_access(self) -> bool {
        matches!(
            self,
            Self::IALoad
                | Self::LALoad
                | Self::AALoad
                | Self::IAStore
                | Self::LAStore
                | Self::AAStore
        )
    }

    /// Returns `true` for conditional branch opcodes.
    #[must_use]
    pub const fn is_conditional_branch(self) -> bool {
        matches!(
            self,
            Self::IfEq
                | Self::IfNe
                | Self::IfLt
                | Self::IfGe
                | Self::IfGt
                | Self::IfLe
                | Self::IfIcmpEq
                | Self::IfIcmpNe
                | Self::IfIcmpLt
                | Self::IfIcmpGe
                | Self::IfAcmpEq
                | Self::IfAcmpNe
                | Self::IfNull
                | Self::IfNonNull
        )
    }

    /// Returns `true` for opcodes that end a basic block.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.is_conditional_branch()
            || matches!(
                self,
                Self::Goto
                    | Self::TableSwitch
                    | Self::LookupSwitch
                    | Self::Return
                    | Self::IReturn
                    | Self::LReturn
                    | Self::FReturn
                    | Self::DReturn
                    | Self::AReturn
                    | Self::Athrow
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_opcode_declares_effects() {
        // Fixed effects stay within the four-word bound of the widest
        // operation; operand-dependent effects are confined to the opcodes
        // whose width rides on a signature or operand
        for opcode in Opcode::iter() {
            if let StackEffect::Fixed(n) = opcode.consumed() {
                assert!(n <= 4, "{opcode:?} consumes {n}");
            }
            if let StackEffect::Fixed(n) = opcode.produced() {
                assert!(n <= 4, "{opcode:?} produces {n}");
            }
            if opcode.consumed() == StackEffect::Operand {
                assert!(
                    matches!(
                        opcode,
                        Opcode::Store
                            | Opcode::PutField
                            | Opcode::PutStatic
                            | Opcode::InvokeVirtual
                            | Opcode::InvokeSpecial
                            | Opcode::InvokeStatic
                            | Opcode::InvokeInterface
                            | Opcode::InvokeDynamic
                    ),
                    "{opcode:?} has operand-dependent consumption"
                );
            }
        }
    }

    #[test]
    fn test_conditional_branches_consume_operands() {
        for opcode in Opcode::iter().filter(|op| op.is_conditional_branch()) {
            match opcode.consumed() {
                StackEffect::Fixed(n) => assert!(n >= 1, "{opcode:?} consumes nothing"),
                StackEffect::Operand => panic!("{opcode:?} should have a fixed effect"),
            }
        }
    }

    #[test]
    fn test_predicate_partitions() {
        assert!(Opcode::InvokeVirtual.is_invoke());
        assert!(!Opcode::GetField.is_invoke());
        assert!(Opcode::GetStatic.is_field_load());
        assert!(!Opcode::PutStatic.is_field_load());
        assert!(Opcode::PutStatic.is_field_access());
        assert!(Opcode::AAStore.is_array_access());
        assert!(Opcode::Goto.is_terminal());
        assert!(!Opcode::Goto.is_conditional_branch());
        assert!(Opcode::IfNull.is_conditional_branch());
        assert_eq!(Opcode::COUNT, Opcode::iter().count());
    }
}
