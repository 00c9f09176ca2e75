//! Decoded instruction representation.
//!
//! An [`Instruction`] pairs an [`Opcode`] with its operand: a local slot, a
//! constant, a branch target, or a symbolic [`FieldRef`]/[`MethodRef`]. The
//! engine never sees raw class-file bytes; decoding happens upstream and the
//! types here are the narrow contract it arrives through.
//!
//! Stack effects that the opcode declares as operand-dependent (constant
//! widths, field signatures, invocation signatures) are resolved here by
//! [`Instruction::consumed_words`] and [`Instruction::produced_words`].

use std::fmt;
use std::sync::Arc;

use crate::bytecode::{
    method::{argument_words, return_words},
    Opcode, StackEffect,
};

/// A constant-pool value pushed by [`Opcode::Ldc`].
///
/// Floating point constants are stored as raw bits so constants can serve as
/// hash map keys; the value numbering analysis memoizes one value number per
/// distinct constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// A 32-bit integer constant.
    Int(i32),
    /// A 64-bit integer constant (occupies two words).
    Long(i64),
    /// A 32-bit float constant, stored as raw bits.
    Float(u32),
    /// A 64-bit float constant, stored as raw bits (occupies two words).
    Double(u64),
    /// A string constant.
    String(Arc<str>),
    /// A class object constant (the named class's `Class` instance).
    Class(Arc<str>),
}

impl Constant {
    /// Creates a float constant from an `f32` value.
    #[must_use]
    pub fn from_f32(value: f32) -> Self {
        Self::Float(value.to_bits())
    }

    /// Creates a double constant from an `f64` value.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self::Double(value.to_bits())
    }

    /// Returns the width of this constant in operand words.
    #[must_use]
    pub const fn width(&self) -> u16 {
        match self {
            Self::Long(_) | Self::Double(_) => 2,
            _ => 1,
        }
    }
}

/// A symbolic reference to a field.
///
/// Carries the declaring class, name, signature, and the access flags the
/// analysis consults (static, final, volatile). When the declaring class
/// could not be loaded upstream, the reference is marked unresolved; the
/// analysis then reports the lookup failure and treats the access
/// conservatively instead of trusting the flags.
///
/// Strings are reference-counted so field references can be cloned freely
/// into available-load keys and pattern bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    class_name: Arc<str>,
    name: Arc<str>,
    signature: Arc<str>,
    is_static: bool,
    is_final: bool,
    is_volatile: bool,
    resolved: bool,
}

impl FieldRef {
    /// Creates a reference to an instance field.
    #[must_use]
    pub fn instance(class_name: &str, name: &str, signature: &str) -> Self {
        Self {
            class_name: Arc::from(class_name),
            name: Arc::from(name),
            signature: Arc::from(signature),
            is_static: false,
            is_final: false,
            is_volatile: false,
            resolved: true,
        }
    }

    /// Creates a reference to a static field.
    #[must_use]
    pub fn static_field(class_name: &str, name: &str, signature: &str) -> Self {
        Self {
            is_static: true,
            ..Self::instance(class_name, name, signature)
        }
    }

    /// Marks the field as final.
    ///
    /// Final fields survive the conservative load invalidation applied at
    /// calls and lock acquisitions.
    #[must_use]
    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Marks the field as volatile.
    #[must_use]
    pub fn with_volatile(mut self) -> Self {
        self.is_volatile = true;
        self
    }

    /// Marks the reference as unresolved (declaring class not loadable).
    #[must_use]
    pub fn unresolved(mut self) -> Self {
        self.resolved = false;
        self
    }

    /// Returns the name of the declaring class.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns `true` if the field is static.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.is_static
    }

    /// Returns `true` if the field is final.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.is_final
    }

    /// Returns `true` if the field is volatile.
    #[must_use]
    pub const fn is_volatile(&self) -> bool {
        self.is_volatile
    }

    /// Returns `true` if the declaring class was resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Returns the width of the field's value in operand words.
    #[must_use]
    pub fn width(&self) -> u16 {
        match &*self.signature {
            "J" | "D" => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.class_name, self.name, self.signature)
    }
}

/// A symbolic reference to a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    class_name: Arc<str>,
    name: Arc<str>,
    signature: Arc<str>,
}

impl MethodRef {
    /// Creates a method reference.
    ///
    /// # Arguments
    ///
    /// * `class_name` - The declaring class
    /// * `name` - The method name (`<init>` for constructors)
    /// * `signature` - The method descriptor, e.g. `(ILjava/lang/String;)V`
    #[must_use]
    pub fn new(class_name: &str, name: &str, signature: &str) -> Self {
        Self {
            class_name: Arc::from(class_name),
            name: Arc::from(name),
            signature: Arc::from(signature),
        }
    }

    /// Returns the name of the declaring class.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the method descriptor.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns `true` if this references a constructor.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        &*self.name == "<init>"
    }

    /// Returns the number of argument words declared by the descriptor,
    /// excluding any receiver.
    #[must_use]
    pub fn argument_words(&self) -> u16 {
        argument_words(&self.signature)
    }

    /// Returns the number of words the call pushes as its result.
    #[must_use]
    pub fn return_words(&self) -> u16 {
        return_words(&self.signature)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.class_name, self.name, self.signature)
    }
}

/// The operand of a decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No operand.
    None,
    /// A local variable slot; `wide` marks two-word (`long`/`double`) access.
    Local {
        /// The local variable index.
        index: u16,
        /// Whether the access moves two words.
        wide: bool,
    },
    /// The in-place increment of [`Opcode::Iinc`].
    Iinc {
        /// The local variable index.
        index: u16,
        /// The signed increment.
        delta: i16,
    },
    /// A constant-pool value.
    Constant(Constant),
    /// A symbolic field reference.
    Field(FieldRef),
    /// A symbolic method reference.
    Method(MethodRef),
    /// A branch target, as an instruction offset.
    Branch(u32),
}

/// A decoded bytecode instruction.
///
/// # Examples
///
/// ```rust
/// use byteflow::bytecode::{FieldRef, Instruction, Opcode};
///
/// let get = Instruction::field(Opcode::GetField, FieldRef::instance("Acme", "count", "I"));
/// assert_eq!(get.consumed_words(), 1); // the receiver
/// assert_eq!(get.produced_words(), 1); // the int value
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    opcode: Opcode,
    operand: Operand,
}

impl Instruction {
    /// Creates an instruction with no operand.
    #[must_use]
    pub const fn simple(opcode: Opcode) -> Self {
        Self {
            opcode,
            operand: Operand::None,
        }
    }

    /// Creates a local variable load.
    #[must_use]
    pub const fn load(index: u16, wide: bool) -> Self {
        Self {
            opcode: Opcode::Load,
            operand: Operand::Local { index, wide },
        }
    }

    /// Creates a local variable store.
    #[must_use]
    pub const fn store(index: u16, wide: bool) -> Self {
        Self {
            opcode: Opcode::Store,
            operand: Operand::Local { index, wide },
        }
    }

    /// Creates a local variable increment.
    #[must_use]
    pub const fn iinc(index: u16, delta: i16) -> Self {
        Self {
            opcode: Opcode::Iinc,
            operand: Operand::Iinc { index, delta },
        }
    }

    /// Creates a constant push.
    #[must_use]
    pub const fn ldc(constant: Constant) -> Self {
        Self {
            opcode: Opcode::Ldc,
            operand: Operand::Constant(constant),
        }
    }

    /// Creates a field access instruction.
    ///
    /// # Arguments
    ///
    /// * `opcode` - One of the four field access opcodes
    /// * `field` - The symbolic field reference
    #[must_use]
    pub const fn field(opcode: Opcode, field: FieldRef) -> Self {
        Self {
            opcode,
            operand: Operand::Field(field),
        }
    }

    /// Creates a method invocation instruction.
    ///
    /// # Arguments
    ///
    /// * `opcode` - One of the five invocation opcodes
    /// * `method` - The symbolic method reference
    #[must_use]
    pub const fn invoke(opcode: Opcode, method: MethodRef) -> Self {
        Self {
            opcode,
            operand: Operand::Method(method),
        }
    }

    /// Creates a branch instruction with a target offset.
    #[must_use]
    pub const fn branch(opcode: Opcode, target: u32) -> Self {
        Self {
            opcode,
            operand: Operand::Branch(target),
        }
    }

    /// Returns the opcode.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the operand.
    #[must_use]
    pub const fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Returns the field reference, for field access instructions.
    #[must_use]
    pub const fn field_ref(&self) -> Option<&FieldRef> {
        match &self.operand {
            Operand::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Returns the method reference, for invocation instructions.
    #[must_use]
    pub const fn method_ref(&self) -> Option<&MethodRef> {
        match &self.operand {
            Operand::Method(method) => Some(method),
            _ => None,
        }
    }

    /// Returns the constant, for constant push instructions.
    #[must_use]
    pub const fn constant(&self) -> Option<&Constant> {
        match &self.operand {
            Operand::Constant(constant) => Some(constant),
            _ => None,
        }
    }

    /// Returns the local variable index, for local access instructions.
    #[must_use]
    pub const fn local_index(&self) -> Option<u16> {
        match self.operand {
            Operand::Local { index, .. } | Operand::Iinc { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Returns the number of operand words this instruction pops.
    ///
    /// Operand-dependent effects (field signatures, method descriptors,
    /// local widths) are resolved against this instruction's operand. An
    /// instruction built through the typed constructors always resolves.
    #[must_use]
    pub fn consumed_words(&self) -> u16 {
        match self.opcode.consumed() {
            StackEffect::Fixed(n) => n,
            StackEffect::Operand => match (&self.operand, self.opcode) {
                (Operand::Local { wide, .. }, _) => {
                    if *wide {
                        2
                    } else {
                        1
                    }
                }
                (Operand::Field(field), Opcode::PutField) => 1 + field.width(),
                (Operand::Field(field), Opcode::PutStatic) => field.width(),
                (Operand::Method(method), Opcode::InvokeStatic | Opcode::InvokeDynamic) => {
                    method.argument_words()
                }
                (Operand::Method(method), _) => 1 + method.argument_words(),
                _ => 0,
            },
        }
    }

    /// Returns the number of operand words this instruction pushes.
    #[must_use]
    pub fn produced_words(&self) -> u16 {
        match self.opcode.produced() {
            StackEffect::Fixed(n) => n,
            StackEffect::Operand => match &self.operand {
                Operand::Constant(constant) => constant.width(),
                Operand::Local { wide, .. } => {
                    if *wide {
                        2
                    } else {
                        1
                    }
                }
                Operand::Field(field) => field.width(),
                Operand::Method(method) => method.return_words(),
                _ => 0,
            },
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::None => write!(f, "{:?}", self.opcode),
            Operand::Local { index, .. } => write!(f, "{:?} {index}", self.opcode),
            Operand::Iinc { index, delta } => write!(f, "Iinc {index} {delta:+}"),
            Operand::Constant(constant) => write!(f, "Ldc {constant:?}"),
            Operand::Field(field) => write!(f, "{:?} {field}", self.opcode),
            Operand::Method(method) => write!(f, "{:?} {method}", self.opcode),
            Operand::Branch(target) => write!(f, "{:?} -> {target}", self.opcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_width() {
        assert_eq!(Constant::Int(1).width(), 1);
        assert_eq!(Constant::Long(1).width(), 2);
        assert_eq!(Constant::from_f64(1.0).width(), 2);
        assert_eq!(Constant::String(Arc::from("x")).width(), 1);
    }

    #[test]
    fn test_field_ref_width() {
        assert_eq!(FieldRef::instance("A", "f", "I").width(), 1);
        assert_eq!(FieldRef::instance("A", "f", "J").width(), 2);
        assert_eq!(FieldRef::instance("A", "f", "Ljava/lang/Object;").width(), 1);
    }

    #[test]
    fn test_field_ref_flags() {
        let field = FieldRef::static_field("A", "f", "I").with_final().with_volatile();
        assert!(field.is_static());
        assert!(field.is_final());
        assert!(field.is_volatile());
        assert!(field.is_resolved());
        assert!(!field.clone().unresolved().is_resolved());
    }

    #[test]
    fn test_method_ref_constructor() {
        assert!(MethodRef::new("A", "<init>", "()V").is_constructor());
        assert!(!MethodRef::new("A", "init", "()V").is_constructor());
    }

    #[test]
    fn test_local_load_widths() {
        assert_eq!(Instruction::load(0, false).produced_words(), 1);
        assert_eq!(Instruction::load(0, true).produced_words(), 2);
        assert_eq!(Instruction::store(0, true).consumed_words(), 2);
    }

    #[test]
    fn test_field_access_words() {
        let field = FieldRef::instance("A", "f", "J");
        assert_eq!(Instruction::field(Opcode::GetField, field.clone()).consumed_words(), 1);
        assert_eq!(Instruction::field(Opcode::GetField, field.clone()).produced_words(), 2);
        assert_eq!(Instruction::field(Opcode::PutField, field.clone()).consumed_words(), 3);
        assert_eq!(Instruction::field(Opcode::PutField, field).produced_words(), 0);

        let stat = FieldRef::static_field("A", "s", "I");
        assert_eq!(Instruction::field(Opcode::GetStatic, stat.clone()).consumed_words(), 0);
        assert_eq!(Instruction::field(Opcode::PutStatic, stat).consumed_words(), 1);
    }

    #[test]
    fn test_invoke_words() {
        let method = MethodRef::new("A", "m", "(IJ)Ljava/lang/String;");
        let virt = Instruction::invoke(Opcode::InvokeVirtual, method.clone());
        assert_eq!(virt.consumed_words(), 4); // receiver + int + long
        assert_eq!(virt.produced_words(), 1);

        let stat = Instruction::invoke(Opcode::InvokeStatic, method);
        assert_eq!(stat.consumed_words(), 3);
    }

    #[test]
    fn test_simple_opcode_words() {
        assert_eq!(Instruction::simple(Opcode::IAdd).consumed_words(), 2);
        assert_eq!(Instruction::simple(Opcode::IAdd).produced_words(), 1);
        assert_eq!(Instruction::simple(Opcode::Dup).produced_words(), 2);
        assert_eq!(Instruction::simple(Opcode::MonitorEnter).consumed_words(), 1);
    }
}
