//! Pattern assembly.
//!
//! A [`ByteCodePattern`] is an ordered chain of [`PatternElement`]s,
//! optionally auto-interleaved with wildcard gaps so that callers writing
//! "a NEW, then eventually a constructor call" do not have to spell out the
//! wildcards between the interesting elements.

use crate::pattern::PatternElement;

/// An ordered chain of pattern elements.
///
/// # Examples
///
/// ```rust
/// use byteflow::pattern::{ByteCodePattern, InvokeMode, PatternElement};
///
/// let pattern = ByteCodePattern::new()
///     .interelement_wild(4)
///     .add(PatternElement::new_object("$obj").label("create"))
///     .add(
///         PatternElement::invoke("Acme", "<init>", "/.*", InvokeMode::CONSTRUCTOR)
///             .receiver("$obj"),
///     );
/// assert_eq!(pattern.elements().len(), 3); // wildcard interleaved
/// ```
#[derive(Debug, Clone, Default)]
pub struct ByteCodePattern {
    elements: Vec<PatternElement>,
    interelement_wild: Option<usize>,
}

impl ByteCodePattern {
    /// Creates an empty pattern.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interleaves a `Wild(0..max)` element before every subsequently added
    /// element except the first.
    #[must_use]
    pub const fn interelement_wild(mut self, max: usize) -> Self {
        self.interelement_wild = Some(max);
        self
    }

    /// Appends an element, inserting the configured wildcard gap first.
    #[must_use]
    pub fn add(mut self, element: PatternElement) -> Self {
        if let Some(max) = self.interelement_wild {
            if !self.elements.is_empty() {
                self.elements.push(PatternElement::wild(max));
            }
        }
        self.elements.push(element);
        self
    }

    /// Appends an explicit wildcard element regardless of the interleave
    /// setting.
    #[must_use]
    pub fn add_wild(mut self, max: usize) -> Self {
        self.elements.push(PatternElement::wild(max));
        self
    }

    /// Returns the pattern's elements in order.
    #[must_use]
    pub fn elements(&self) -> &[PatternElement] {
        &self.elements
    }

    /// Returns `true` if the pattern has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Opcode;
    use crate::pattern::ElementKind;

    #[test]
    fn test_plain_chain() {
        let pattern = ByteCodePattern::new()
            .add(PatternElement::op(&[Opcode::New]))
            .add(PatternElement::op(&[Opcode::Dup]));
        assert_eq!(pattern.elements().len(), 2);
    }

    #[test]
    fn test_interelement_wild() {
        let pattern = ByteCodePattern::new()
            .interelement_wild(3)
            .add(PatternElement::op(&[Opcode::New]))
            .add(PatternElement::op(&[Opcode::Dup]))
            .add(PatternElement::op(&[Opcode::Pop]));

        // New, Wild, Dup, Wild, Pop
        assert_eq!(pattern.elements().len(), 5);
        assert!(matches!(pattern.elements()[1].kind(), ElementKind::Wild));
        assert_eq!(pattern.elements()[1].max_occur(), 3);
        assert!(matches!(pattern.elements()[0].kind(), ElementKind::Op(_)));
    }

    #[test]
    fn test_explicit_wild() {
        let pattern = ByteCodePattern::new()
            .add(PatternElement::op(&[Opcode::New]))
            .add_wild(10);
        assert_eq!(pattern.elements().len(), 2);
        assert_eq!(pattern.elements()[1].max_occur(), 10);
    }
}
