//! Method descriptors and signature arity parsing.
//!
//! The analysis needs only the arity-relevant slice of the type system: how
//! many local variable words a method's parameters occupy, whether there is
//! an implicit receiver, and how wide each parameter is. Full type modeling
//! stays out of scope.

use std::sync::Arc;

/// Description of the method under analysis.
///
/// Supplies what the value numbering analysis needs to set up its entry
/// frame: the number of locals, the static-vs-instance shift, and the
/// signature from which parameter slots are derived.
#[derive(Debug, Clone)]
pub struct MethodDesc {
    class_name: Arc<str>,
    name: Arc<str>,
    signature: Arc<str>,
    is_static: bool,
    max_locals: u16,
}

impl MethodDesc {
    /// Creates a method descriptor.
    ///
    /// # Arguments
    ///
    /// * `class_name` - The declaring class
    /// * `name` - The method name
    /// * `signature` - The method descriptor, e.g. `(I[J)V`
    /// * `is_static` - Whether the method has no implicit receiver
    /// * `max_locals` - The declared local variable array size in words
    #[must_use]
    pub fn new(
        class_name: &str,
        name: &str,
        signature: &str,
        is_static: bool,
        max_locals: u16,
    ) -> Self {
        Self {
            class_name: Arc::from(class_name),
            name: Arc::from(name),
            signature: Arc::from(signature),
            is_static,
            max_locals,
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

    /// Returns `true` if the method is static.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.is_static
    }

    /// Returns the declared size of the local variable array in words.
    #[must_use]
    pub const fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Returns the first local slot of each declared parameter.
    ///
    /// The implicit receiver of an instance method occupies slot 0 and is
    /// not listed; declared parameters start at slot 1 for instance methods
    /// and slot 0 for static methods. Wide parameters advance the slot
    /// cursor by two.
    #[must_use]
    pub fn parameter_slots(&self) -> Vec<u16> {
        let mut slots = Vec::new();
        let mut cursor: u16 = u16::from(!self.is_static);
        for width in parameter_widths(&self.signature) {
            slots.push(cursor);
            cursor += width;
        }
        slots
    }
}

/// Returns the width in words of each declared parameter of a descriptor.
fn parameter_widths(signature: &str) -> Vec<u16> {
    let mut widths = Vec::new();
    let inner = signature
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map_or("", |(args, _)| args);

    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            'J' | 'D' => widths.push(2),
            'B' | 'C' | 'F' | 'I' | 'S' | 'Z' => widths.push(1),
            'L' => {
                // Reference type: skip to the terminating semicolon
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                }
                widths.push(1);
            }
            '[' => {
                // Array dimensions collapse to one reference word; skip the
                // element type
                let mut next = chars.next();
                while next == Some('[') {
                    next = chars.next();
                }
                if next == Some('L') {
                    for c in chars.by_ref() {
                        if c == ';' {
                            break;
                        }
                    }
                }
                widths.push(1);
            }
            _ => {}
        }
    }
    widths
}

/// Returns the number of words a descriptor's declared arguments occupy.
#[must_use]
pub fn argument_words(signature: &str) -> u16 {
    parameter_widths(signature).iter().sum()
}

/// Returns the number of words a descriptor's return type occupies.
#[must_use]
pub fn return_words(signature: &str) -> u16 {
    match signature.rsplit_once(')').map(|(_, ret)| ret) {
        Some("V") | None => 0,
        Some("J" | "D") => 2,
        Some(_) => 1,
    }
}
