//! Value numbers and their provenance flags.
//!
//! A [`ValueNumber`] is the opaque identity the analysis assigns to every
//! value computed or loaded at a program point. Two equal value numbers from
//! the same analysis run denote provably identical runtime values; numbers
//! are never meaningful across runs.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Provenance hints attached to a value number at creation.
    ///
    /// Flags of a merge (phi) value are the bitwise OR of its inputs' flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValueFlags: u8 {
        /// The value was returned by a method invocation.
        const RETURN_VALUE = 0x01;
        /// The value was produced by an array access.
        const ARRAY_VALUE = 0x02;
        /// The value is a constant.
        const CONSTANT_VALUE = 0x04;
        /// The value is a constant class object.
        const CONSTANT_CLASS_OBJECT = 0x08;
        /// The value merges several inputs (a phi result).
        const PHI_NODE = 0x10;
    }
}

/// An opaque per-run value identity.
///
/// Identity is the number alone; the flags are provenance hints and do not
/// participate in equality or hashing. Value numbers are handed out by a
/// per-method [`ValueNumberFactory`](crate::vna::ValueNumberFactory) in
/// monotonically increasing order and are only comparable within the run
/// that created them.
#[derive(Debug, Clone, Copy)]
pub struct ValueNumber {
    number: u32,
    flags: ValueFlags,
}

impl ValueNumber {
    /// Creates a value number. Internal; use the factory.
    pub(crate) const fn new(number: u32, flags: ValueFlags) -> Self {
        Self { number, flags }
    }

    /// Returns the raw number.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.number
    }

    /// Returns the provenance flags.
    #[must_use]
    pub const fn flags(self) -> ValueFlags {
        self.flags
    }

    /// Returns `true` if the value carries the given flag.
    #[must_use]
    pub const fn has_flag(self, flag: ValueFlags) -> bool {
        self.flags.contains(flag)
    }
}

impl PartialEq for ValueNumber {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for ValueNumber {}

impl PartialOrd for ValueNumber {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValueNumber {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.number.cmp(&other.number)
    }
}

impl std::hash::Hash for ValueNumber {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl fmt::Display for ValueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vn{}", self.number)?;
        if self.has_flag(ValueFlags::PHI_NODE) {
            write!(f, "(phi)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_ignores_flags() {
        let plain = ValueNumber::new(3, ValueFlags::empty());
        let flagged = ValueNumber::new(3, ValueFlags::RETURN_VALUE);
        assert_eq!(plain, flagged);

        let mut set = HashSet::new();
        set.insert(plain);
        assert!(set.contains(&flagged));
    }

    #[test]
    fn test_flags_queries() {
        let value = ValueNumber::new(0, ValueFlags::CONSTANT_VALUE | ValueFlags::PHI_NODE);
        assert!(value.has_flag(ValueFlags::CONSTANT_VALUE));
        assert!(value.has_flag(ValueFlags::PHI_NODE));
        assert!(!value.has_flag(ValueFlags::ARRAY_VALUE));
    }

    #[test]
    fn test_ordering_by_number() {
        let a = ValueNumber::new(1, ValueFlags::empty());
        let b = ValueNumber::new(2, ValueFlags::CONSTANT_VALUE);
        assert!(a < b);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ValueNumber::new(7, ValueFlags::empty())), "vn7");
        assert_eq!(
            format!("{}", ValueNumber::new(7, ValueFlags::PHI_NODE)),
            "vn7(phi)"
        );
    }
}
