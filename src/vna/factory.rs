//! Per-analysis-run allocation of value numbers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::vna::{ValueFlags, ValueNumber};

/// Hands out value numbers for one analysis run.
///
/// Identities increase monotonically and are unique within the run; a
/// factory is exclusively owned by one method's analysis and dropped with
/// it, so no value-number state outlives or crosses runs.
///
/// Constant class objects are memoized per class name: repeated loads of the
/// same class constant reuse one identity.
#[derive(Debug, Default)]
pub struct ValueNumberFactory {
    next: u32,
    class_objects: HashMap<Arc<str>, ValueNumber>,
}

impl ValueNumberFactory {
    /// Creates a fresh factory with no values allocated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh value number with no flags.
    pub fn create_fresh(&mut self) -> ValueNumber {
        self.create_fresh_with_flags(ValueFlags::empty())
    }

    /// Allocates a fresh value number carrying the given flags.
    pub fn create_fresh_with_flags(&mut self, flags: ValueFlags) -> ValueNumber {
        let value = ValueNumber::new(self.next, flags);
        self.next += 1;
        value
    }

    /// Returns the memoized value number of a class object constant.
    ///
    /// The first request for a class name allocates the value; subsequent
    /// requests reuse it.
    pub fn class_object_value(&mut self, class_name: &str) -> ValueNumber {
        if let Some(&value) = self.class_objects.get(class_name) {
            return value;
        }
        let value =
            self.create_fresh_with_flags(ValueFlags::CONSTANT_CLASS_OBJECT | ValueFlags::CONSTANT_VALUE);
        self.class_objects.insert(Arc::from(class_name), value);
        value
    }

    /// Returns the number of values allocated so far.
    #[must_use]
    pub const fn num_values_allocated(&self) -> u32 {
        self.next
    }

    /// Records the post-compaction allocation count.
    ///
    /// Called once at the end of a run after the analysis has renumbered the
    /// values retained in its frames; the factory only tracks the new bound.
    pub(crate) fn set_compacted_count(&mut self, count: u32) {
        self.next = count;
        self.class_objects.clear();
    }
}
