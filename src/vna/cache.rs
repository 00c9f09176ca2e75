//! Memoization of instruction outputs by input value numbers.

use std::collections::HashMap;

use crate::{cfg::Location, vna::ValueNumber, Result};

/// Cache key: one instruction identity plus its ordered input values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheEntry {
    /// The instruction's program point.
    pub location: Location,
    /// The ordered input value numbers (deepest stack word first).
    pub inputs: Vec<ValueNumber>,
}

impl CacheEntry {
    /// Creates a cache entry.
    #[must_use]
    pub fn new(location: Location, inputs: Vec<ValueNumber>) -> Self {
        Self { location, inputs }
    }
}

/// Maps `(instruction, input value numbers)` to output value numbers.
///
/// The memoization is what makes the dataflow fixpoint converge: the same
/// instruction fed the same inputs must always produce the same outputs, so
/// re-running a block during iteration cannot mint new identities forever.
/// Attempting to record different outputs for a previously seen entry is an
/// unrecoverable internal-consistency fault.
#[derive(Debug, Default)]
pub struct ValueNumberCache {
    map: HashMap<CacheEntry, Vec<ValueNumber>>,
}

impl ValueNumberCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the memoized outputs for an entry.
    #[must_use]
    pub fn lookup(&self, entry: &CacheEntry) -> Option<&[ValueNumber]> {
        self.map.get(entry).map(Vec::as_slice)
    }

    /// Memoizes the outputs for an entry.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`crate::Error::Internal`] if the entry is already
    /// present with different outputs; the analysis must always produce the
    /// same outputs for the same instruction and inputs.
    pub fn memoize(&mut self, entry: CacheEntry, outputs: Vec<ValueNumber>) -> Result<()> {
        if let Some(existing) = self.map.get(&entry) {
            if existing != &outputs {
                return Err(internal_error!(
                    "value number cache would become inconsistent at {}",
                    entry.location
                ));
            }
            return Ok(());
        }
        self.map.insert(entry, outputs);
        Ok(())
    }

    /// Returns the number of memoized entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing has been memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
