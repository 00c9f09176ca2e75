//! Merge provenance recording.
//!
//! Every merge (phi) value number records the direct input values that were
//! combined into it. On demand, the transitive closure answers "which
//! original values could have contributed to this one" — used by detectors
//! that need to trace a merged value back to its sources.

use std::collections::{HashMap, HashSet};

use crate::vna::ValueNumber;

/// Records the input sets of merge value numbers.
#[derive(Debug, Default)]
pub struct MergeTree {
    input_sets: HashMap<ValueNumber, HashSet<ValueNumber>>,
}

impl MergeTree {
    /// Creates an empty merge tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `input` flowed into the merge value `output`.
    pub fn map_input_to_output(&mut self, input: ValueNumber, output: ValueNumber) {
        self.input_sets.entry(output).or_default().insert(input);
    }

    /// Returns the direct inputs recorded for a merge value.
    ///
    /// Empty for values that were never produced by a merge.
    #[must_use]
    pub fn input_set(&self, output: ValueNumber) -> HashSet<ValueNumber> {
        self.input_sets.get(&output).cloned().unwrap_or_default()
    }

    /// Returns the transitive closure of inputs contributing to a merge value.
    ///
    /// Inputs that are themselves merge results are expanded recursively;
    /// the output itself is not included unless it feeds back into itself
    /// through a loop merge.
    #[must_use]
    pub fn transitive_input_set(&self, output: ValueNumber) -> HashSet<ValueNumber> {
        let mut result = HashSet::new();
        let mut work: Vec<ValueNumber> = self.input_set(output).into_iter().collect();

        while let Some(value) = work.pop() {
            if !result.insert(value) {
                continue;
            }
            if let Some(inputs) = self.input_sets.get(&value) {
                work.extend(inputs.iter().copied());
            }
        }
        result
    }

    /// Returns `true` if the value was produced by a recorded merge.
    #[must_use]
    pub fn is_merge_value(&self, value: ValueNumber) -> bool {
        self.input_sets.contains_key(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vna::ValueNumberFactory;

    #[test]
    fn test_direct_inputs() {
        let mut factory = ValueNumberFactory::new();
        let mut tree = MergeTree::new();
        let a = factory.create_fresh();
        let b = factory.create_fresh();
        let phi = factory.create_fresh();

        tree.map_input_to_output(a, phi);
        tree.map_input_to_output(b, phi);

        assert_eq!(tree.input_set(phi), HashSet::from([a, b]));
        assert!(tree.is_merge_value(phi));
        assert!(!tree.is_merge_value(a));
    }

    #[test]
    fn test_transitive_inputs() {
        let mut factory = ValueNumberFactory::new();
        let mut tree = MergeTree::new();
        let a = factory.create_fresh();
        let b = factory.create_fresh();
        let inner = factory.create_fresh();
        let c = factory.create_fresh();
        let outer = factory.create_fresh();

        tree.map_input_to_output(a, inner);
        tree.map_input_to_output(b, inner);
        tree.map_input_to_output(inner, outer);
        tree.map_input_to_output(c, outer);

        assert_eq!(
            tree.transitive_input_set(outer),
            HashSet::from([a, b, c, inner])
        );
    }

    #[test]
    fn test_transitive_inputs_loop() {
        // A loop merge can feed itself; the closure must terminate
        let mut factory = ValueNumberFactory::new();
        let mut tree = MergeTree::new();
        let a = factory.create_fresh();
        let phi = factory.create_fresh();

        tree.map_input_to_output(a, phi);
        tree.map_input_to_output(phi, phi);

        assert_eq!(tree.transitive_input_set(phi), HashSet::from([a, phi]));
    }

    #[test]
    fn test_unknown_value_empty() {
        let mut factory = ValueNumberFactory::new();
        let tree = MergeTree::new();
        let v = factory.create_fresh();
        assert!(tree.input_set(v).is_empty());
        assert!(tree.transitive_input_set(v).is_empty());
    }
}
