//! Dataflow frames carrying value numbers.
//!
//! A [`ValueNumberFrame`] is the abstract machine state at one program
//! point: the local variable slots followed by the operand stack, each slot
//! holding a [`ValueNumber`], plus the available-load map driving redundant
//! load elimination and forward substitution.
//!
//! Frames form the lattice the fixpoint iterates over: an uninitialized
//! frame is *top*, a reachable state is *valid*, and conflicting or
//! unreachable states are *bottom*. Merging is slot-wise with the
//! one-merge-per-slot rule: the first time two differing values meet in a
//! slot a fresh merge value is allocated and memoized; every later merge
//! into that slot reuses it. The memo approximates static single assignment
//! without a renaming pass.

use std::collections::HashMap;
use std::fmt;

use crate::{
    bytecode::FieldRef,
    vna::{MergeTree, ValueFlags, ValueNumber, ValueNumberFactory},
    Result,
};

/// A field access whose loaded value is known.
///
/// Keyed by the field and, for instance fields, the value number of the
/// owning reference. Static loads have no reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AvailableLoad {
    reference: Option<ValueNumber>,
    field: FieldRef,
}

impl AvailableLoad {
    /// Creates an available load of a static field.
    #[must_use]
    pub fn static_load(field: FieldRef) -> Self {
        Self {
            reference: None,
            field,
        }
    }

    /// Creates an available load of an instance field through a reference.
    #[must_use]
    pub fn instance_load(reference: ValueNumber, field: FieldRef) -> Self {
        Self {
            reference: Some(reference),
            field,
        }
    }

    /// Returns the owning reference, or `None` for static loads.
    #[must_use]
    pub const fn reference(&self) -> Option<ValueNumber> {
        self.reference
    }

    /// Returns the field.
    #[must_use]
    pub const fn field(&self) -> &FieldRef {
        &self.field
    }
}

impl fmt::Display for AvailableLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reference {
            Some(reference) => write!(f, "{reference}.{}", self.field),
            None => write!(f, "{}", self.field),
        }
    }
}

/// Lattice position of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    /// Uninitialized; identity for the merge.
    Top,
    /// A reachable, well-formed machine state.
    Valid,
    /// Unreachable or conflicting.
    Bottom,
}

/// The abstract stack-and-locals state at a program point.
///
/// Slots `0..num_locals` are the local variables; slots past that are the
/// operand stack, deepest first. Only the dataflow transfer function and the
/// merge operator mutate frames; consumers (the pattern matcher in
/// particular) read them.
#[derive(Debug, Clone)]
pub struct ValueNumberFrame {
    state: FrameState,
    num_locals: usize,
    /// Locals then operand stack.
    slots: Vec<ValueNumber>,
    /// One-merge-per-slot memo. Lives in the block-entry frame and survives
    /// re-merges across fixpoint iterations; never copied from other frames.
    merged_values: Vec<Option<ValueNumber>>,
    /// One-merge-per-load memo, same lifetime as `merged_values`.
    merged_loads: HashMap<AvailableLoad, ValueNumber>,
    available_loads: HashMap<AvailableLoad, Vec<ValueNumber>>,
    /// Values that were at some point known to be a load of a field; kept
    /// after the load is killed so fuzzy matching can still relate them.
    previously_known_as: HashMap<ValueNumber, AvailableLoad>,
    /// Set once a load merge allocated a phi value in this frame.
    phi_node_for_loads: bool,
}

impl ValueNumberFrame {
    /// Creates a top (uninitialized) frame for a method with the given
    /// number of locals.
    #[must_use]
    pub fn new(num_locals: usize) -> Self {
        Self {
            state: FrameState::Top,
            num_locals,
            slots: Vec::new(),
            merged_values: Vec::new(),
            merged_loads: HashMap::new(),
            available_loads: HashMap::new(),
            previously_known_as: HashMap::new(),
            phi_node_for_loads: false,
        }
    }

    /// Returns `true` for the lattice top (uninitialized) frame.
    #[must_use]
    pub fn is_top(&self) -> bool {
        self.state == FrameState::Top
    }

    /// Returns `true` for the lattice bottom (unreachable/conflicting) frame.
    #[must_use]
    pub fn is_bottom(&self) -> bool {
        self.state == FrameState::Bottom
    }

    /// Returns `true` for a reachable, well-formed frame.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state == FrameState::Valid
    }

    /// Makes this frame the lattice top, discarding slots and loads.
    ///
    /// The merge memos survive; they belong to the program point, not to any
    /// one iteration's state.
    pub fn make_top(&mut self) {
        self.state = FrameState::Top;
        self.slots.clear();
        self.available_loads.clear();
        self.previously_known_as.clear();
    }

    /// Makes this frame the lattice bottom.
    pub fn make_bottom(&mut self) {
        self.state = FrameState::Bottom;
        self.slots.clear();
        self.available_loads.clear();
    }

    /// Makes this frame valid with the given local values and an empty stack.
    ///
    /// # Arguments
    ///
    /// * `locals` - One value per local slot; the length fixes `num_locals`
    pub fn init_entry(&mut self, locals: &[ValueNumber]) {
        self.state = FrameState::Valid;
        self.num_locals = locals.len();
        self.slots = locals.to_vec();
    }

    /// Returns the number of local variable slots.
    #[must_use]
    pub const fn num_locals(&self) -> usize {
        self.num_locals
    }

    /// Returns the total number of slots (locals plus stack).
    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Returns the operand stack depth in words.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.slots.len().saturating_sub(self.num_locals)
    }

    fn require_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(crate::Error::InvalidFrame)
        }
    }

    /// Returns the value in a slot (local or stack, by absolute index).
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidFrame`] if the frame is top/bottom, or an
    /// internal fault for an out-of-range slot.
    pub fn value(&self, slot: usize) -> Result<ValueNumber> {
        self.require_valid()?;
        self.slots
            .get(slot)
            .copied()
            .ok_or_else(|| internal_error!("slot {} out of range ({} slots)", slot, self.slots.len()))
    }

    /// Sets the value in a slot (local or stack, by absolute index).
    ///
    /// # Errors
    ///
    /// Same conditions as [`value`](Self::value).
    pub fn set_value(&mut self, slot: usize, value: ValueNumber) -> Result<()> {
        self.require_valid()?;
        let len = self.slots.len();
        match self.slots.get_mut(slot) {
            Some(entry) => {
                *entry = value;
                Ok(())
            }
            None => Err(internal_error!("slot {} out of range ({} slots)", slot, len)),
        }
    }

    /// Returns the value of a local variable.
    ///
    /// # Errors
    ///
    /// Same conditions as [`value`](Self::value).
    pub fn local(&self, index: usize) -> Result<ValueNumber> {
        if index >= self.num_locals {
            return Err(internal_error!(
                "local {} out of range ({} locals)",
                index,
                self.num_locals
            ));
        }
        self.value(index)
    }

    /// Sets the value of a local variable.
    ///
    /// # Errors
    ///
    /// Same conditions as [`value`](Self::value).
    pub fn set_local(&mut self, index: usize, value: ValueNumber) -> Result<()> {
        if index >= self.num_locals {
            return Err(internal_error!(
                "local {} out of range ({} locals)",
                index,
                self.num_locals
            ));
        }
        self.set_value(index, value)
    }

    /// Pushes a value onto the operand stack.
    ///
    /// # Errors
    ///
    /// [`crate::Error::InvalidFrame`] if the frame is top/bottom.
    pub fn push_value(&mut self, value: ValueNumber) -> Result<()> {
        self.require_valid()?;
        self.slots.push(value);
        Ok(())
    }

    /// Pops the top value off the operand stack.
    ///
    /// # Errors
    ///
    /// [`crate::Error::StackUnderflow`] on an empty operand stack.
    pub fn pop_value(&mut self) -> Result<ValueNumber> {
        self.require_valid()?;
        if self.stack_depth() == 0 {
            return Err(crate::Error::StackUnderflow);
        }
        self.slots.pop().ok_or(crate::Error::StackUnderflow)
    }

    /// Returns the top value of the operand stack without popping.
    ///
    /// # Errors
    ///
    /// [`crate::Error::StackUnderflow`] on an empty operand stack.
    pub fn top_value(&self) -> Result<ValueNumber> {
        self.stack_value(0)
    }

    /// Returns the stack value at the given depth (0 is the top).
    ///
    /// # Errors
    ///
    /// [`crate::Error::StackUnderflow`] if the stack is shallower.
    pub fn stack_value(&self, depth: usize) -> Result<ValueNumber> {
        self.require_valid()?;
        let stack_depth = self.stack_depth();
        if depth >= stack_depth {
            return Err(crate::Error::StackUnderflow);
        }
        Ok(self.slots[self.slots.len() - 1 - depth])
    }

    /// Returns the top `count` stack words in stack order (deepest first).
    ///
    /// # Errors
    ///
    /// [`crate::Error::StackUnderflow`] if the stack holds fewer words.
    pub fn top_stack_words(&self, count: usize) -> Result<Vec<ValueNumber>> {
        self.require_valid()?;
        if count > self.stack_depth() {
            return Err(crate::Error::StackUnderflow);
        }
        Ok(self.slots[self.slots.len() - count..].to_vec())
    }

    /// Empties the operand stack, leaving locals untouched.
    pub fn clear_stack(&mut self) {
        self.slots.truncate(self.num_locals);
    }

    /// Copies another frame's state into this one.
    ///
    /// Slots, lattice position, and load maps are copied; this frame's merge
    /// memos are kept (created lazily the first time it holds a valid state).
    pub fn copy_from(&mut self, other: &Self) {
        if self.merged_values.is_empty() && other.is_valid() {
            // This is where the frame gets its size; it keeps it for as
            // long as it stays valid.
            self.merged_values = vec![None; other.num_slots()];
        }
        self.state = other.state;
        self.num_locals = other.num_locals;
        self.slots = other.slots.clone();
        self.available_loads = other.available_loads.clone();
        self.previously_known_as = other.previously_known_as.clone();
    }

    /// Merges another frame into this one (the lattice meet).
    ///
    /// Identical values merge to themselves. Differing values merge to the
    /// memoized per-slot merge value, allocated fresh on the first conflict
    /// with the OR of the input flags, and recorded in the merge tree.
    ///
    /// # Errors
    ///
    /// Internal faults from slot accounting only; lattice conflicts (slot
    /// count mismatches) degrade to bottom instead of failing.
    pub fn merge_with(
        &mut self,
        other: &Self,
        factory: &mut ValueNumberFactory,
        merge_tree: &mut MergeTree,
    ) -> Result<()> {
        if other.is_top() {
            return Ok(());
        }
        if self.is_top() {
            self.copy_from(other);
            return Ok(());
        }
        if self.is_bottom() {
            return Ok(());
        }
        if other.is_bottom() {
            self.make_bottom();
            return Ok(());
        }
        if self.num_slots() != other.num_slots() {
            // Incompatible stack depths can only reach the same point via
            // malformed flow; treat as unreachable
            self.make_bottom();
            return Ok(());
        }

        self.merge_available_loads(other, factory, merge_tree);

        for slot in 0..self.num_slots() {
            let mine = self.slots[slot];
            let theirs = other.slots[slot];
            if mine == theirs {
                continue;
            }

            let merged = match self.merged_value(slot) {
                Some(merged) => merged,
                None => {
                    let flags = mine.flags() | theirs.flags() | ValueFlags::PHI_NODE;
                    let merged = factory.create_fresh_with_flags(flags);
                    self.set_merged_value(slot, merged);
                    merged
                }
            };
            merge_tree.map_input_to_output(mine, merged);
            merge_tree.map_input_to_output(theirs, merged);
            self.slots[slot] = merged;
        }
        Ok(())
    }

    /// Merges available-load sets, phi-merging entries that differ.
    ///
    /// Loads whose values agree in both frames stay as they are. A load
    /// whose values differ (or that the other frame lost) collapses to the
    /// memoized per-load merge value.
    fn merge_available_loads(
        &mut self,
        other: &Self,
        factory: &mut ValueNumberFactory,
        merge_tree: &mut MergeTree,
    ) {
        let mut changed = false;

        if other.is_bottom() {
            changed = !self.available_loads.is_empty();
            self.available_loads.clear();
        } else if !other.is_top() {
            for (load, values) in &mut self.available_loads {
                let other_values = other.available_loads.get(load);
                if other_values.map(Vec::as_slice) == Some(values.as_slice()) {
                    continue;
                }

                let phi = match self.merged_loads.get(load) {
                    Some(&phi) => phi,
                    None => {
                        let mut flags = ValueFlags::PHI_NODE;
                        for value in values.iter() {
                            flags |= value.flags();
                        }
                        if let Some(other_values) = other_values {
                            for value in other_values {
                                flags |= value.flags();
                            }
                        }
                        let phi = factory.create_fresh_with_flags(flags);
                        self.merged_loads.insert(load.clone(), phi);
                        changed = true;
                        phi
                    }
                };

                for value in values.iter() {
                    merge_tree.map_input_to_output(*value, phi);
                }
                if let Some(other_values) = other_values {
                    for value in other_values {
                        merge_tree.map_input_to_output(*value, phi);
                    }
                }
                *values = vec![phi];
            }
        }

        for (value, load) in &other.previously_known_as {
            self.previously_known_as
                .entry(*value)
                .or_insert_with(|| load.clone());
        }
        if changed {
            self.phi_node_for_loads = true;
        }
    }

    /// Returns `true` if a load merge allocated a phi value in this frame.
    #[must_use]
    pub const fn has_phi_node_for_loads(&self) -> bool {
        self.phi_node_for_loads
    }

    fn merged_value(&self, slot: usize) -> Option<ValueNumber> {
        self.merged_values.get(slot).copied().flatten()
    }

    fn set_merged_value(&mut self, slot: usize, value: ValueNumber) {
        if slot >= self.merged_values.len() {
            self.merged_values.resize(slot + 1, None);
        }
        self.merged_values[slot] = Some(value);
    }

    /// Looks up an available load.
    #[must_use]
    pub fn available_load(&self, load: &AvailableLoad) -> Option<&[ValueNumber]> {
        self.available_loads.get(load).map(Vec::as_slice)
    }

    /// Records an available load.
    pub fn add_available_load(&mut self, load: AvailableLoad, values: Vec<ValueNumber>) {
        for value in &values {
            self.previously_known_as.insert(*value, load.clone());
        }
        self.available_loads.insert(load, values);
    }

    /// Returns `true` if any load is currently available.
    #[must_use]
    pub fn has_available_loads(&self) -> bool {
        !self.available_loads.is_empty()
    }

    /// Kills all available loads of the given field, regardless of reference.
    ///
    /// Applied at stores, where aliasing we cannot see might make any other
    /// reference's cached load stale.
    pub fn kill_loads_of_field(&mut self, field: &FieldRef) {
        self.available_loads
            .retain(|load, _| load.field() != field);
    }

    /// Kills all loads of non-final fields.
    ///
    /// Applied at calls and other opaque operations that may write any
    /// field.
    pub fn kill_all_loads(&mut self) {
        self.available_loads
            .retain(|load, _| load.field().is_final());
    }

    /// Kills non-final loads keyed by the given owning reference.
    ///
    /// `None` targets static loads.
    pub fn kill_all_loads_of(&mut self, reference: Option<ValueNumber>) {
        self.available_loads
            .retain(|load, _| load.field().is_final() || load.reference() != reference);
    }

    /// Kills all non-final loads except those through the given reference.
    ///
    /// Applied at monitor acquisition: the monitored object's own fields
    /// stay available, everything else may have been written by the thread
    /// we just synchronized with.
    pub fn kill_all_loads_except_for(&mut self, kept: Option<ValueNumber>) {
        self.available_loads
            .retain(|load, _| load.field().is_final() || load.reference() == kept);
    }

    /// Returns the available load a value is currently known as, if any.
    #[must_use]
    pub fn load_for(&self, value: ValueNumber) -> Option<&AvailableLoad> {
        self.available_loads
            .iter()
            .find(|(_, values)| values.contains(&value))
            .map(|(load, _)| load)
    }

    /// Relaxed equivalence for detector use.
    ///
    /// Two values fuzzily match if they are identical, were loaded from the
    /// same field location, or share a provenance flag.
    #[must_use]
    pub fn fuzzy_match(&self, v1: ValueNumber, v2: ValueNumber) -> bool {
        v1 == v2 || self.from_matching_loads(v1, v2) || Self::have_matching_flags(v1, v2)
    }

    /// Returns `true` if both values are (or were) loads of the same
    /// field location.
    #[must_use]
    pub fn from_matching_loads(&self, v1: ValueNumber, v2: ValueNumber) -> bool {
        let load1 = self.load_for(v1).or_else(|| self.previously_known_as.get(&v1));
        let load2 = self.load_for(v2).or_else(|| self.previously_known_as.get(&v2));
        match (load1, load2) {
            (Some(load1), Some(load2)) => load1 == load2,
            _ => false,
        }
    }

    /// Returns `true` if the two values share at least one provenance flag.
    #[must_use]
    pub fn have_matching_flags(v1: ValueNumber, v2: ValueNumber) -> bool {
        !(v1.flags() & v2.flags()).is_empty()
    }

    /// Lattice-aware equality used for fixpoint change detection.
    ///
    /// Compares lattice position, slots, and available loads; the merge
    /// memos are bookkeeping, not state.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.state == other.state
            && self.slots == other.slots
            && self.available_loads == other.available_loads
    }

    /// Renumbers every slot value through the compaction map and purges the
    /// load maps, whose keys would dangle.
    pub(crate) fn compact(&mut self, remap: &HashMap<u32, u32>) {
        for slot in &mut self.slots {
            if let Some(&new) = remap.get(&slot.number()) {
                *slot = ValueNumber::new(new, slot.flags());
            }
        }
        self.available_loads.clear();
        self.previously_known_as.clear();
        self.merged_loads.clear();
        self.merged_values.clear();
    }
}

impl fmt::Display for ValueNumberFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            FrameState::Top => write!(f, "[TOP]"),
            FrameState::Bottom => write!(f, "[BOTTOM]"),
            FrameState::Valid => {
                write!(f, "[")?;
                for (i, slot) in self.slots.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if i == self.num_locals {
                        write!(f, "| ")?;
                    }
                    write!(f, "{slot}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::FieldRef;

    fn make_valid(num_locals: usize, factory: &mut ValueNumberFactory) -> ValueNumberFrame {
        let locals: Vec<ValueNumber> = (0..num_locals).map(|_| factory.create_fresh()).collect();
        let mut frame = ValueNumberFrame::new(num_locals);
        frame.init_entry(&locals);
        frame
    }

    #[test]
    fn test_top_frame_rejects_slot_access() {
        let frame = ValueNumberFrame::new(2);
        assert!(frame.is_top());
        assert!(matches!(frame.value(0), Err(crate::Error::InvalidFrame)));
    }

    #[test]
    fn test_stack_discipline() {
        let mut factory = ValueNumberFactory::new();
        let mut frame = make_valid(1, &mut factory);
        let a = factory.create_fresh();
        let b = factory.create_fresh();

        frame.push_value(a).unwrap();
        frame.push_value(b).unwrap();
        assert_eq!(frame.stack_depth(), 2);
        assert_eq!(frame.top_value().unwrap(), b);
        assert_eq!(frame.stack_value(1).unwrap(), a);
        assert_eq!(frame.top_stack_words(2).unwrap(), vec![a, b]);

        assert_eq!(frame.pop_value().unwrap(), b);
        assert_eq!(frame.pop_value().unwrap(), a);
        assert!(matches!(
            frame.pop_value(),
            Err(crate::Error::StackUnderflow)
        ));
    }

    #[test]
    fn test_clear_stack_keeps_locals() {
        let mut factory = ValueNumberFactory::new();
        let mut frame = make_valid(2, &mut factory);
        let local0 = frame.local(0).unwrap();
        frame.push_value(factory.create_fresh()).unwrap();

        frame.clear_stack();
        assert_eq!(frame.stack_depth(), 0);
        assert_eq!(frame.local(0).unwrap(), local0);
    }

    #[test]
    fn test_merge_idempotent() {
        // Merging a frame with an identical frame changes nothing and
        // allocates no fresh values
        let mut factory = ValueNumberFactory::new();
        let mut merge_tree = MergeTree::new();
        let frame = make_valid(2, &mut factory);
        let mut result = ValueNumberFrame::new(2);
        result.copy_from(&frame);

        let allocated = factory.num_values_allocated();
        result
            .merge_with(&frame, &mut factory, &mut merge_tree)
            .unwrap();

        assert!(result.same_as(&frame));
        assert_eq!(factory.num_values_allocated(), allocated);
    }

    #[test]
    fn test_one_merge_per_slot() {
        let mut factory = ValueNumberFactory::new();
        let mut merge_tree = MergeTree::new();
        let frame_a = make_valid(1, &mut factory);
        let frame_b = make_valid(1, &mut factory);

        let mut result = ValueNumberFrame::new(1);
        result.copy_from(&frame_a);
        result
            .merge_with(&frame_b, &mut factory, &mut merge_tree)
            .unwrap();
        let first_merge = result.local(0).unwrap();
        assert!(first_merge.has_flag(ValueFlags::PHI_NODE));

        // Re-merging the same pair reuses the memoized merge value
        let allocated = factory.num_values_allocated();
        result.copy_from(&frame_a);
        result
            .merge_with(&frame_b, &mut factory, &mut merge_tree)
            .unwrap();

        assert_eq!(result.local(0).unwrap(), first_merge);
        assert_eq!(factory.num_values_allocated(), allocated);
    }

    #[test]
    fn test_merge_records_merge_tree() {
        let mut factory = ValueNumberFactory::new();
        let mut merge_tree = MergeTree::new();
        let frame_a = make_valid(1, &mut factory);
        let frame_b = make_valid(1, &mut factory);
        let a = frame_a.local(0).unwrap();
        let b = frame_b.local(0).unwrap();

        let mut result = ValueNumberFrame::new(1);
        result.copy_from(&frame_a);
        result
            .merge_with(&frame_b, &mut factory, &mut merge_tree)
            .unwrap();

        let merged = result.local(0).unwrap();
        let inputs = merge_tree.input_set(merged);
        assert!(inputs.contains(&a));
        assert!(inputs.contains(&b));
    }

    #[test]
    fn test_merge_flags_are_or_of_inputs() {
        let mut factory = ValueNumberFactory::new();
        let mut merge_tree = MergeTree::new();

        let a = factory.create_fresh_with_flags(ValueFlags::CONSTANT_VALUE);
        let b = factory.create_fresh_with_flags(ValueFlags::RETURN_VALUE);
        let mut frame_a = ValueNumberFrame::new(1);
        frame_a.init_entry(&[a]);
        let mut frame_b = ValueNumberFrame::new(1);
        frame_b.init_entry(&[b]);

        let mut result = ValueNumberFrame::new(1);
        result.copy_from(&frame_a);
        result
            .merge_with(&frame_b, &mut factory, &mut merge_tree)
            .unwrap();

        let merged = result.local(0).unwrap();
        assert!(merged.has_flag(ValueFlags::CONSTANT_VALUE));
        assert!(merged.has_flag(ValueFlags::RETURN_VALUE));
        assert!(merged.has_flag(ValueFlags::PHI_NODE));
    }

    #[test]
    fn test_merge_top_is_identity() {
        let mut factory = ValueNumberFactory::new();
        let mut merge_tree = MergeTree::new();
        let frame = make_valid(1, &mut factory);
        let top = ValueNumberFrame::new(1);

        let mut result = ValueNumberFrame::new(1);
        result.copy_from(&frame);
        result.merge_with(&top, &mut factory, &mut merge_tree).unwrap();
        assert!(result.same_as(&frame));
    }

    #[test]
    fn test_merge_mismatched_depth_goes_bottom() {
        let mut factory = ValueNumberFactory::new();
        let mut merge_tree = MergeTree::new();
        let frame_a = make_valid(1, &mut factory);
        let mut frame_b = make_valid(1, &mut factory);
        frame_b.push_value(factory.create_fresh()).unwrap();

        let mut result = ValueNumberFrame::new(1);
        result.copy_from(&frame_a);
        result
            .merge_with(&frame_b, &mut factory, &mut merge_tree)
            .unwrap();
        assert!(result.is_bottom());
    }

    #[test]
    fn test_available_load_kill_rules() {
        let mut factory = ValueNumberFactory::new();
        let mut frame = make_valid(1, &mut factory);
        let reference = factory.create_fresh();
        let other_ref = factory.create_fresh();

        let plain = FieldRef::instance("A", "f", "I");
        let final_field = FieldRef::instance("A", "g", "I").with_final();
        let value = factory.create_fresh();

        frame.add_available_load(AvailableLoad::instance_load(reference, plain.clone()), vec![value]);
        frame.add_available_load(
            AvailableLoad::instance_load(reference, final_field.clone()),
            vec![value],
        );
        frame.add_available_load(AvailableLoad::instance_load(other_ref, plain.clone()), vec![value]);

        // Kills by reference spare finals and other references
        frame.kill_all_loads_of(Some(reference));
        assert!(frame
            .available_load(&AvailableLoad::instance_load(reference, plain.clone()))
            .is_none());
        assert!(frame
            .available_load(&AvailableLoad::instance_load(reference, final_field.clone()))
            .is_some());
        assert!(frame
            .available_load(&AvailableLoad::instance_load(other_ref, plain.clone()))
            .is_some());

        // A general kill spares only finals
        frame.kill_all_loads();
        assert!(frame
            .available_load(&AvailableLoad::instance_load(other_ref, plain.clone()))
            .is_none());
        assert!(frame
            .available_load(&AvailableLoad::instance_load(reference, final_field))
            .is_some());
    }

    #[test]
    fn test_kill_loads_of_field_ignores_final() {
        // Store-kills apply even to final fields; the store itself proves
        // the old value stale
        let mut factory = ValueNumberFactory::new();
        let mut frame = make_valid(1, &mut factory);
        let reference = factory.create_fresh();
        let field = FieldRef::instance("A", "f", "I").with_final();
        frame.add_available_load(
            AvailableLoad::instance_load(reference, field.clone()),
            vec![factory.create_fresh()],
        );

        frame.kill_loads_of_field(&field);
        assert!(!frame.has_available_loads());
    }

    #[test]
    fn test_kill_all_loads_except_for() {
        let mut factory = ValueNumberFactory::new();
        let mut frame = make_valid(1, &mut factory);
        let monitored = factory.create_fresh();
        let other = factory.create_fresh();
        let field = FieldRef::instance("A", "f", "I");
        let value = factory.create_fresh();

        frame.add_available_load(AvailableLoad::instance_load(monitored, field.clone()), vec![value]);
        frame.add_available_load(AvailableLoad::instance_load(other, field.clone()), vec![value]);

        frame.kill_all_loads_except_for(Some(monitored));
        assert!(frame
            .available_load(&AvailableLoad::instance_load(monitored, field.clone()))
            .is_some());
        assert!(frame
            .available_load(&AvailableLoad::instance_load(other, field))
            .is_none());
    }

    #[test]
    fn test_fuzzy_match_previously_known_as() {
        let mut factory = ValueNumberFactory::new();
        let mut frame = make_valid(1, &mut factory);
        let reference = factory.create_fresh();
        let field = FieldRef::instance("A", "f", "I");
        let v1 = factory.create_fresh();

        frame.add_available_load(
            AvailableLoad::instance_load(reference, field.clone()),
            vec![v1],
        );
        // Kill the load; previously-known-as still relates the value to it
        frame.kill_all_loads();

        let v2 = factory.create_fresh();
        assert!(!frame.fuzzy_match(v1, v2));
        assert!(frame.fuzzy_match(v1, v1));

        // A second value recorded for the same location fuzzily matches
        frame.add_available_load(AvailableLoad::instance_load(reference, field), vec![v2]);
        frame.kill_all_loads();
        assert!(frame.from_matching_loads(v1, v2));
    }
}
