//! Instruction modeling for the value numbering analysis.
//!
//! The transfer function pops an instruction's declared inputs, consults the
//! [`ValueNumberCache`] for its outputs, and pushes them; cache misses
//! allocate fresh values and memoize them so the same instruction with the
//! same inputs always yields the same outputs (required for the fixpoint to
//! converge).
//!
//! On top of the generic path sit the special cases: local loads and stores
//! move value numbers between slots unchanged, constants are memoized per
//! constant, and field access runs the redundant-load-elimination /
//! forward-substitution heuristic. That heuristic is deliberately
//! approximate — it does not account for every way a call could mutate heap
//! state — and is preserved as such; see the kill rules below for the
//! conservative invalidations applied at calls and monitor acquisitions.

use std::collections::HashMap;

use crate::{
    bytecode::{Constant, FieldRef, Instruction, Opcode},
    cfg::Location,
    hierarchy::LookupFailureCallback,
    vna::{
        AvailableLoad, CacheEntry, ValueFlags, ValueNumber, ValueNumberCache, ValueNumberFactory,
        ValueNumberFrame,
    },
    Result,
};

/// Models the effect of single instructions on a value number frame.
///
/// Borrows the per-run factory, cache, and constant map from the analysis;
/// one transfer function serves exactly one analysis run.
pub(crate) struct TransferFunction<'a> {
    factory: &'a mut ValueNumberFactory,
    cache: &'a mut ValueNumberCache,
    constants: &'a mut HashMap<Constant, ValueNumber>,
    callback: Option<&'a dyn LookupFailureCallback>,
}

impl<'a> TransferFunction<'a> {
    pub(crate) fn new(
        factory: &'a mut ValueNumberFactory,
        cache: &'a mut ValueNumberCache,
        constants: &'a mut HashMap<Constant, ValueNumber>,
        callback: Option<&'a dyn LookupFailureCallback>,
    ) -> Self {
        Self {
            factory,
            cache,
            constants,
            callback,
        }
    }

    /// Applies one instruction to the frame in place.
    pub(crate) fn model_instruction(
        &mut self,
        location: Location,
        instruction: &Instruction,
        frame: &mut ValueNumberFrame,
    ) -> Result<()> {
        match instruction.opcode() {
            Opcode::Ldc => self.model_constant(instruction, frame),
            Opcode::Load => Self::model_local_load(instruction, frame),
            Opcode::Store => Self::model_local_store(instruction, frame),
            Opcode::Dup | Opcode::DupX1 | Opcode::Dup2 | Opcode::Swap => {
                Self::model_stack_shuffle(instruction.opcode(), frame)
            }
            Opcode::Iinc => self.model_iinc(location, instruction, frame),
            // A checked cast leaves the value and its identity untouched
            Opcode::Checkcast => Ok(()),
            Opcode::GetField | Opcode::GetStatic => {
                self.model_field_load(location, instruction, frame)
            }
            Opcode::PutField | Opcode::PutStatic => {
                self.model_field_store(location, instruction, frame)
            }
            Opcode::MonitorEnter => {
                let monitored = frame.top_value()?;
                frame.kill_all_loads_except_for(Some(monitored));
                self.model_generic(location, instruction, frame, ValueFlags::empty())
            }
            opcode if opcode.is_invoke() => self.model_invoke(location, instruction, frame),
            Opcode::AconstNull => {
                self.model_generic(location, instruction, frame, ValueFlags::CONSTANT_VALUE)
            }
            opcode if opcode.is_array_access() => {
                self.model_generic(location, instruction, frame, ValueFlags::ARRAY_VALUE)
            }
            _ => self.model_generic(location, instruction, frame, ValueFlags::empty()),
        }
    }

    /// The default modeling path: pop inputs, look up or mint outputs, push.
    fn model_generic(
        &mut self,
        location: Location,
        instruction: &Instruction,
        frame: &mut ValueNumberFrame,
        flags: ValueFlags,
    ) -> Result<()> {
        let consumed = usize::from(instruction.consumed_words());
        let produced = usize::from(instruction.produced_words());

        let inputs = Self::pop_input_values(frame, consumed)?;
        let outputs = self.output_values(location, inputs, produced, flags)?;

        if outputs.len() != produced {
            return Err(internal_error!(
                "wrong number of values produced at {}: expected {}, got {}",
                location,
                produced,
                outputs.len()
            ));
        }

        Self::push_output_values(frame, &outputs)
    }

    /// Constant pushes reuse one value number per distinct constant.
    fn model_constant(
        &mut self,
        instruction: &Instruction,
        frame: &mut ValueNumberFrame,
    ) -> Result<()> {
        let Some(constant) = instruction.constant() else {
            return Err(internal_error!("Ldc without a constant operand"));
        };

        let value = if let Constant::Class(class_name) = constant {
            self.factory.class_object_value(class_name)
        } else if let Some(&value) = self.constants.get(constant) {
            value
        } else {
            let value = self
                .factory
                .create_fresh_with_flags(ValueFlags::CONSTANT_VALUE);
            self.constants.insert(constant.clone(), value);
            value
        };

        frame.push_value(value)?;
        if constant.width() == 2 {
            // The second word of a wide constant carries the same identity
            frame.push_value(value)?;
        }
        Ok(())
    }

    /// Local loads copy the local's value numbers onto the stack unchanged.
    fn model_local_load(instruction: &Instruction, frame: &mut ValueNumberFrame) -> Result<()> {
        let Some(index) = instruction.local_index() else {
            return Err(internal_error!("Load without a local operand"));
        };
        let words = usize::from(instruction.produced_words());
        for word in 0..words {
            let value = frame.local(usize::from(index) + word)?;
            frame.push_value(value)?;
        }
        Ok(())
    }

    /// Stack shuffles rearrange or duplicate identities; a duplicated value
    /// is still the same value.
    fn model_stack_shuffle(opcode: Opcode, frame: &mut ValueNumberFrame) -> Result<()> {
        match opcode {
            Opcode::Dup => {
                let top = frame.top_value()?;
                frame.push_value(top)
            }
            Opcode::DupX1 => {
                let b = frame.pop_value()?;
                let a = frame.pop_value()?;
                frame.push_value(b)?;
                frame.push_value(a)?;
                frame.push_value(b)
            }
            Opcode::Dup2 => {
                let b = frame.stack_value(0)?;
                let a = frame.stack_value(1)?;
                frame.push_value(a)?;
                frame.push_value(b)
            }
            Opcode::Swap => {
                let b = frame.pop_value()?;
                let a = frame.pop_value()?;
                frame.push_value(b)?;
                frame.push_value(a)
            }
            _ => Err(internal_error!("not a stack shuffle: {:?}", opcode)),
        }
    }

    /// Local stores move the popped value numbers into the locals unchanged.
    fn model_local_store(instruction: &Instruction, frame: &mut ValueNumberFrame) -> Result<()> {
        let Some(index) = instruction.local_index() else {
            return Err(internal_error!("Store without a local operand"));
        };
        let words = usize::from(instruction.consumed_words());
        for word in (0..words).rev() {
            let value = frame.pop_value()?;
            frame.set_local(usize::from(index) + word, value)?;
        }
        Ok(())
    }

    /// `Iinc` runs through the cache even though its operand is a local, so
    /// the modified local gets a consistent fresh identity per input value.
    fn model_iinc(
        &mut self,
        location: Location,
        instruction: &Instruction,
        frame: &mut ValueNumberFrame,
    ) -> Result<()> {
        let (index, delta) = match *instruction.operand() {
            crate::bytecode::Operand::Iinc { index, delta } => (usize::from(index), delta),
            _ => return Err(internal_error!("Iinc without an increment operand")),
        };
        if delta == 0 {
            return Ok(());
        }

        let input = frame.local(index)?;
        let outputs = self.output_values(location, vec![input], 1, ValueFlags::empty())?;
        frame.set_local(index, outputs[0])
    }

    /// Field loads: volatile kills everything first, then the redundant
    /// load elimination heuristic short-circuits the cache when the same
    /// field of the same reference is already available.
    fn model_field_load(
        &mut self,
        location: Location,
        instruction: &Instruction,
        frame: &mut ValueNumberFrame,
    ) -> Result<()> {
        let Some(field) = instruction.field_ref().cloned() else {
            return Err(internal_error!("field load without a field operand"));
        };

        if !field.is_resolved() {
            // Degrade to opaque: report, invalidate conservatively, and
            // model through the plain cache path
            self.report_missing_class(field.class_name());
            frame.kill_all_loads();
            return self.model_generic(location, instruction, frame, ValueFlags::empty());
        }

        if field.is_volatile() {
            frame.kill_all_loads();
        }

        if !Self::eligible_for_load_elimination(&field) {
            return self.model_generic(location, instruction, frame, ValueFlags::empty());
        }

        let produced = usize::from(instruction.produced_words());
        let (load, inputs) = if instruction.opcode() == Opcode::GetField {
            let reference = frame.pop_value()?;
            (
                AvailableLoad::instance_load(reference, field),
                vec![reference],
            )
        } else {
            (AvailableLoad::static_load(field), Vec::new())
        };

        let values = match frame.available_load(&load) {
            Some(values) => values.to_vec(),
            None => {
                let outputs = self.output_values(location, inputs, produced, ValueFlags::empty())?;
                frame.add_available_load(load, outputs.clone());
                outputs
            }
        };
        Self::push_output_values(frame, &values)
    }

    /// Field stores: kill stale loads of the field, then make the stored
    /// value available for forward substitution.
    fn model_field_store(
        &mut self,
        location: Location,
        instruction: &Instruction,
        frame: &mut ValueNumberFrame,
    ) -> Result<()> {
        let Some(field) = instruction.field_ref().cloned() else {
            return Err(internal_error!("field store without a field operand"));
        };

        if !field.is_resolved() {
            self.report_missing_class(field.class_name());
            frame.kill_all_loads();
            return self.model_generic(location, instruction, frame, ValueFlags::empty());
        }

        if !Self::eligible_for_load_elimination(&field) {
            return self.model_generic(location, instruction, frame, ValueFlags::empty());
        }

        let consumed = usize::from(instruction.consumed_words());
        let inputs = Self::pop_input_values(frame, consumed)?;

        let (load, stored) = if instruction.opcode() == Opcode::PutField {
            let reference = inputs[0];
            (
                AvailableLoad::instance_load(reference, field.clone()),
                inputs[1..].to_vec(),
            )
        } else {
            (AvailableLoad::static_load(field.clone()), inputs)
        };

        // Kill all previous loads of the same field, in case of aliasing we
        // don't know about; then forward-substitute the stored value
        frame.kill_loads_of_field(&field);
        frame.add_available_load(load, stored);
        Ok(())
    }

    /// Invocations: `Class.cast` passes its argument through untouched;
    /// every other call conservatively invalidates non-final availability,
    /// plus entries keyed by the argument values specifically.
    fn model_invoke(
        &mut self,
        location: Location,
        instruction: &Instruction,
        frame: &mut ValueNumberFrame,
    ) -> Result<()> {
        if let Some(method) = instruction.method_ref() {
            if instruction.opcode() == Opcode::InvokeVirtual
                && method.name() == "cast"
                && method.class_name() == "java/lang/Class"
            {
                let value = frame.pop_value()?;
                frame.pop_value()?;
                return frame.push_value(value);
            }
        }

        let consumed = usize::from(instruction.consumed_words());
        if frame.has_available_loads() {
            let arguments = frame.top_stack_words(consumed)?;
            for argument in arguments {
                frame.kill_all_loads_of(Some(argument));
            }
            frame.kill_all_loads();
        }

        self.model_generic(location, instruction, frame, ValueFlags::RETURN_VALUE)
    }

    // Two-slot fields are excluded from the heuristic; their two value
    // numbers would alias through a single load key.
    fn eligible_for_load_elimination(field: &FieldRef) -> bool {
        field.width() == 1
    }

    fn report_missing_class(&self, class_name: &str) {
        if let Some(callback) = self.callback {
            callback.report_missing_class(class_name);
        }
    }

    fn pop_input_values(frame: &mut ValueNumberFrame, count: usize) -> Result<Vec<ValueNumber>> {
        let inputs = frame.top_stack_words(count)?;
        for _ in 0..count {
            frame.pop_value()?;
        }
        Ok(inputs)
    }

    fn push_output_values(frame: &mut ValueNumberFrame, outputs: &[ValueNumber]) -> Result<()> {
        for &output in outputs {
            frame.push_value(output)?;
        }
        Ok(())
    }

    /// Cache consultation: hit reuses the memoized outputs, miss mints fresh
    /// values and memoizes them.
    fn output_values(
        &mut self,
        location: Location,
        inputs: Vec<ValueNumber>,
        produced: usize,
        flags: ValueFlags,
    ) -> Result<Vec<ValueNumber>> {
        let entry = CacheEntry::new(location, inputs);
        if let Some(outputs) = self.cache.lookup(&entry) {
            return Ok(outputs.to_vec());
        }

        let outputs: Vec<ValueNumber> = (0..produced)
            .map(|_| self.factory.create_fresh_with_flags(flags))
            .collect();
        self.cache.memoize(entry, outputs.clone())?;
        Ok(outputs)
    }
}
