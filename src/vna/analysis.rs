//! The value numbering dataflow analysis.
//!
//! One forward worklist fixpoint per method: blocks are seeded in reverse
//! postorder, each visit recomputes the block's entry frame as the meet of
//! its predecessors' exit frames, runs the transfer function across the
//! block's instructions (recording the frame before and after every
//! location), and re-enqueues successors whenever the exit frame changed.
//!
//! Exception edges are special-cased: a fact merged into an exception
//! handler entry has its operand stack replaced by a single caught-exception
//! value, memoized per handler block, while the locals merge normally.
//!
//! After the fixpoint, [`ValueNumberAnalysis::compact_value_numbers`] may
//! renumber the values observed in retained frames to a dense range; this is
//! a one-time, analysis-ending operation.

use std::collections::{HashMap, VecDeque};

use crate::{
    bytecode::{Constant, MethodDesc},
    cfg::{BlockId, ControlFlowGraph, Location},
    graph::{algorithms::reverse_postorder, NodeId},
    hierarchy::LookupFailureCallback,
    vna::{
        transfer::TransferFunction, MergeTree, ValueNumber, ValueNumberCache, ValueNumberFactory,
        ValueNumberFrame,
    },
    Result,
};

/// Value numbering over one method's control flow graph.
///
/// The analysis exclusively owns its factory, cache, and merge tree; nothing
/// is shared across methods, and a run's value numbers are meaningless
/// outside it. Construct, [`execute`](Self::execute), then query frames by
/// location.
///
/// # Examples
///
/// ```rust,ignore
/// let mut analysis = ValueNumberAnalysis::new(&cfg, &method);
/// analysis.execute()?;
/// let frame = analysis.fact_at_location(Location::new(block, 0));
/// ```
pub struct ValueNumberAnalysis<'a> {
    cfg: &'a ControlFlowGraph,
    method: &'a MethodDesc,
    callback: Option<&'a dyn LookupFailureCallback>,

    factory: ValueNumberFactory,
    cache: ValueNumberCache,
    merge_tree: MergeTree,
    constants: HashMap<Constant, ValueNumber>,

    entry_values: Vec<ValueNumber>,
    this_value: Option<ValueNumber>,
    exception_values: HashMap<BlockId, ValueNumber>,

    in_facts: Vec<ValueNumberFrame>,
    out_facts: Vec<ValueNumberFrame>,
    facts_at: HashMap<Location, ValueNumberFrame>,
    facts_after: HashMap<Location, ValueNumberFrame>,
    /// Returned for locations the fixpoint never reached.
    top_frame: ValueNumberFrame,

    iterations: usize,
    compacted: bool,
}

impl<'a> ValueNumberAnalysis<'a> {
    /// Creates an analysis for one method.
    ///
    /// At entry to the method each local holds (as far as we know) a unique
    /// value, so one fresh value number is allocated per local slot; for
    /// instance methods, slot 0 is the `this` reference.
    #[must_use]
    pub fn new(cfg: &'a ControlFlowGraph, method: &'a MethodDesc) -> Self {
        let mut factory = ValueNumberFactory::new();
        let num_locals = usize::from(method.max_locals());
        let entry_values: Vec<ValueNumber> =
            (0..num_locals).map(|_| factory.create_fresh()).collect();
        let this_value = if method.is_static() {
            None
        } else {
            entry_values.first().copied()
        };

        let block_bound = cfg.block_bound();
        Self {
            cfg,
            method,
            callback: None,
            factory,
            cache: ValueNumberCache::new(),
            merge_tree: MergeTree::new(),
            constants: HashMap::new(),
            entry_values,
            this_value,
            exception_values: HashMap::new(),
            in_facts: (0..block_bound)
                .map(|_| ValueNumberFrame::new(num_locals))
                .collect(),
            out_facts: (0..block_bound)
                .map(|_| ValueNumberFrame::new(num_locals))
                .collect(),
            facts_at: HashMap::new(),
            facts_after: HashMap::new(),
            top_frame: ValueNumberFrame::new(num_locals),
            iterations: 0,
            compacted: false,
        }
    }

    /// Attaches a lookup-failure callback for symbol-resolution diagnostics.
    #[must_use]
    pub fn with_callback(mut self, callback: &'a dyn LookupFailureCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Runs the analysis to its fixpoint.
    ///
    /// # Errors
    ///
    /// Internal-consistency faults (cache inconsistency, stack accounting
    /// violations) abort the run; the method should then be skipped by the
    /// caller. Exhaustion of the worklist is the normal exit.
    pub fn execute(&mut self) -> Result<()> {
        if self.cfg.block_count() == 0 {
            return Ok(());
        }
        let entry = self.cfg.entry();

        let order = reverse_postorder(self.cfg, NodeId::new(entry.index()));
        let mut worklist: VecDeque<BlockId> =
            order.iter().map(|node| BlockId::new(node.index())).collect();
        let mut in_worklist = vec![false; self.cfg.block_bound()];
        for block in &worklist {
            in_worklist[block.index()] = true;
        }

        while let Some(block) = worklist.pop_front() {
            in_worklist[block.index()] = false;
            self.iterations += 1;

            self.compute_start_fact(block, entry)?;
            let changed = self.transfer_block(block)?;

            if changed {
                for successor in self.cfg.successors(block) {
                    if !in_worklist[successor.index()] {
                        worklist.push_back(successor);
                        in_worklist[successor.index()] = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// Recomputes the block's entry frame from its predecessors.
    ///
    /// The frame is reset to top and every predecessor exit fact is merged
    /// in; the one-merge memos stored in the frame survive the reset, which
    /// is what makes repeated merges of the same pair reuse the same merge
    /// value across iterations.
    fn compute_start_fact(&mut self, block: BlockId, entry: BlockId) -> Result<()> {
        if block == entry {
            let entry_values = self.entry_values.clone();
            self.in_facts[block.index()].init_entry(&entry_values);
            return Ok(());
        }

        let is_handler = self
            .cfg
            .block(block)
            .is_some_and(|b| b.is_exception_handler());
        let num_locals = usize::from(self.method.max_locals());

        // Handler entries need their memoized exception value before the
        // split borrows below
        let exception_value = if is_handler {
            Some(self.exception_value(block))
        } else {
            None
        };

        let in_edges: Vec<BlockId> = self.cfg.in_edges(block).map(|(_, pred, _)| pred).collect();

        let in_fact = &mut self.in_facts[block.index()];
        in_fact.make_top();

        for pred in in_edges {
            let pred_fact = &self.out_facts[pred.index()];
            if let Some(exception_value) = exception_value {
                if pred_fact.is_valid() {
                    // Clear the stack and push a single entry for the
                    // exception object; locals still merge normally
                    let mut adjusted = ValueNumberFrame::new(num_locals);
                    adjusted.copy_from(pred_fact);
                    adjusted.clear_stack();
                    adjusted.push_value(exception_value)?;
                    in_fact.merge_with(&adjusted, &mut self.factory, &mut self.merge_tree)?;
                    continue;
                }
            }
            in_fact.merge_with(pred_fact, &mut self.factory, &mut self.merge_tree)?;
        }
        Ok(())
    }

    /// Transfers the block's instructions, recording per-location frames.
    ///
    /// Returns `true` if the block's exit fact changed.
    fn transfer_block(&mut self, block: BlockId) -> Result<bool> {
        let Some(basic_block) = self.cfg.block(block) else {
            return Ok(false);
        };

        let mut fact = self.in_facts[block.index()].clone();
        if fact.is_valid() {
            let mut transfer = TransferFunction::new(
                &mut self.factory,
                &mut self.cache,
                &mut self.constants,
                self.callback,
            );
            for (index, instruction) in basic_block.instructions().iter().enumerate() {
                let location = Location::new(block, index);
                self.facts_at.insert(location, fact.clone());
                transfer.model_instruction(location, instruction, &mut fact)?;
                self.facts_after.insert(location, fact.clone());
            }
        }

        let changed = !fact.same_as(&self.out_facts[block.index()]);
        if changed {
            self.out_facts[block.index()] = fact;
        }
        Ok(changed)
    }

    /// Returns the memoized caught-exception value of a handler block.
    fn exception_value(&mut self, handler: BlockId) -> ValueNumber {
        if let Some(&value) = self.exception_values.get(&handler) {
            return value;
        }
        let value = self.factory.create_fresh();
        self.exception_values.insert(handler, value);
        value
    }

    /// Returns the frame before the instruction at a location.
    ///
    /// For locations the analysis never reached, the lattice top frame is
    /// returned rather than an absence.
    #[must_use]
    pub fn fact_at_location(&self, location: Location) -> &ValueNumberFrame {
        self.facts_at.get(&location).unwrap_or(&self.top_frame)
    }

    /// Returns the frame after the instruction at a location.
    #[must_use]
    pub fn fact_after_location(&self, location: Location) -> &ValueNumberFrame {
        self.facts_after.get(&location).unwrap_or(&self.top_frame)
    }

    /// Returns the frame at a block's entry.
    #[must_use]
    pub fn start_fact(&self, block: BlockId) -> &ValueNumberFrame {
        self.in_facts.get(block.index()).unwrap_or(&self.top_frame)
    }

    /// Returns the frame at a block's exit.
    #[must_use]
    pub fn result_fact(&self, block: BlockId) -> &ValueNumberFrame {
        self.out_facts.get(block.index()).unwrap_or(&self.top_frame)
    }

    /// Returns the entry value of a local slot.
    #[must_use]
    pub fn entry_value(&self, local: usize) -> Option<ValueNumber> {
        self.entry_values.get(local).copied()
    }

    /// Returns the value representing `this`, for instance methods.
    #[must_use]
    pub const fn this_value(&self) -> Option<ValueNumber> {
        self.this_value
    }

    /// Returns `true` if the value is the method's `this` reference.
    #[must_use]
    pub fn is_this_value(&self, value: ValueNumber) -> bool {
        self.this_value == Some(value)
    }

    /// Returns the entry value number of each declared parameter.
    ///
    /// Derived from the method signature's arity and the static-vs-instance
    /// shift; parameter `i` of the result corresponds to declared parameter
    /// `i` (the implicit receiver is [`this_value`](Self::this_value), not
    /// listed here).
    #[must_use]
    pub fn parameter_values(&self) -> Vec<ValueNumber> {
        self.method
            .parameter_slots()
            .into_iter()
            .filter_map(|slot| self.entry_value(usize::from(slot)))
            .collect()
    }

    /// Returns the number of value numbers allocated so far.
    #[must_use]
    pub const fn num_values_allocated(&self) -> u32 {
        self.factory.num_values_allocated()
    }

    /// Returns the merge tree recording phi provenance.
    #[must_use]
    pub const fn merge_tree(&self) -> &MergeTree {
        &self.merge_tree
    }

    /// Returns the number of block visits the fixpoint performed.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Renumbers the values observed in retained frames to a dense `0..k`.
    ///
    /// Values allocated during iteration but absent from every retained
    /// frame are purged. Available-load maps are purged as part of
    /// compaction; only slot-level queries remain meaningful afterwards.
    /// Must be called at most once, after [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// An internal fault if called a second time.
    pub fn compact_value_numbers(&mut self) -> Result<u32> {
        if self.compacted {
            return Err(internal_error!("value numbers were already compacted"));
        }
        self.compacted = true;

        // Discover used values in deterministic block/location order
        let mut remap: HashMap<u32, u32> = HashMap::new();
        let mut discover = |frame: &ValueNumberFrame| {
            if !frame.is_valid() {
                return;
            }
            for slot in 0..frame.num_slots() {
                if let Ok(value) = frame.value(slot) {
                    let next = remap.len() as u32;
                    remap.entry(value.number()).or_insert(next);
                }
            }
        };

        for index in 0..self.cfg.block_bound() {
            let block = BlockId::new(index);
            discover(&self.in_facts[index]);
            if let Some(basic_block) = self.cfg.block(block) {
                for i in 0..basic_block.len() {
                    let location = Location::new(block, i);
                    if let Some(frame) = self.facts_at.get(&location) {
                        discover(frame);
                    }
                    if let Some(frame) = self.facts_after.get(&location) {
                        discover(frame);
                    }
                }
            }
            discover(&self.out_facts[index]);
        }

        let count = remap.len() as u32;

        for frame in self.in_facts.iter_mut().chain(self.out_facts.iter_mut()) {
            frame.compact(&remap);
        }
        for frame in self.facts_at.values_mut().chain(self.facts_after.values_mut()) {
            frame.compact(&remap);
        }
        for value in &mut self.entry_values {
            if let Some(&new) = remap.get(&value.number()) {
                *value = ValueNumber::new(new, value.flags());
            }
        }
        self.this_value = self.this_value.and_then(|value| {
            remap
                .get(&value.number())
                .map(|&new| ValueNumber::new(new, value.flags()))
        });
        self.exception_values.retain(|_, value| {
            if let Some(&new) = remap.get(&value.number()) {
                *value = ValueNumber::new(new, value.flags());
                true
            } else {
                false
            }
        });

        self.factory.set_compacted_count(count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Instruction, Opcode};
    use crate::cfg::{BasicBlock, CfgEdgeKind};

    fn static_method(max_locals: u16) -> MethodDesc {
        MethodDesc::new("Acme", "run", "()V", true, max_locals)
    }

    fn straight_line(instructions: Vec<Instruction>) -> ControlFlowGraph {
        let mut cfg = ControlFlowGraph::new();
        cfg.add_block(BasicBlock::new(instructions));
        cfg.seal();
        cfg
    }

    #[test]
    fn test_entry_values_unique_per_local() {
        let cfg = straight_line(vec![Instruction::simple(Opcode::Return)]);
        let method = static_method(3);
        let analysis = ValueNumberAnalysis::new(&cfg, &method);

        let values: Vec<ValueNumber> = (0..3).filter_map(|i| analysis.entry_value(i)).collect();
        assert_eq!(values.len(), 3);
        assert_ne!(values[0], values[1]);
        assert_ne!(values[1], values[2]);
    }

    #[test]
    fn test_this_value_instance_vs_static() {
        let cfg = straight_line(vec![Instruction::simple(Opcode::Return)]);

        let instance = MethodDesc::new("Acme", "run", "()V", false, 1);
        let analysis = ValueNumberAnalysis::new(&cfg, &instance);
        let this = analysis.this_value().unwrap();
        assert!(analysis.is_this_value(this));
        assert_eq!(Some(this), analysis.entry_value(0));

        let static_method = static_method(1);
        let analysis = ValueNumberAnalysis::new(&cfg, &static_method);
        assert!(analysis.this_value().is_none());
    }

    #[test]
    fn test_straight_line_facts_recorded() {
        let cfg = straight_line(vec![
            Instruction::load(0, false),
            Instruction::store(1, false),
            Instruction::simple(Opcode::Return),
        ]);
        let method = static_method(2);
        let mut analysis = ValueNumberAnalysis::new(&cfg, &method);
        analysis.execute().unwrap();

        let entry0 = analysis.entry_value(0).unwrap();
        let block = cfg.entry();

        let before_store = analysis.fact_at_location(Location::new(block, 1));
        assert_eq!(before_store.top_value().unwrap(), entry0);

        let after_store = analysis.fact_after_location(Location::new(block, 1));
        assert_eq!(after_store.local(1).unwrap(), entry0);
    }

    #[test]
    fn test_unreached_location_is_top() {
        let cfg = straight_line(vec![Instruction::simple(Opcode::Return)]);
        let method = static_method(1);
        let mut analysis = ValueNumberAnalysis::new(&cfg, &method);
        analysis.execute().unwrap();

        let nowhere = Location::new(BlockId::new(7), 0);
        assert!(analysis.fact_at_location(nowhere).is_top());
    }

    #[test]
    fn test_parameter_values_follow_signature() {
        let cfg = straight_line(vec![Instruction::simple(Opcode::Return)]);
        let method = MethodDesc::new("Acme", "run", "(IJ)V", false, 4);
        let analysis = ValueNumberAnalysis::new(&cfg, &method);

        let parameters = analysis.parameter_values();
        assert_eq!(parameters.len(), 2);
        assert_eq!(Some(parameters[0]), analysis.entry_value(1));
        assert_eq!(Some(parameters[1]), analysis.entry_value(2));
    }

    #[test]
    fn test_diamond_equal_values_no_phi() {
        // if/merge where both branches store the same constant local:
        // the merged slot keeps a single value number
        let mut cfg = ControlFlowGraph::new();
        let entry = cfg.add_block(BasicBlock::new(vec![
            Instruction::ldc(Constant::Int(1)),
            Instruction::branch(Opcode::IfEq, 0),
        ]));
        let left = cfg.add_block(BasicBlock::new(vec![
            Instruction::ldc(Constant::Int(42)),
            Instruction::store(0, false),
        ]));
        let right = cfg.add_block(BasicBlock::new(vec![
            Instruction::ldc(Constant::Int(42)),
            Instruction::store(0, false),
        ]));
        let join = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Return)]));
        cfg.add_edge(entry, left, CfgEdgeKind::Branch).unwrap();
        cfg.add_edge(entry, right, CfgEdgeKind::FallThrough).unwrap();
        cfg.add_edge(left, join, CfgEdgeKind::FallThrough).unwrap();
        cfg.add_edge(right, join, CfgEdgeKind::Branch).unwrap();
        cfg.seal();

        let method = static_method(1);
        let mut analysis = ValueNumberAnalysis::new(&cfg, &method);
        analysis.execute().unwrap();

        let left_out = analysis.result_fact(left).local(0).unwrap();
        let right_out = analysis.result_fact(right).local(0).unwrap();
        assert_eq!(left_out, right_out);

        let join_in = analysis.start_fact(join).local(0).unwrap();
        assert_eq!(join_in, left_out);
        assert!(!join_in.has_flag(crate::vna::ValueFlags::PHI_NODE));
    }

    #[test]
    fn test_diamond_differing_values_one_phi() {
        let mut cfg = ControlFlowGraph::new();
        let entry = cfg.add_block(BasicBlock::new(vec![
            Instruction::ldc(Constant::Int(1)),
            Instruction::branch(Opcode::IfEq, 0),
        ]));
        let left = cfg.add_block(BasicBlock::new(vec![
            Instruction::ldc(Constant::Int(1)),
            Instruction::store(0, false),
        ]));
        let right = cfg.add_block(BasicBlock::new(vec![
            Instruction::ldc(Constant::Int(2)),
            Instruction::store(0, false),
        ]));
        let join = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Return)]));
        cfg.add_edge(entry, left, CfgEdgeKind::Branch).unwrap();
        cfg.add_edge(entry, right, CfgEdgeKind::FallThrough).unwrap();
        cfg.add_edge(left, join, CfgEdgeKind::FallThrough).unwrap();
        cfg.add_edge(right, join, CfgEdgeKind::Branch).unwrap();
        cfg.seal();

        let method = static_method(1);
        let mut analysis = ValueNumberAnalysis::new(&cfg, &method);
        analysis.execute().unwrap();

        let left_out = analysis.result_fact(left).local(0).unwrap();
        let right_out = analysis.result_fact(right).local(0).unwrap();
        assert_ne!(left_out, right_out);

        let join_in = analysis.start_fact(join).local(0).unwrap();
        assert_ne!(join_in, left_out);
        assert_ne!(join_in, right_out);
        assert!(join_in.has_flag(crate::vna::ValueFlags::PHI_NODE));

        let inputs = analysis.merge_tree().input_set(join_in);
        assert!(inputs.contains(&left_out));
        assert!(inputs.contains(&right_out));
    }

    #[test]
    fn test_loop_fixpoint_converges() {
        // entry -> head <-> body, head -> exit; the loop re-merges until
        // the memoized merge value stabilizes
        let mut cfg = ControlFlowGraph::new();
        let entry = cfg.add_block(BasicBlock::new(vec![
            Instruction::ldc(Constant::Int(0)),
            Instruction::store(0, false),
        ]));
        let head = cfg.add_block(BasicBlock::new(vec![
            Instruction::load(0, false),
            Instruction::branch(Opcode::IfEq, 0),
        ]));
        let body = cfg.add_block(BasicBlock::new(vec![Instruction::iinc(0, 1)]));
        let exit = cfg.add_block(BasicBlock::new(vec![Instruction::simple(Opcode::Return)]));
        cfg.add_edge(entry, head, CfgEdgeKind::FallThrough).unwrap();
        cfg.add_edge(head, body, CfgEdgeKind::FallThrough).unwrap();
        cfg.add_edge(head, exit, CfgEdgeKind::Branch).unwrap();
        cfg.add_edge(body, head, CfgEdgeKind::Branch).unwrap();
        cfg.seal();

        let method = static_method(1);
        let mut analysis = ValueNumberAnalysis::new(&cfg, &method);
        analysis.execute().unwrap();

        // The loop header's local 0 is a merge of the initial constant and
        // the incremented value
        let head_in = analysis.start_fact(head).local(0).unwrap();
        assert!(head_in.has_flag(crate::vna::ValueFlags::PHI_NODE));
        assert!(analysis.iterations() > cfg.block_count());
    }

    #[test]
    fn test_exception_handler_stack_replaced() {
        let mut cfg = ControlFlowGraph::new();
        let entry = cfg.add_block(BasicBlock::new(vec![
            Instruction::load(0, false),
            Instruction::load(0, false),
            // Deep stack at the point the exception edge leaves
            Instruction::simple(Opcode::Return),
        ]));
        let handler = cfg.add_block(BasicBlock::handler(vec![Instruction::simple(
            Opcode::Athrow,
        )]));
        cfg.add_edge(entry, handler, CfgEdgeKind::exception(None))
            .unwrap();
        cfg.seal();

        let method = static_method(1);
        let mut analysis = ValueNumberAnalysis::new(&cfg, &method);
        analysis.execute().unwrap();

        let handler_in = analysis.start_fact(handler);
        assert!(handler_in.is_valid());
        assert_eq!(handler_in.stack_depth(), 1);
        // Locals still merged through
        assert_eq!(
            handler_in.local(0).unwrap(),
            analysis.entry_value(0).unwrap()
        );
    }

    #[test]
    fn test_compaction_renumbers_densely() {
        let cfg = straight_line(vec![
            Instruction::ldc(Constant::Int(5)),
            Instruction::store(0, false),
            Instruction::simple(Opcode::Return),
        ]);
        let method = static_method(4);
        let mut analysis = ValueNumberAnalysis::new(&cfg, &method);
        analysis.execute().unwrap();

        let before = analysis.num_values_allocated();
        let after = analysis.compact_value_numbers().unwrap();
        assert!(after <= before);

        // All retained slot values now fall inside the dense range
        let block = cfg.entry();
        let frame = analysis.fact_after_location(Location::new(block, 1));
        for slot in 0..frame.num_slots() {
            assert!(frame.value(slot).unwrap().number() < after);
        }

        // Second compaction is a fault
        assert!(analysis.compact_value_numbers().is_err());
    }
}
