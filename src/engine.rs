//! Batch analysis driver.
//!
//! The core subsystems are single-threaded and side-effect-local to one
//! method; concurrency belongs to the caller. This module is that caller's
//! convenience: it bundles one method with its control flow graph into a
//! [`MethodUnit`] and fans independent units across a rayon pool, each unit
//! exclusively owning its value number factory, cache, and merge tree.
//!
//! A fatal error in one unit (a malformed instruction stream, an internal
//! consistency fault) is surfaced in that unit's result slot; sibling units
//! are unaffected.

use rayon::prelude::*;

use crate::{
    bytecode::MethodDesc,
    cfg::ControlFlowGraph,
    graph::{algorithms::DominatorTree, NodeId},
    hierarchy::ClassHierarchy,
    pattern::{ByteCodePattern, ByteCodePatternMatch, PatternMatcher},
    vna::ValueNumberAnalysis,
    Result,
};

/// One independent unit of analysis work: a method and its CFG.
#[derive(Debug, Clone)]
pub struct MethodUnit {
    method: MethodDesc,
    cfg: ControlFlowGraph,
}

impl MethodUnit {
    /// Creates a unit, sealing the CFG if the caller has not.
    #[must_use]
    pub fn new(method: MethodDesc, mut cfg: ControlFlowGraph) -> Self {
        if !cfg.is_sealed() {
            cfg.seal();
        }
        Self { method, cfg }
    }

    /// Returns the method descriptor.
    #[must_use]
    pub const fn method(&self) -> &MethodDesc {
        &self.method
    }

    /// Returns the sealed control flow graph.
    #[must_use]
    pub const fn cfg(&self) -> &ControlFlowGraph {
        &self.cfg
    }

    /// Computes the dominator tree of the unit's CFG.
    #[must_use]
    pub fn dominators(&self) -> DominatorTree {
        DominatorTree::compute(&self.cfg, NodeId::new(self.cfg.entry().index()))
    }
}

/// Runs one pattern against one method, end to end.
///
/// Executes the value numbering analysis, computes dominators, and runs the
/// pattern search.
///
/// # Arguments
///
/// * `unit` - The method unit
/// * `pattern` - The pattern to execute
/// * `hierarchy` - Optional class hierarchy snapshot for subtype predicates
///
/// # Errors
///
/// Propagates fatal analysis errors for this unit; an empty match list is a
/// normal outcome, not an error.
pub fn execute_pattern(
    unit: &MethodUnit,
    pattern: &ByteCodePattern,
    hierarchy: Option<&ClassHierarchy>,
) -> Result<Vec<ByteCodePatternMatch>> {
    let mut analysis = ValueNumberAnalysis::new(unit.cfg(), unit.method());
    analysis.execute()?;
    let dominators = unit.dominators();

    let mut matcher = PatternMatcher::new(pattern, unit.cfg(), &analysis, &dominators);
    if let Some(hierarchy) = hierarchy {
        matcher = matcher.with_hierarchy(hierarchy);
    }
    Ok(matcher.execute())
}

/// Analyzes a batch of independent method units in parallel.
///
/// Each unit gets its own analysis run; the caller's closure consumes the
/// completed analysis and produces whatever per-method summary it needs.
/// Results arrive in unit order, one `Result` per unit.
///
/// # Arguments
///
/// * `units` - The independent units of work
/// * `consume` - Maps each unit's completed analysis to a summary
pub fn analyze_methods<T, F>(units: &[MethodUnit], consume: F) -> Vec<Result<T>>
where
    T: Send,
    F: Fn(&MethodUnit, &ValueNumberAnalysis<'_>) -> T + Sync,
{
    units
        .par_iter()
        .map(|unit| {
            let mut analysis = ValueNumberAnalysis::new(unit.cfg(), unit.method());
            analysis.execute()?;
            Ok(consume(unit, &analysis))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{Instruction, Opcode};
    use crate::cfg::BasicBlock;

    fn unit(locals: u16, instructions: Vec<Instruction>) -> MethodUnit {
        let mut cfg = ControlFlowGraph::new();
        cfg.add_block(BasicBlock::new(instructions));
        MethodUnit::new(MethodDesc::new("Acme", "run", "()V", true, locals), cfg)
    }

    #[test]
    fn test_unit_seals_cfg() {
        let unit = unit(1, vec![Instruction::simple(Opcode::Return)]);
        assert!(unit.cfg().is_sealed());
    }

    #[test]
    fn test_analyze_methods_batch() {
        let units: Vec<MethodUnit> = (0..8)
            .map(|_| {
                unit(
                    2,
                    vec![
                        Instruction::load(0, false),
                        Instruction::store(1, false),
                        Instruction::simple(Opcode::Return),
                    ],
                )
            })
            .collect();

        let results = analyze_methods(&units, |_, analysis| analysis.num_values_allocated());
        assert_eq!(results.len(), 8);
        for result in results {
            assert!(result.unwrap() >= 2);
        }
    }

    #[test]
    fn test_batch_isolates_value_numbers() {
        // Two identical methods get independent numbering runs whose
        // allocation counts agree but whose state is never shared
        let units = vec![
            unit(1, vec![Instruction::load(0, false), Instruction::simple(Opcode::Pop)]),
            unit(1, vec![Instruction::load(0, false), Instruction::simple(Opcode::Pop)]),
        ];

        let counts = analyze_methods(&units, |_, analysis| analysis.num_values_allocated());
        let first = counts[0].as_ref().unwrap();
        let second = counts[1].as_ref().unwrap();
        assert_eq!(first, second);
    }
}
