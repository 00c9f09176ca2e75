//! Nondeterministic pattern search over control-flow paths.
//!
//! The matcher executes a [`ByteCodePattern`] against every path through a
//! method: every instruction of every block is a candidate match origin, and
//! from each origin an explicit work stack of forkable [`MatchState`]s
//! explores the alternatives (no host recursion, so search depth is bounded
//! by the work stack, not the call stack).
//!
//! At each step a state considers two alternatives:
//!
//! 1. **Fork** — if the current element has matched at least `min_occur`
//!    times, advance to the next pattern element without consuming an
//!    instruction. A state forks at most once per occurrence count, which is
//!    what keeps the alternatives duplicate-free.
//! 2. **Consume** — if the current element has matched fewer than
//!    `max_occur` times, try to match the next instruction in program
//!    order. When the block is exhausted, the search continues into every
//!    successor that is not reached by a back edge — unless the most
//!    recently matched element forbids trailing edges.
//!
//! A "dominated-by" constraint replaces the sequential scan in (2): the
//!    engine instead tries every instruction of every block dominated by the
//!    block of the previously labeled match.
//!
//! Search exhaustion is a normal empty result. A missing dataflow fact
//! aborts the attempt for that origin only.

use std::rc::Rc;

use crate::{
    cfg::{BlockId, ControlFlowGraph, Location},
    graph::{algorithms::DominatorTree, NodeId},
    hierarchy::{ClassHierarchy, LookupFailureCallback, SilentLookupFailureCallback},
    pattern::{
        element::MatchContext, ByteCodePattern, ByteCodePatternMatch, BindingSet,
        PatternElementMatch,
    },
    vna::ValueNumberAnalysis,
};

/// One point in the search space: pattern progress plus CFG position.
#[derive(Clone)]
struct MatchState {
    /// Current block.
    block: BlockId,
    /// Index of the next instruction to try within the block.
    index: usize,
    /// Index of the current pattern element.
    element: usize,
    /// How many instructions the current element has matched.
    occurrences: usize,
    /// Backward chain of successful element matches.
    matched: Option<Rc<PatternElementMatch>>,
    /// Bindings accumulated so far.
    bindings: BindingSet,
    /// Whether this state may still fork at the current occurrence count.
    can_fork: bool,
}

/// Executes a [`ByteCodePattern`] against one method.
///
/// Borrows the control flow graph, the per-location value number frames, and
/// the dominance fact; all are read-only for the duration of the search.
///
/// # Examples
///
/// ```rust,ignore
/// let matcher = PatternMatcher::new(&pattern, &cfg, &analysis, &dominators);
/// for matched in matcher.execute() {
///     println!("bound: {:?}", matched.binding("$obj"));
/// }
/// ```
pub struct PatternMatcher<'a> {
    pattern: &'a ByteCodePattern,
    cfg: &'a ControlFlowGraph,
    analysis: &'a ValueNumberAnalysis<'a>,
    dominators: &'a DominatorTree,
    hierarchy: Option<&'a ClassHierarchy>,
    callback: &'a dyn LookupFailureCallback,
}

impl<'a> PatternMatcher<'a> {
    /// Creates a matcher for one `(pattern, CFG, analysis)` triple.
    ///
    /// # Arguments
    ///
    /// * `pattern` - The pattern to execute
    /// * `cfg` - The sealed control flow graph
    /// * `analysis` - The executed value numbering analysis
    /// * `dominators` - Dominance facts over the CFG's blocks
    #[must_use]
    pub fn new(
        pattern: &'a ByteCodePattern,
        cfg: &'a ControlFlowGraph,
        analysis: &'a ValueNumberAnalysis<'a>,
        dominators: &'a DominatorTree,
    ) -> Self {
        Self {
            pattern,
            cfg,
            analysis,
            dominators,
            hierarchy: None,
            callback: &SilentLookupFailureCallback,
        }
    }

    /// Attaches a class hierarchy snapshot for subtype predicates.
    #[must_use]
    pub fn with_hierarchy(mut self, hierarchy: &'a ClassHierarchy) -> Self {
        self.hierarchy = Some(hierarchy);
        self
    }

    /// Attaches a lookup-failure callback.
    #[must_use]
    pub fn with_callback(mut self, callback: &'a dyn LookupFailureCallback) -> Self {
        self.callback = callback;
        self
    }

    /// Runs the search, returning every completed match.
    ///
    /// Exhaustion is an empty vector, not an error. Origins whose dataflow
    /// facts are missing are skipped; the rest of the search proceeds.
    #[must_use]
    pub fn execute(&self) -> Vec<ByteCodePatternMatch> {
        let mut results = Vec::new();
        if self.pattern.is_empty() {
            return results;
        }

        for block in self.cfg.blocks() {
            let Some(basic_block) = self.cfg.block(block) else {
                continue;
            };
            for origin in 0..basic_block.len() {
                self.search_from(block, origin, &mut results);
            }
        }
        results
    }

    /// Explores every alternative reachable from one origin.
    fn search_from(&self, block: BlockId, origin: usize, results: &mut Vec<ByteCodePatternMatch>) {
        let elements = self.pattern.elements();
        let mut stack = vec![MatchState {
            block,
            index: origin,
            element: 0,
            occurrences: 0,
            matched: None,
            bindings: BindingSet::new(),
            can_fork: true,
        }];

        while let Some(state) = stack.pop() {
            if state.element >= elements.len() {
                results.push(ByteCodePatternMatch::from_chain(
                    state.matched.as_ref(),
                    state.bindings,
                ));
                continue;
            }
            let element = &elements[state.element];

            // Alternative 1: advance the pattern without consuming
            if state.can_fork && state.occurrences >= element.min_occur() {
                stack.push(MatchState {
                    element: state.element + 1,
                    occurrences: 0,
                    can_fork: true,
                    ..state.clone()
                });
            }

            // Alternative 2: consume another instruction
            if state.occurrences >= element.max_occur() {
                continue;
            }

            if element.dominated_by_label().is_some() {
                if !self.consume_dominated(&state, &mut stack) {
                    return;
                }
                continue;
            }

            let block_len = self
                .cfg
                .block(state.block)
                .map_or(0, crate::cfg::BasicBlock::len);
            if state.index < block_len {
                if !self.consume_at(
                    &state,
                    Location::new(state.block, state.index),
                    &mut stack,
                ) {
                    return;
                }
            } else {
                self.continue_into_successors(&state, &mut stack);
            }
        }
    }

    /// Tries to match the current element at a specific location, pushing
    /// the advanced state on success.
    ///
    /// Returns `false` on a dataflow-fact error, which aborts the current
    /// origin's attempt.
    fn consume_at(&self, state: &MatchState, location: Location, stack: &mut Vec<MatchState>) -> bool {
        let elements = self.pattern.elements();
        let element = &elements[state.element];
        let Some(instruction) = self.cfg.instruction(location) else {
            return true;
        };

        let before = self.analysis.fact_at_location(location);
        let after = self.analysis.fact_after_location(location);
        let context = MatchContext {
            hierarchy: self.hierarchy,
            callback: self.callback,
        };

        match element.matches(instruction, before, after, &state.bindings, &context) {
            Ok(Some(bindings)) => {
                let matched = Rc::new(PatternElementMatch::new(
                    state.element,
                    element.label_name().map(std::sync::Arc::from),
                    location,
                    state.occurrences,
                    state.matched.clone(),
                ));
                stack.push(MatchState {
                    block: location.block,
                    index: location.index + 1,
                    element: state.element,
                    occurrences: state.occurrences + 1,
                    matched: Some(matched),
                    bindings,
                    can_fork: true,
                });
                true
            }
            Ok(None) => true,
            Err(_) => false,
        }
    }

    /// Consumption under a dominated-by constraint: every instruction of
    /// every block dominated by the labeled match's block is a candidate.
    fn consume_dominated(&self, state: &MatchState, stack: &mut Vec<MatchState>) -> bool {
        let elements = self.pattern.elements();
        let element = &elements[state.element];
        let Some(label) = element.dominated_by_label() else {
            return true;
        };

        let Some(anchor) = state
            .matched
            .as_ref()
            .and_then(|chain| chain.find_labeled(label))
        else {
            // Nothing matched under the label yet; this alternative is dead
            return true;
        };
        let anchor_block = anchor.location().block;

        for node in self.dominators.dominated_nodes(NodeId::new(anchor_block.index())) {
            let candidate_block = BlockId::new(node.index());
            let Some(basic_block) = self.cfg.block(candidate_block) else {
                continue;
            };
            for index in 0..basic_block.len() {
                if !self.consume_at(state, Location::new(candidate_block, index), stack) {
                    return false;
                }
            }
        }
        true
    }

    /// Continues the search into every successor not reached by a back
    /// edge, unless the most recently matched element forbids trailing
    /// edges.
    fn continue_into_successors(&self, state: &MatchState, stack: &mut Vec<MatchState>) {
        let elements = self.pattern.elements();
        if let Some(last) = state.matched.as_ref() {
            if !elements[last.element_index()].trailing_edges_allowed() {
                return;
            }
        }

        for (edge, successor, _) in self.cfg.out_edges(state.block) {
            if self.cfg.is_back_edge(edge) {
                continue;
            }
            // The fork at this occurrence count already happened before
            // crossing the edge; crossing must not re-enable it
            stack.push(MatchState {
                block: successor,
                index: 0,
                can_fork: false,
                ..state.clone()
            });
        }
    }
}
