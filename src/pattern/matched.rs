//! Match records.
//!
//! During the search, successful element matches accumulate in an immutable
//! backward-linked chain ([`PatternElementMatch`]) so that forking a search
//! state shares the history instead of copying it. A completed match is
//! materialized into a [`ByteCodePatternMatch`] with the history in forward
//! order and the final bindings.

use std::rc::Rc;
use std::sync::Arc;

use crate::{
    cfg::Location,
    pattern::{BindingSet, Variable},
};

/// One successful element match, linked backward to its predecessor.
#[derive(Debug)]
pub struct PatternElementMatch {
    element_index: usize,
    label: Option<Arc<str>>,
    location: Location,
    occurrence: usize,
    prev: Option<Rc<PatternElementMatch>>,
}

impl PatternElementMatch {
    /// Creates a match record extending a chain.
    #[must_use]
    pub fn new(
        element_index: usize,
        label: Option<Arc<str>>,
        location: Location,
        occurrence: usize,
        prev: Option<Rc<PatternElementMatch>>,
    ) -> Self {
        Self {
            element_index,
            label,
            location,
            occurrence,
            prev,
        }
    }

    /// Returns the index of the pattern element that matched.
    #[must_use]
    pub const fn element_index(&self) -> usize {
        self.element_index
    }

    /// Returns the matched element's label, if it had one.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the location of the matched instruction.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Returns which occurrence of the element this match was (0-based).
    #[must_use]
    pub const fn occurrence(&self) -> usize {
        self.occurrence
    }

    /// Returns the previous match in the chain.
    #[must_use]
    pub fn prev(&self) -> Option<&Rc<PatternElementMatch>> {
        self.prev.as_ref()
    }

    /// Walks the chain backward looking for the most recent match with the
    /// given label.
    #[must_use]
    pub fn find_labeled(&self, label: &str) -> Option<&PatternElementMatch> {
        let mut current = Some(self);
        while let Some(node) = current {
            if node.label() == Some(label) {
                return Some(node);
            }
            current = node.prev.as_deref();
        }
        None
    }
}

/// One instruction matched by one pattern element, in a completed match.
#[derive(Debug, Clone)]
pub struct MatchedInstruction {
    /// Index of the pattern element that matched.
    pub element_index: usize,
    /// The element's label, if any.
    pub label: Option<Arc<str>>,
    /// Location of the matched instruction.
    pub location: Location,
    /// Which occurrence of the element this was (0-based).
    pub occurrence: usize,
}

/// A completed pattern match.
///
/// Exposes the full match history in program-match order and the final
/// binding set, with lookups by pattern label and variable name.
#[derive(Debug)]
pub struct ByteCodePatternMatch {
    bindings: BindingSet,
    matches: Vec<MatchedInstruction>,
}

impl ByteCodePatternMatch {
    /// Materializes a completed match from the backward chain.
    #[must_use]
    pub fn from_chain(chain: Option<&Rc<PatternElementMatch>>, bindings: BindingSet) -> Self {
        let mut matches = Vec::new();
        let mut current = chain;
        while let Some(node) = current {
            matches.push(MatchedInstruction {
                element_index: node.element_index(),
                label: node.label.clone(),
                location: node.location(),
                occurrence: node.occurrence(),
            });
            current = node.prev();
        }
        matches.reverse();
        Self { bindings, matches }
    }

    /// Returns the final binding set.
    #[must_use]
    pub const fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    /// Looks up the variable bound to a pattern variable name.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&Variable> {
        self.bindings.lookup(name)
    }

    /// Returns the matched instructions in match order.
    #[must_use]
    pub fn matched_instructions(&self) -> &[MatchedInstruction] {
        &self.matches
    }

    /// Returns the first instruction matched under the given label.
    #[must_use]
    pub fn first_matched(&self, label: &str) -> Option<Location> {
        self.matches
            .iter()
            .find(|m| m.label.as_deref() == Some(label))
            .map(|m| m.location)
    }

    /// Returns the last instruction matched under the given label.
    #[must_use]
    pub fn last_matched(&self, label: &str) -> Option<Location> {
        self.matches
            .iter()
            .rev()
            .find(|m| m.label.as_deref() == Some(label))
            .map(|m| m.location)
    }
}
