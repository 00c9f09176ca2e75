//! Pattern variables and persistent binding sets.
//!
//! A [`BindingSet`] is an immutable, prepend-only chain of name→variable
//! bindings with structural sharing: forking a search state costs one
//! reference-count bump, not a copy, which is what keeps the backtracking
//! search cheap. Lookup walks the chain.
//!
//! Consistency is the invariant the matcher leans on: a name bound once can
//! only be re-bound to the same variable; attempting to bind it to a
//! different value fails the element that tried.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::{bytecode::FieldRef, vna::ValueNumber};

/// A concrete entity a pattern variable is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    /// A runtime value, identified by its value number.
    Value(ValueNumber),
    /// A field identity.
    Field(FieldRef),
}

impl Variable {
    /// Returns `true` if the two variables denote the same entity.
    ///
    /// Values compare by value number; fields by symbolic identity.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Field(field) => write!(f, "{field}"),
        }
    }
}

/// One variable-name to variable association.
#[derive(Debug, Clone)]
pub struct Binding {
    name: Arc<str>,
    variable: Variable,
}

impl Binding {
    /// Creates a binding.
    #[must_use]
    pub fn new(name: &str, variable: Variable) -> Self {
        Self {
            name: Arc::from(name),
            variable,
        }
    }

    /// Returns the variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bound variable.
    #[must_use]
    pub const fn variable(&self) -> &Variable {
        &self.variable
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.variable)
    }
}

struct BindingNode {
    binding: Binding,
    parent: Option<Rc<BindingNode>>,
}

/// An immutable chain of bindings with O(1) fork.
///
/// Cloning shares structure; prepending allocates one node. Empty sets are
/// free.
#[derive(Clone, Default)]
pub struct BindingSet {
    head: Option<Rc<BindingNode>>,
}

impl BindingSet {
    /// Creates an empty binding set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the variable bound to a name, walking the chain.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        let mut current = self.head.as_ref();
        while let Some(node) = current {
            if node.binding.name() == name {
                return Some(node.binding.variable());
            }
            current = node.parent.as_ref();
        }
        None
    }

    /// Binds a name, enforcing consistency with any existing binding.
    ///
    /// Returns the extended set, the unchanged set when the name is already
    /// bound to the same variable, or `None` when the name is bound to a
    /// different variable (the match fails).
    #[must_use]
    pub fn bind(&self, name: &str, variable: Variable) -> Option<Self> {
        match self.lookup(name) {
            Some(existing) => {
                if existing.same_as(&variable) {
                    Some(self.clone())
                } else {
                    None
                }
            }
            None => Some(Self {
                head: Some(Rc::new(BindingNode {
                    binding: Binding::new(name, variable),
                    parent: self.head.clone(),
                })),
            }),
        }
    }

    /// Returns `true` if no names are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns an iterator over the bindings, most recent first.
    pub fn iter(&self) -> BindingIter<'_> {
        BindingIter {
            current: self.head.as_deref(),
        }
    }
}

impl fmt::Debug for BindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Display for BindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, binding) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{binding}")?;
        }
        write!(f, "}}")
    }
}

/// Iterator over a binding chain, most recent binding first.
pub struct BindingIter<'a> {
    current: Option<&'a BindingNode>,
}

impl<'a> Iterator for BindingIter<'a> {
    type Item = &'a Binding;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = node.parent.as_deref();
        Some(&node.binding)
    }
}
