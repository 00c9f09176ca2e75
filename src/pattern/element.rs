//! Pattern elements: the units of a declarative instruction pattern.
//!
//! A [`PatternElement`] matches between `min_occur` and `max_occur`
//! consecutive instructions. Its matching behavior is a closed
//! [`ElementKind`] sum — wildcards, opcode sets, invocations, field loads
//! and stores, object creation, monitor acquisition, and null-check
//! branches — so exhaustiveness is checked by the compiler rather than by an
//! `instanceof` chain.
//!
//! Elements that recognize values bind them to named pattern variables;
//! binding an already-bound name to a different value number fails the
//! element (see [`BindingSet::bind`]).
//!
//! # Name predicates
//!
//! Class, method, and signature predicates follow a small string syntax:
//! a leading `/` makes the rest a regular expression, a leading `+` (class
//! predicates only) requires "is a subtype of", and anything else matches
//! exactly.

use std::sync::Arc;

use bitflags::bitflags;
use regex::Regex;

use crate::{
    bytecode::{Instruction, Opcode},
    hierarchy::{ClassHierarchy, LookupFailureCallback},
    pattern::{BindingSet, Variable},
    vna::ValueNumberFrame,
    Result,
};

bitflags! {
    /// Selector for which invocation shapes an `Invoke` element accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InvokeMode: u8 {
        /// Ordinary instance invocation (virtual, interface, or special
        /// dispatch that is not a constructor).
        const INSTANCE = 0x01;
        /// Static invocation.
        const STATIC = 0x02;
        /// Constructor invocation (`<init>` via special dispatch).
        const CONSTRUCTOR = 0x04;
    }
}

/// A predicate over method or signature names.
#[derive(Debug, Clone)]
pub enum NameMatch {
    /// Matches the exact string.
    Exact(String),
    /// Matches by regular expression.
    Regex(Regex),
    /// Matches anything.
    Any,
}

impl NameMatch {
    /// Parses the predicate syntax: leading `/` introduces a regex.
    ///
    /// An unparsable regex degrades to a never-matching predicate rather
    /// than failing pattern construction.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_prefix('/') {
            Some(regex) => Regex::new(regex).map_or(Self::Exact(String::from("\u{0}")), Self::Regex),
            None => Self::Exact(pattern.to_owned()),
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == name,
            Self::Regex(regex) => regex.is_match(name),
            Self::Any => true,
        }
    }
}

/// A predicate over class names, adding subtype matching.
#[derive(Debug, Clone)]
pub enum ClassMatch {
    /// Matches the exact class name.
    Exact(String),
    /// Matches class names by regular expression.
    Regex(Regex),
    /// Matches any class that is a subtype of the named class.
    Subtype(String),
    /// Matches anything.
    Any,
}

impl ClassMatch {
    /// Parses the predicate syntax: leading `+` requires a subtype, leading
    /// `/` introduces a regex.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        if let Some(superclass) = pattern.strip_prefix('+') {
            return Self::Subtype(superclass.to_owned());
        }
        match pattern.strip_prefix('/') {
            Some(regex) => Regex::new(regex).map_or(Self::Exact(String::from("\u{0}")), Self::Regex),
            None => Self::Exact(pattern.to_owned()),
        }
    }

    fn matches(&self, class_name: &str, context: &MatchContext<'_>) -> bool {
        match self {
            Self::Exact(exact) => exact == class_name,
            Self::Regex(regex) => regex.is_match(class_name),
            Self::Subtype(superclass) => match context.hierarchy {
                Some(hierarchy) => hierarchy.is_subtype(class_name, superclass, context.callback),
                None => {
                    // No snapshot available: report and fail the match
                    context.callback.report_missing_class(class_name);
                    false
                }
            },
            Self::Any => true,
        }
    }
}

/// Shared read-only resources for element matching.
pub struct MatchContext<'a> {
    /// Class hierarchy snapshot for subtype predicates, if available.
    pub hierarchy: Option<&'a ClassHierarchy>,
    /// Receiver for symbol-resolution failures.
    pub callback: &'a dyn LookupFailureCallback,
}

/// The matching behavior of a pattern element.
#[derive(Debug, Clone)]
pub enum ElementKind {
    /// Matches any instruction.
    Wild,
    /// Matches instructions with one of the given opcodes.
    Op(Vec<Opcode>),
    /// Matches a method invocation by class/name/signature predicates and
    /// invocation mode, optionally binding the receiver value.
    Invoke {
        /// Predicate on the invoked class.
        class: ClassMatch,
        /// Predicate on the method name.
        name: NameMatch,
        /// Predicate on the method signature.
        signature: NameMatch,
        /// Accepted invocation shapes.
        mode: InvokeMode,
        /// Variable bound to the receiver's value number, when the
        /// invocation has a receiver.
        receiver_var: Option<Arc<str>>,
    },
    /// Matches a field load, binding the field and the loaded value.
    Load {
        /// Variable bound to the field identity.
        field_var: Arc<str>,
        /// Variable bound to the loaded value number.
        value_var: Arc<str>,
    },
    /// Matches a field store, binding the field and the stored value.
    Store {
        /// Variable bound to the field identity.
        field_var: Arc<str>,
        /// Variable bound to the stored value number.
        value_var: Arc<str>,
    },
    /// Matches an object creation, binding the constructed value.
    New {
        /// Variable bound to the freshly allocated value number.
        value_var: Arc<str>,
    },
    /// Matches a monitor acquisition, binding the monitored reference.
    MonitorEnter {
        /// Variable bound to the monitored value number.
        value_var: Arc<str>,
    },
    /// Matches a null-check branch, binding the tested reference.
    IfNull {
        /// Variable bound to the tested value number.
        value_var: Arc<str>,
    },
    /// Matches if any child element matches; first match wins.
    ///
    /// Occurrence bounds of the children are ignored; a `MatchAny` element
    /// itself always matches exactly one instruction.
    MatchAny(Vec<PatternElement>),
}

/// One unit of a declarative bytecode pattern.
#[derive(Debug, Clone)]
pub struct PatternElement {
    kind: ElementKind,
    label: Option<Arc<str>>,
    min_occur: usize,
    max_occur: usize,
    dominated_by: Option<Arc<str>>,
    allow_trailing_edges: bool,
}

impl PatternElement {
    fn with_kind(kind: ElementKind) -> Self {
        Self {
            kind,
            label: None,
            min_occur: 1,
            max_occur: 1,
            dominated_by: None,
            allow_trailing_edges: true,
        }
    }

    /// Creates a wildcard matching zero to `max` arbitrary instructions.
    #[must_use]
    pub fn wild(max: usize) -> Self {
        let mut element = Self::with_kind(ElementKind::Wild);
        element.min_occur = 0;
        element.max_occur = max;
        element
    }

    /// Creates an exact-opcode element.
    #[must_use]
    pub fn op(opcodes: &[Opcode]) -> Self {
        Self::with_kind(ElementKind::Op(opcodes.to_vec()))
    }

    /// Creates a method-invocation element.
    ///
    /// # Arguments
    ///
    /// * `class` - Class predicate (`+Super` for subtype, `/re/` for regex)
    /// * `name` - Method name predicate
    /// * `signature` - Signature predicate
    /// * `mode` - Accepted invocation shapes
    #[must_use]
    pub fn invoke(class: &str, name: &str, signature: &str, mode: InvokeMode) -> Self {
        Self::with_kind(ElementKind::Invoke {
            class: ClassMatch::parse(class),
            name: NameMatch::parse(name),
            signature: NameMatch::parse(signature),
            mode,
            receiver_var: None,
        })
    }

    /// Binds the invocation's receiver value to a variable.
    ///
    /// Only meaningful on invoke elements; ties a constructor call back to
    /// the `New` that produced its receiver.
    #[must_use]
    pub fn receiver(mut self, variable: &str) -> Self {
        if let ElementKind::Invoke { receiver_var, .. } = &mut self.kind {
            *receiver_var = Some(Arc::from(variable));
        }
        self
    }

    /// Creates a field-load element binding field and loaded value.
    #[must_use]
    pub fn load(field_var: &str, value_var: &str) -> Self {
        Self::with_kind(ElementKind::Load {
            field_var: Arc::from(field_var),
            value_var: Arc::from(value_var),
        })
    }

    /// Creates a field-store element binding field and stored value.
    #[must_use]
    pub fn store(field_var: &str, value_var: &str) -> Self {
        Self::with_kind(ElementKind::Store {
            field_var: Arc::from(field_var),
            value_var: Arc::from(value_var),
        })
    }

    /// Creates an object-creation element binding the constructed value.
    #[must_use]
    pub fn new_object(value_var: &str) -> Self {
        Self::with_kind(ElementKind::New {
            value_var: Arc::from(value_var),
        })
    }

    /// Creates a monitor-acquisition element binding the monitored value.
    #[must_use]
    pub fn monitor_enter(value_var: &str) -> Self {
        Self::with_kind(ElementKind::MonitorEnter {
            value_var: Arc::from(value_var),
        })
    }

    /// Creates a null-check element binding the tested value.
    ///
    /// Matches both polarities of the branch.
    #[must_use]
    pub fn if_null(value_var: &str) -> Self {
        Self::with_kind(ElementKind::IfNull {
            value_var: Arc::from(value_var),
        })
    }

    /// Creates an element matching if any of the children matches.
    #[must_use]
    pub fn match_any(children: Vec<PatternElement>) -> Self {
        Self::with_kind(ElementKind::MatchAny(children))
    }

    /// Labels the element for later cross-referencing.
    #[must_use]
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(Arc::from(label));
        self
    }

    /// Sets the occurrence window.
    ///
    /// `MatchAny` elements keep their fixed single occurrence.
    #[must_use]
    pub fn occurrences(mut self, min: usize, max: usize) -> Self {
        if !matches!(self.kind, ElementKind::MatchAny(_)) {
            self.min_occur = min;
            self.max_occur = max;
        }
        self
    }

    /// Constrains matches to blocks dominated by a previously labeled match.
    #[must_use]
    pub fn dominated_by(mut self, label: &str) -> Self {
        self.dominated_by = Some(Arc::from(label));
        self
    }

    /// Controls whether the search may continue across control edges after
    /// this element matched.
    #[must_use]
    pub fn allow_trailing_edges(mut self, allow: bool) -> Self {
        self.allow_trailing_edges = allow;
        self
    }

    /// Returns the element's label, if any.
    #[must_use]
    pub fn label_name(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the minimum number of instructions this element must match.
    #[must_use]
    pub const fn min_occur(&self) -> usize {
        self.min_occur
    }

    /// Returns the maximum number of instructions this element may match.
    #[must_use]
    pub const fn max_occur(&self) -> usize {
        self.max_occur
    }

    /// Returns the dominating label constraint, if any.
    #[must_use]
    pub fn dominated_by_label(&self) -> Option<&str> {
        self.dominated_by.as_deref()
    }

    /// Returns `true` if the search may cross control edges after this
    /// element matched.
    #[must_use]
    pub const fn trailing_edges_allowed(&self) -> bool {
        self.allow_trailing_edges
    }

    /// Returns the element kind.
    #[must_use]
    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Matches this element against one instruction.
    ///
    /// # Arguments
    ///
    /// * `instruction` - The candidate instruction
    /// * `before` - The value number frame before the instruction
    /// * `after` - The value number frame after the instruction
    /// * `bindings` - The bindings accumulated so far
    /// * `context` - Hierarchy snapshot and failure callback
    ///
    /// # Returns
    ///
    /// The (possibly extended) binding set on a match, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Propagates missing/invalid dataflow facts; the caller aborts the
    /// match attempt for the current starting point only.
    pub fn matches(
        &self,
        instruction: &Instruction,
        before: &ValueNumberFrame,
        after: &ValueNumberFrame,
        bindings: &BindingSet,
        context: &MatchContext<'_>,
    ) -> Result<Option<BindingSet>> {
        match &self.kind {
            ElementKind::Wild => Ok(Some(bindings.clone())),

            ElementKind::Op(opcodes) => Ok(opcodes
                .contains(&instruction.opcode())
                .then(|| bindings.clone())),

            ElementKind::Invoke {
                class,
                name,
                signature,
                mode,
                receiver_var,
            } => {
                let Some(method) = instruction.method_ref() else {
                    return Ok(None);
                };
                let instruction_mode = match instruction.opcode() {
                    Opcode::InvokeStatic | Opcode::InvokeDynamic => InvokeMode::STATIC,
                    Opcode::InvokeSpecial if method.is_constructor() => InvokeMode::CONSTRUCTOR,
                    Opcode::InvokeVirtual | Opcode::InvokeSpecial | Opcode::InvokeInterface => {
                        InvokeMode::INSTANCE
                    }
                    _ => return Ok(None),
                };
                if !mode.contains(instruction_mode)
                    || !class.matches(method.class_name(), context)
                    || !name.matches(method.name())
                    || !signature.matches(method.signature())
                {
                    return Ok(None);
                }

                if let Some(receiver_var) = receiver_var {
                    if instruction_mode == InvokeMode::STATIC {
                        return Ok(None);
                    }
                    let receiver = require_fact(
                        before.stack_value(usize::from(method.argument_words())),
                    )?;
                    return Ok(bindings.bind(receiver_var, Variable::Value(receiver)));
                }
                Ok(Some(bindings.clone()))
            }

            ElementKind::Load {
                field_var,
                value_var,
            } => {
                if !instruction.opcode().is_field_load() {
                    return Ok(None);
                }
                let Some(field) = instruction.field_ref() else {
                    return Ok(None);
                };
                let loaded = require_fact(after.top_value())?;
                Ok(bindings
                    .bind(field_var, Variable::Field(field.clone()))
                    .and_then(|bindings| bindings.bind(value_var, Variable::Value(loaded))))
            }

            ElementKind::Store {
                field_var,
                value_var,
            } => {
                if !matches!(instruction.opcode(), Opcode::PutField | Opcode::PutStatic) {
                    return Ok(None);
                }
                let Some(field) = instruction.field_ref() else {
                    return Ok(None);
                };
                let stored = require_fact(before.top_value())?;
                Ok(bindings
                    .bind(field_var, Variable::Field(field.clone()))
                    .and_then(|bindings| bindings.bind(value_var, Variable::Value(stored))))
            }

            ElementKind::New { value_var } => {
                if instruction.opcode() != Opcode::New {
                    return Ok(None);
                }
                let created = require_fact(after.top_value())?;
                Ok(bindings.bind(value_var, Variable::Value(created)))
            }

            ElementKind::MonitorEnter { value_var } => {
                if instruction.opcode() != Opcode::MonitorEnter {
                    return Ok(None);
                }
                let monitored = require_fact(before.top_value())?;
                Ok(bindings.bind(value_var, Variable::Value(monitored)))
            }

            ElementKind::IfNull { value_var } => {
                if !matches!(instruction.opcode(), Opcode::IfNull | Opcode::IfNonNull) {
                    return Ok(None);
                }
                let tested = require_fact(before.top_value())?;
                Ok(bindings.bind(value_var, Variable::Value(tested)))
            }

            ElementKind::MatchAny(children) => {
                for child in children {
                    if let Some(bindings) =
                        child.matches(instruction, before, after, bindings, context)?
                    {
                        return Ok(Some(bindings));
                    }
                }
                Ok(None)
            }
        }
    }
}

// A frame error here means the dataflow fact for the location is missing or
// not valid; surface it as the dedicated pattern-level error.
fn require_fact<T>(result: Result<T>) -> Result<T> {
    result.map_err(|_| crate::Error::MissingDataflowFact)
}
