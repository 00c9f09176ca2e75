//! Control flow edge kinds.
//!
//! Edge kinds give control-flow semantics to the graph edges connecting
//! basic blocks. The value numbering analysis treats exception edges
//! specially (the operand stack is replaced by the caught exception), and
//! the pattern matcher refuses to follow back edges.

/// The kind of control flow represented by an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgEdgeKind {
    /// Sequential flow from one block into the next.
    FallThrough,
    /// A taken branch (conditional or unconditional).
    Branch,
    /// A switch case edge.
    ///
    /// Contains the case value, or `None` for the default case.
    Switch {
        /// The case value that selects this edge, or `None` for default.
        case_value: Option<i32>,
    },
    /// Edge into an exception handler.
    ///
    /// Carries the caught class name, or `None` for a catch-all handler.
    ExceptionHandler {
        /// The caught exception class, if the handler is typed.
        catch_type: Option<String>,
    },
}

impl CfgEdgeKind {
    /// Returns `true` if this edge enters an exception handler.
    #[must_use]
    pub const fn is_exceptional(&self) -> bool {
        matches!(self, Self::ExceptionHandler { .. })
    }

    /// Returns `true` if this is a switch case edge.
    #[must_use]
    pub const fn is_switch(&self) -> bool {
        matches!(self, Self::Switch { .. })
    }

    /// Creates an exception handler edge kind with the given catch type.
    #[must_use]
    pub fn exception(catch_type: Option<&str>) -> Self {
        Self::ExceptionHandler {
            catch_type: catch_type.map(str::to_owned),
        }
    }
}
