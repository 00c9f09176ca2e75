use thiserror::Error;

macro_rules! internal_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Internal {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Internal {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The analysis core distinguishes two broad failure classes. Internal-consistency faults
/// (a value-number cache producing different outputs for identical inputs, an instruction
/// consuming more operand words than the frame holds, an invalid graph label) indicate a bug
/// in the framework or a malformed instruction stream; they abort the analysis of the current
/// method and are surfaced to the caller, who may skip that method and continue with others.
/// Everything else — unresolved symbols, unreachable program points, empty match results —
/// is handled in-band and never raised as an `Error`.
///
/// # Error Categories
///
/// ## Graph Errors
/// - [`Error::InvalidNode`] - A node label does not refer to a live graph node
/// - [`Error::InvalidEdge`] - An edge label does not refer to a live graph edge
///
/// ## Dataflow Errors
/// - [`Error::Internal`] - Internal-consistency fault with source location
/// - [`Error::StackUnderflow`] - An instruction consumed more words than the frame holds
/// - [`Error::InvalidFrame`] - A top/bottom frame was used where a valid frame is required
///
/// ## Pattern Errors
/// - [`Error::MissingDataflowFact`] - No dataflow fact recorded at a queried location
#[derive(Error, Debug)]
pub enum Error {
    /// A node label does not refer to a live node in the graph.
    ///
    /// Graph labels are dense indices; using a label after the node has been
    /// removed, or a label from a different graph, is a programming error.
    #[error("Node label {0} does not refer to a live graph node")]
    InvalidNode(usize),

    /// An edge label does not refer to a live edge in the graph.
    #[error("Edge label {0} does not refer to a live graph edge")]
    InvalidEdge(usize),

    /// Internal-consistency fault detected by the framework.
    ///
    /// This covers conditions that can only arise from a bug in the analysis
    /// itself or from a malformed instruction stream: a value-number cache
    /// that would need to return different outputs for previously seen
    /// inputs, declared-versus-observed stack effect mismatches, or mutation
    /// of a finalized frame. The error records the source location where the
    /// fault was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the fault was detected
    /// * `line` - Source line where the fault was detected
    #[error("Internal - {file}:{line}: {message}")]
    Internal {
        /// The message to be printed for the internal fault
        message: String,
        /// The source file in which this fault was detected
        file: &'static str,
        /// The source line in which this fault was detected
        line: u32,
    },

    /// An instruction consumed more operand words than the frame holds.
    ///
    /// The instruction's declared stack consumption exceeded the operand
    /// stack depth at that program point. This indicates a malformed
    /// instruction stream or an incorrectly built control flow graph.
    #[error("Operand stack underflow while modeling instruction")]
    StackUnderflow,

    /// A top or bottom frame was used where a valid frame is required.
    ///
    /// Slot accessors are only defined on valid frames; querying the frame
    /// of an unreachable location yields top/bottom, which callers must
    /// check for before reading slots.
    #[error("Frame is not valid (top or bottom)")]
    InvalidFrame,

    /// No dataflow fact was recorded at a queried location.
    ///
    /// The pattern matcher raises this when a pattern element needs the
    /// value-number frame at an instruction the analysis never produced a
    /// fact for. It aborts the match attempt for that starting point only.
    #[error("No dataflow fact recorded at the queried location")]
    MissingDataflowFact,
}
