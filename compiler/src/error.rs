// error.rs — Fatal compile error model
//
// Every failure in nncc is terminal for the whole compilation: the generated
// code runs unattended in deployed inference with no semantic check against
// the source graph, so the compiler fails loudly rather than emit
// plausibly-wrong numeric code. There is no recoverable error return and no
// per-node retry.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

/// Crate-wide result alias. `Err` always aborts the compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

// ── Error kind ──────────────────────────────────────────────────────────────

/// Classification of a fatal compile error.
///
/// Each kind carries a stable code (`E0xxx`). Once assigned, a code must never
/// be reassigned to a different semantic meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Structurally invalid graph document: duplicate or undefined names,
    /// bad shapes, data/shape length mismatch, non-topological node order.
    MalformedGraph,
    /// Attribute with a wrong declared type or a missing value.
    MalformedAttribute,
    /// Attribute name the operator does not recognize. Never silently ignored.
    UnknownAttribute,
    /// Input count does not match the operator's fixed arity.
    ArityMismatch,
    /// An input tensor violates the operator's type or shape constraints.
    TypeConstraint,
    /// A graph feature nncc does not implement.
    Unimplemented,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MalformedGraph => "E0001",
            ErrorKind::MalformedAttribute => "E0100",
            ErrorKind::UnknownAttribute => "E0101",
            ErrorKind::ArityMismatch => "E0200",
            ErrorKind::TypeConstraint => "E0201",
            ErrorKind::Unimplemented => "E0300",
        }
    }
}

// ── Compile error ───────────────────────────────────────────────────────────

/// A fatal compile error: kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CompileError {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed_graph(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedGraph, message)
    }

    pub fn malformed_attribute(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedAttribute, message)
    }

    pub fn unknown_attribute(op: &str, name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownAttribute,
            format!("unknown attribute '{}' on {}", name, op),
        )
    }

    pub fn arity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArityMismatch, message)
    }

    pub fn type_constraint(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeConstraint, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unimplemented, message)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for CompileError {}
