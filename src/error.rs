//! error.rs - Synthesis failure modes.
//!
//! Every lowering operation in this crate returns `Result<(), SynthesisError>`
//! (or `Result<T, SynthesisError>` where it must hand back lines). An `Err`
//! invalidates the whole output circuit: callers short-circuit and
//! propagate with `?` rather than attempting partial cleanup.

use thiserror::Error;

/// Failure modes raised while lowering an AST into a circuit.
///
/// Each variant names a single place resolution can fail: dispatch on an
/// unrecognized AST node, a call/uncall naming an unknown module or actual,
/// a mismatched main-module name, or a width inconsistency. Gate-primitive
/// operations themselves are total on well-formed input and never return
/// one of these.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SynthesisError {
    /// An unrecognized statement variant reached the dispatcher.
    #[error("unrecognized statement variant")]
    UnknownStatement,

    /// An unrecognized expression variant reached the dispatcher.
    #[error("unrecognized expression variant")]
    UnknownExpression,

    /// An unrecognized binary or shift operator reached internal dispatch.
    #[error("operator `{0:?}` is not defined for this expression kind")]
    UnknownOperator(String),

    /// A `call`/`uncall` actual parameter could not be found in the
    /// enclosing module.
    #[error("actual parameter `{0}` not found in enclosing module")]
    UnresolvedParameter(String),

    /// `call`/`uncall` referenced a module that isn't declared in the
    /// program.
    #[error("module `{0}` is not declared in this program")]
    UnknownModule(String),

    /// The configured `main_module` name does not match any module.
    #[error("main module `{0}` does not match any declared module")]
    UnknownMainModule(String),

    /// A variable access resolved to a line count inconsistent with its
    /// declared bit-width (malformed AST: invariant violation).
    #[error("variable access for `{0}` resolved to {1} lines, expected {2}")]
    LineCountMismatch(String, usize, usize),

    /// Two operands of a swap, or an assignment's LHS/RHS, have differing
    /// line counts.
    #[error("operand line-count mismatch: {0} vs {1}")]
    WidthMismatch(usize, usize),
}
