//! Error taxonomy for the constraint engine.
//!
//! Per the design's propagation policy, unsatisfiability is NOT an error —
//! it is an ordinary return value (`None` / an empty `Relation`). Every
//! variant here aborts the current top-level operation; there is no local
//! recovery.

use thiserror::Error;

/// Errors that can abort a constraint-engine operation.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// A UF name appears in a constraint but was never registered in the
    /// environment (§4.4, §7).
    #[error("undeclared uninterpreted function symbol: {name}")]
    UndeclaredSymbol { name: String },

    /// A binary Set/Relation operation was attempted on operands whose
    /// tuple arities (or input/output split, for Relations) disagree.
    #[error("arity mismatch: {left} vs {right} ({context})")]
    ArityMismatch {
        left: usize,
        right: usize,
        context: String,
    },

    /// A programming-error-level invariant was violated, e.g. inserting a
    /// term into a `TermPartOrdGraph` after `doneInsertingTerms` was
    /// called, or exceeding the graph's fixed vertex capacity.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The external integer-set solver adapter returned an error or was
    /// asked for an unsupported construct. Fatal for the current call;
    /// the caller may retry with different options.
    #[error("solver error: {0}")]
    SolverError(String),
}

/// Convenience alias used throughout the crate's public API.
pub type CoreResult<T> = Result<T, CoreError>;
