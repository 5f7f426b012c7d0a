//! Errors raised while building, evaluating and enumerating measurement values.
//!
//! Every error is returned synchronously to the caller. Nothing in this crate
//! retries or silently substitutes a default.

use thiserror::Error;

use crate::record::MeasurementId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A mid-circuit measurement must act on exactly one location.
    #[error("only a single qubit can be measured in the middle of the circuit, got {count} targets")]
    InvalidTarget { count: usize },

    #[error("postselection must be 0 or 1, got {value}")]
    InvalidPostselect { value: u8 },

    /// A conditional branch left a variable undefined that the other branch assigns.
    #[error("some branches did not define a value for variable '{name}'")]
    UndefinedVariable { name: String },

    #[error("conditional state has {actual} entries but {expected} variable names were given")]
    StateLengthMismatch { expected: usize, actual: usize },

    #[error(
        "the truth value of a MeasurementValue is undefined; \
         combine it with explicit operators or condition on it instead"
    )]
    AmbiguousTruthValue,

    #[error("no concrete outcome supplied for measurement {id}")]
    MissingOutcome { id: MeasurementId },

    #[error("expected {expected} outcome bits, got {actual}")]
    BitCountMismatch { expected: usize, actual: usize },

    #[error("branch index {index} is out of range for {dependencies} dependencies")]
    BranchIndexOutOfRange { index: u64, dependencies: usize },

    /// Enumerating this many dependencies would produce `2^dependencies` branches.
    #[error("refusing to enumerate {dependencies} measurement dependencies (limit is {limit})")]
    TooManyBranches { dependencies: usize, limit: usize },

    #[error("at least one predicate is required")]
    NoPredicates,

    #[error("unsupported operand types for {op}: {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {op}")]
    Overflow { op: &'static str },
}
