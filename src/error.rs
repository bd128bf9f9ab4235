//! Errors reported synchronously by the environment layer.
//!
//! Backend-level conditions (timeouts, overflows, ...) are never returned through this type. They
//! are recorded in the [`Manager`] exception log instead.
//!
//! [`Manager`]: ../manager/struct.Manager.html

use crate::var::Var;
use thiserror::Error;

/// An error raised while building or combining environments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A variable appears twice, either in one list or across the integer and real lists.
    #[error("duplicate variable: {0}")]
    DuplicateVariable(Var),

    /// A variable was referenced that the environment does not contain.
    #[error("unknown variable: {0}")]
    UnknownVariable(Var),

    /// A renaming would map two variables to the same name.
    #[error("invalid renaming: {0}")]
    InvalidRenaming(String),

    /// A variable is integer-typed in one environment and real-typed in the other.
    #[error("incompatible environments: {0} is typed differently")]
    IncompatibleEnvironment(Var),

    /// A change of environment would drop a variable that is still constrained.
    #[error("variable {0} is constrained and cannot be dropped without projection")]
    ConstrainedVariable(Var),

    /// The parallel forms of an operation were given sequences of different lengths.
    #[error("arity mismatch: {0} variables but {1} expressions")]
    ArityMismatch(usize, usize),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
