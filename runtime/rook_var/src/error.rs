//! Error types for variable storage operations.
//!
//! Every fallible operation returns an explicit `Result`; no panics cross
//! this layer. Failures are recoverable from the embedding interpreter's
//! point of view: the affected cell's prior value is always left intact.

use thiserror::Error;

/// Result alias for variable operations.
pub type VarResult<T> = Result<T, VarError>;

/// Failure conditions raised by [`crate::VarArena`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarError {
    /// Growing a cell's buffer would exceed the configured capacity ceiling.
    ///
    /// The cell keeps its previous value; nothing was mutated.
    #[error("variable \"{name}\" would exceed the maximum capacity ({requested} > {max} bytes)")]
    CapacityExceeded {
        name: String,
        requested: usize,
        max: usize,
    },

    /// Assignment into a cell backed by a read-only binding.
    #[error("\"{name}\" is read-only and cannot be assigned")]
    ReadOnly { name: String },

    /// An identifier failed load-time validation because it starts with a digit.
    #[error("this name starts with a number, which is not allowed: \"{name}\"")]
    NameStartsWithDigit { name: String },

    /// An identifier failed load-time validation because of an illegal character.
    #[error("the following name contains an illegal character: \"{name}\"")]
    IllegalCharacter { name: String },

    /// The shared system buffer collaborator rejected a write.
    #[error("cannot write to the shared system buffer: {reason}")]
    SharedBufferWrite { reason: String },
}
