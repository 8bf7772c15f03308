//! Error types for namespace and scope-resolution operations.

use thiserror::Error;

/// Result alias for scope operations.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Failure conditions raised by the namespace layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A sibling namespace with this name (case-insensitive) already
    /// exists; the parent's nested list was not mutated.
    #[error("duplicate namespace name: \"{name}\"")]
    DuplicateNameSpace { name: String },

    /// A function with this name (case-insensitive) already exists in the
    /// same table.
    #[error("duplicate function definition: \"{name}\"")]
    DuplicateFunc { name: String },

    /// A scoped path named a namespace that does not exist.
    #[error("unknown namespace in scoped reference: \"{name}\"")]
    UnknownNameSpace { name: String },

    /// A scoped path with no variable segment, such as a trailing `->`.
    #[error("malformed scoped reference: \"{path}\"")]
    MalformedPath { path: String },

    /// A failure from the variable layer, forwarded unchanged.
    #[error(transparent)]
    Var(#[from] rook_var::VarError),
}
