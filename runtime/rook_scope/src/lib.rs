//! Namespaces and scope resolution for the Rook runtime.
//!
//! Namespaces form a tree of lexical scopes, each carrying its own
//! variable tables, function table and a private copy of the interpreter
//! settings. Two reserved nodes sit outside the tree: the script root and
//! the standard library, reachable by fixed name from any scope. Scoped
//! references (`Lib->x`) walk nested namespaces, with `Script`, `std`,
//! `Outer` and `Library` resolving relative to the reference site.
//!
//! All lookups take an explicit [`ScopeContext`]; there is no ambient
//! current-namespace state to save and restore.

mod error;
mod exec;
mod func;
mod namespace;
mod resolve;
mod settings;

pub use error::{ScopeError, ScopeResult};
pub use exec::{CodeRange, ExecResult, ExecSignal, InitExec};
pub use func::{Func, FuncIndex, FuncList, VarTable};
pub use namespace::{
    NameSpace, NameSpaceId, NameSpaces, ScopeContext, VarLookup, ANONYMOUS_NAME,
};
pub use resolve::{
    find_scoped_func, find_scoped_var, resolve_namespace_path, resolve_scoped_var, SCOPE_OPERATOR,
};
pub use settings::{Settings, ThreadState, DEFAULT_PEEK_FREQUENCY};
