//! The thin seam between this layer and the statement executor.
//!
//! This crate never interprets code. It stores opaque instruction ranges
//! registered by the loader and hands them back to an [`InitExec`]
//! implementation in the right order.

use rook_var::VarArena;

use crate::namespace::NameSpaceId;

/// Non-success outcome of running a code range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecSignal {
    /// The range failed; abort the traversal.
    Fail,
    /// The range requested an early exit; stop without error.
    EarlyExit,
}

pub type ExecResult = Result<(), ExecSignal>;

/// An opaque span of loaded instructions, first through last inclusive.
/// The indices mean nothing to this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeRange {
    pub first: u32,
    pub last: u32,
}

/// Executor callback for auto-init and static-initializer sections.
pub trait InitExec {
    fn run(&mut self, namespace: NameSpaceId, range: CodeRange, vars: &mut VarArena) -> ExecResult;
}
