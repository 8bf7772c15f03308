//! Variable cells for the Rook runtime.
//!
//! A cell stores one script value and is addressed by a stable [`VarId`]
//! handle in a [`VarArena`]. The design goals, in order:
//!
//! - Numbers assigned to a cell are held natively and rendered to text only
//!   when text is actually read; parse results are cached so repeated
//!   numeric reads of the same text cost one parse.
//! - Buffer growth follows a tiered policy that trades slack for fewer
//!   reallocations, and a cell that has been heap-allocated once never
//!   regresses to the small tiers.
//! - Alias cells (by-reference parameters) forward to a concrete target in
//!   exactly one hop; chains are collapsed when the alias is created.
//! - Recursion swaps whole cell payloads out and back via
//!   [`VarArena::backup`] and [`VarArena::restore`].
//!
//! Growing a cell past the configured ceiling
//! ([`VarSettings::max_capacity`]) is the one recoverable allocation
//! failure; it reports [`VarError::CapacityExceeded`] and leaves the prior
//! value intact.

mod arena;
mod attrib;
mod backup;
mod buffer;
mod cell;
mod error;
mod format;
mod object;
mod shared;
mod token;

pub use arena::{VarArena, VarId};
pub use attrib::VarAttrib;
pub use backup::{FuncVars, VarBackupList, VarBkp};
pub use buffer::{AllocMethod, FreeMode};
pub use cell::{BuiltinVarFn, CacheState, VarKind};
pub use error::{VarError, VarResult};
pub use format::{
    classify, parse_float, parse_int, render_float, render_int, IntDisplay, NumFormat, NumKind,
    VarSettings, DEFAULT_MAX_CAPACITY,
};
pub use object::{ObjectRef, ScriptObject};
pub use shared::{MemorySharedBuffer, SharedBuffer, SharedBufferHandle};
pub use token::Token;
