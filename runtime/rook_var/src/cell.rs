//! Per-cell state: kind, attributes, and value representation.
//!
//! The representation is a sum type, so the illegal states the old
//! bitfield designs allowed (two numeric caches at once, a stale flag with
//! no pending number) simply do not exist here:
//!
//! - `Text`: the string buffer is authoritative; `NumCache` records what is
//!   known about its numeric purity.
//! - `Pending`: a number was assigned and the buffer is stale; the text is
//!   synthesized on first read.
//! - `Object`: an object reference is authoritative. The blanked buffer is
//!   kept alongside to preserve its allocation-class tag.

use crate::attrib::VarAttrib;
use crate::buffer::TextBuf;
use crate::object::ObjectRef;
use crate::shared::SharedBufferHandle;
use std::fmt;

use crate::arena::VarId;

/// Contents-producing callback for read-only built-in variables.
pub type BuiltinVarFn = fn(name: &str) -> String;

/// What backs a cell's storage.
pub enum VarKind {
    /// Ordinary script variable owning its buffer.
    Normal,
    /// Cell whose contents live in the host's shared system buffer.
    Shared(SharedBufferHandle),
    /// Read-only cell whose contents are produced by a callback.
    Builtin(BuiltinVarFn),
}

impl fmt::Debug for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Normal => f.write_str("Normal"),
            VarKind::Shared(_) => f.write_str("Shared"),
            VarKind::Builtin(_) => f.write_str("Builtin"),
        }
    }
}

/// Numeric knowledge about a `Text` representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum NumCache {
    /// Purity of the contents has not been determined.
    Unknown,
    /// Text is exactly the rendering of this integer.
    Int64(i64),
    /// Text is exactly the rendering of this double.
    Double(f64),
    /// Text is confirmed not a pure number; skips re-parsing.
    NonNumeric,
}

/// A number assigned without rendering its text yet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum PendingNum {
    Int64(i64),
    Double(f64),
}

/// The cell's logical value.
#[derive(Debug)]
pub(crate) enum Repr {
    Text { buf: TextBuf, cache: NumCache },
    Pending { buf: TextBuf, num: PendingNum },
    Object { obj: ObjectRef, buf: TextBuf },
}

impl Repr {
    pub(crate) fn empty() -> Self {
        Repr::Text {
            buf: TextBuf::new(),
            cache: NumCache::Unknown,
        }
    }

    /// Empty text tagged heap-class, for fresh recursion layers.
    pub(crate) fn empty_heap() -> Self {
        Repr::Text {
            buf: TextBuf::new_heap(),
            cache: NumCache::Unknown,
        }
    }
}

/// Externally observable cache state, for assertions and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    /// No numeric knowledge.
    None,
    /// Valid integer cache; text matches it.
    Int64,
    /// Valid double cache; text matches it.
    Double,
    /// Text known non-numeric.
    NonNumeric,
    /// Number assigned, text not yet synthesized.
    PendingInt64,
    /// Number assigned, text not yet synthesized.
    PendingDouble,
    /// Cell holds an object reference.
    Object,
}

/// One storage cell. All access goes through [`crate::VarArena`].
pub(crate) struct VarCell {
    pub(crate) name: Box<str>,
    pub(crate) is_local: bool,
    pub(crate) kind: VarKind,
    pub(crate) attrib: VarAttrib,
    /// Alias target; always a concrete (non-alias) cell by construction.
    pub(crate) alias_for: Option<VarId>,
    /// Inert while `alias_for` is set; dominant again if the alias is cleared.
    pub(crate) repr: Repr,
}

impl VarCell {
    pub(crate) fn new(name: &str, is_local: bool, kind: VarKind) -> Self {
        let attrib = match kind {
            VarKind::Normal => VarAttrib::UNINITIALIZED,
            // Shared cells can change out-of-band; never trust a cache.
            VarKind::Shared(_) => VarAttrib::CACHE_DISABLED,
            VarKind::Builtin(_) => VarAttrib::empty(),
        };
        VarCell {
            name: name.into(),
            is_local,
            kind,
            attrib,
            alias_for: None,
            repr: Repr::empty(),
        }
    }

    pub(crate) fn cache_state(&self) -> CacheState {
        match &self.repr {
            Repr::Text { cache, .. } => match cache {
                NumCache::Unknown => CacheState::None,
                NumCache::Int64(_) => CacheState::Int64,
                NumCache::Double(_) => CacheState::Double,
                NumCache::NonNumeric => CacheState::NonNumeric,
            },
            Repr::Pending { num, .. } => match num {
                PendingNum::Int64(_) => CacheState::PendingInt64,
                PendingNum::Double(_) => CacheState::PendingDouble,
            },
            Repr::Object { .. } => CacheState::Object,
        }
    }

    pub(crate) fn caching_enabled(&self) -> bool {
        !self.attrib.contains(VarAttrib::CACHE_DISABLED)
    }

    pub(crate) fn is_read_only(&self) -> bool {
        matches!(self.kind, VarKind::Builtin(_))
    }
}
