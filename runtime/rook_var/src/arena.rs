//! The cell arena and every operation on stored values.
//!
//! Cells are addressed by stable [`VarId`] handles rather than pointers, so
//! alias links stay valid across backup/restore payload swaps. Every public
//! operation resolves alias indirection first; by construction that is a
//! single hop, because [`VarArena::set_alias`] collapses chains when the
//! alias is created, never at use time.
//!
//! Mutating operations either fully complete or fail before touching
//! observable state: the capacity ceiling is checked before any buffer is
//! disturbed, and a replaced object reference is dropped only after the new
//! value is installed.

use std::mem;

use crate::attrib::VarAttrib;
use crate::buffer::{FreeMode, TextBuf};
use crate::cell::{BuiltinVarFn, CacheState, NumCache, PendingNum, Repr, VarCell, VarKind};
use crate::error::{VarError, VarResult};
use crate::format::{classify, render_float, render_int, NumKind, VarSettings};
use crate::object::ObjectRef;
use crate::shared::SharedBufferHandle;
use crate::token::Token;

/// Stable handle to a cell in a [`VarArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct VarId(u32);

impl VarId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Advisory hook invoked when an uninitialized cell is read.
type UninitWarnHook = Box<dyn FnMut(&str)>;

enum ReadPath {
    Normal,
    Shared(SharedBufferHandle),
    Builtin(BuiltinVarFn, Box<str>),
}

/// Owner of every variable cell in the interpreter.
#[derive(Default)]
pub struct VarArena {
    cells: Vec<VarCell>,
    warn_uninit: Option<UninitWarnHook>,
}

impl VarArena {
    pub fn new() -> Self {
        VarArena::default()
    }

    /// Install the advisory hook for uninitialized reads. The read itself
    /// still yields the empty string; escalation is the host's decision.
    pub fn set_uninit_warning(&mut self, hook: impl FnMut(&str) + 'static) {
        self.warn_uninit = Some(Box::new(hook));
    }

    // Cell creation

    /// Create an ordinary variable cell.
    pub fn alloc(&mut self, name: &str, is_local: bool) -> VarId {
        self.push(VarCell::new(name, is_local, VarKind::Normal))
    }

    /// Create a cell backed by the host's shared system buffer.
    pub fn alloc_shared(&mut self, name: &str, buffer: SharedBufferHandle) -> VarId {
        self.push(VarCell::new(name, false, VarKind::Shared(buffer)))
    }

    /// Create a read-only cell whose contents come from a callback.
    pub fn alloc_builtin(&mut self, name: &str, contents: BuiltinVarFn) -> VarId {
        self.push(VarCell::new(name, false, VarKind::Builtin(contents)))
    }

    fn push(&mut self, cell: VarCell) -> VarId {
        let id = VarId(u32::try_from(self.cells.len()).unwrap_or(u32::MAX));
        self.cells.push(cell);
        id
    }

    /// Load-time identifier validation.
    pub fn validate_name(name: &str) -> VarResult<()> {
        let Some(&first) = name.as_bytes().first() else {
            return Err(VarError::IllegalCharacter { name: name.into() });
        };
        // Disallowing a leading digit keeps 1e3 available as a literal.
        if first.is_ascii_digit() {
            return Err(VarError::NameStartsWithDigit { name: name.into() });
        }
        if name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'#' | b'@' | b'$'))
        {
            Ok(())
        } else {
            Err(VarError::IllegalCharacter { name: name.into() })
        }
    }

    // Introspection

    /// Resolve alias indirection: the concrete cell behind `id`, one hop.
    #[inline]
    pub fn resolve(&self, id: VarId) -> VarId {
        match self.cells[id.index()].alias_for {
            Some(target) => target,
            None => id,
        }
    }

    /// The cell's own name (an alias reports its own name, not its target's).
    pub fn name(&self, id: VarId) -> &str {
        &self.cells[id.index()].name
    }

    /// Whether the cell itself is function-local (not resolved through the
    /// alias: a local alias for a global is still local).
    pub fn is_local(&self, id: VarId) -> bool {
        self.cells[id.index()].is_local
    }

    pub fn is_alias(&self, id: VarId) -> bool {
        self.cells[id.index()].alias_for.is_some()
    }

    pub fn alias_target(&self, id: VarId) -> Option<VarId> {
        self.cells[id.index()].alias_for
    }

    pub fn is_static(&self, id: VarId) -> bool {
        self.cells[id.index()].attrib.contains(VarAttrib::STATIC)
    }

    pub fn mark_static(&mut self, id: VarId) {
        self.cells[id.index()].attrib.insert(VarAttrib::STATIC);
    }

    pub fn is_uninitialized(&self, id: VarId) -> bool {
        let id = self.resolve(id);
        self.cells[id.index()].attrib.contains(VarAttrib::UNINITIALIZED)
    }

    pub fn mark_initialized(&mut self, id: VarId) {
        let id = self.resolve(id);
        self.cells[id.index()].attrib.remove(VarAttrib::UNINITIALIZED);
    }

    pub fn is_object(&self, id: VarId) -> bool {
        let id = self.resolve(id);
        matches!(self.cells[id.index()].repr, Repr::Object { .. })
    }

    /// Observable cache state of the concrete cell.
    pub fn cache_state(&self, id: VarId) -> CacheState {
        let id = self.resolve(id);
        self.cells[id.index()].cache_state()
    }

    pub fn attrib(&self, id: VarId) -> VarAttrib {
        let id = self.resolve(id);
        self.cells[id.index()].attrib
    }

    /// Apparent stored length in bytes. For a cell holding an unrendered
    /// number this is the stale buffer length; read contents first if the
    /// synthesized length is wanted.
    pub fn length(&self, id: VarId) -> usize {
        let id = self.resolve(id);
        match &self.cells[id.index()].repr {
            Repr::Text { buf, .. } | Repr::Pending { buf, .. } | Repr::Object { buf, .. } => {
                buf.len()
            }
        }
    }

    /// Granted capacity in bytes. Shared cells report the collaborator's.
    pub fn capacity(&self, id: VarId) -> usize {
        let id = self.resolve(id);
        let cell = &self.cells[id.index()];
        match &cell.kind {
            VarKind::Shared(handle) => handle.borrow().capacity(),
            VarKind::Builtin(_) => 0,
            VarKind::Normal => match &cell.repr {
                Repr::Text { buf, .. } | Repr::Pending { buf, .. } | Repr::Object { buf, .. } => {
                    buf.capacity()
                }
            },
        }
    }

    /// One-line diagnostic rendering: `name[len of cap]: contents`.
    ///
    /// An alias reports its own name with its target's storage.
    pub fn to_text(&self, id: VarId) -> String {
        let own_name = &self.cells[id.index()].name;
        let target = &self.cells[self.resolve(id).index()];
        let (text, len, cap) = match &target.repr {
            Repr::Text { buf, .. } | Repr::Pending { buf, .. } => {
                (buf.text(), buf.len(), buf.capacity())
            }
            Repr::Object { .. } => ("", 0, 0),
        };
        let truncated = text.chars().count() > 60;
        let shown: String = text.chars().take(60).collect();
        format!(
            "{own_name}[{len} of {cap}]: {shown}{}",
            if truncated { "..." } else { "" }
        )
    }

    // Assignment

    /// Store a copy of `text`, growing per the tier policy.
    pub fn assign_str(&mut self, id: VarId, text: &str, settings: &VarSettings) -> VarResult<()> {
        self.assign_str_with(id, text, false, settings)
    }

    /// Like [`VarArena::assign_str`], with exact sizing on growth.
    pub fn assign_str_with(
        &mut self,
        id: VarId,
        text: &str,
        exact: bool,
        settings: &VarSettings,
    ) -> VarResult<()> {
        let id = self.resolve(id);
        self.check_writable(id)?;
        if let VarKind::Shared(handle) = &self.cells[id.index()].kind {
            let handle = handle.clone();
            return handle.borrow_mut().set(text);
        }

        if text.is_empty() {
            // Blanking frees only large buffers; loops that reassign the
            // same variable keep their allocation.
            self.free(id, FreeMode::IfLarge, false);
            return Ok(());
        }

        self.check_ceiling(id, text.len(), settings)?;

        let cell = &mut self.cells[id.index()];
        let repr = mem::replace(&mut cell.repr, Repr::empty());
        let (mut buf, old_obj) = split_repr(repr);
        buf.grow(text.len(), exact);
        buf.set(text);
        cell.repr = Repr::Text {
            buf,
            cache: NumCache::Unknown,
        };
        cell.attrib.remove(VarAttrib::UNINITIALIZED);
        // Only after the new value is fully installed.
        drop(old_obj);
        Ok(())
    }

    /// Reserve at least `needed` bytes of capacity, blanking the contents.
    /// Exact sizing; used by capacity-reservation APIs.
    pub fn set_capacity(
        &mut self,
        id: VarId,
        needed: usize,
        settings: &VarSettings,
    ) -> VarResult<()> {
        let id = self.resolve(id);
        self.check_writable(id)?;
        if let VarKind::Shared(handle) = &self.cells[id.index()].kind {
            let handle = handle.clone();
            return handle.borrow_mut().prepare_write(needed);
        }
        self.check_ceiling(id, needed, settings)?;

        let cell = &mut self.cells[id.index()];
        let repr = mem::replace(&mut cell.repr, Repr::empty());
        let (mut buf, old_obj) = split_repr(repr);
        buf.grow(needed, true);
        buf.truncate(0);
        cell.repr = Repr::Text {
            buf,
            cache: NumCache::Unknown,
        };
        cell.attrib.remove(VarAttrib::UNINITIALIZED);
        drop(old_obj);
        Ok(())
    }

    /// Store an integer in O(1); the text is synthesized lazily.
    pub fn assign_int64(&mut self, id: VarId, value: i64, settings: &VarSettings) -> VarResult<()> {
        self.assign_number(id, PendingNum::Int64(value), settings)
    }

    /// Store a float in O(1); the text is synthesized lazily.
    pub fn assign_double(&mut self, id: VarId, value: f64, settings: &VarSettings) -> VarResult<()> {
        self.assign_number(id, PendingNum::Double(value), settings)
    }

    fn assign_number(
        &mut self,
        id: VarId,
        num: PendingNum,
        settings: &VarSettings,
    ) -> VarResult<()> {
        let id = self.resolve(id);
        self.check_writable(id)?;
        if !self.cells[id.index()].caching_enabled() {
            // Cache-disabled cells (including shared ones) materialize the
            // text immediately so reads never depend on a stale cache.
            let text = match num {
                PendingNum::Int64(v) => render_int(v, &settings.format),
                PendingNum::Double(v) => render_float(v, &settings.format),
            };
            return self.assign_str_with(id, &text, false, settings);
        }
        let cell = &mut self.cells[id.index()];
        let repr = mem::replace(&mut cell.repr, Repr::empty());
        let (buf, old_obj) = split_repr(repr);
        cell.repr = Repr::Pending { buf, num };
        cell.attrib.remove(VarAttrib::UNINITIALIZED);
        drop(old_obj);
        Ok(())
    }

    /// Store an object reference; the old value is released afterwards.
    pub fn assign_object(&mut self, id: VarId, object: ObjectRef) -> VarResult<()> {
        let id = self.resolve(id);
        let cell = &self.cells[id.index()];
        if cell.is_read_only() || matches!(cell.kind, VarKind::Shared(_)) {
            return Err(VarError::ReadOnly {
                name: cell.name.to_string(),
            });
        }
        let cell = &mut self.cells[id.index()];
        let repr = mem::replace(&mut cell.repr, Repr::empty());
        let (mut buf, old_obj) = split_repr(repr);
        buf.free(FreeMode::Always);
        cell.repr = Repr::Object { obj: object, buf };
        cell.attrib.remove(VarAttrib::UNINITIALIZED);
        drop(old_obj);
        Ok(())
    }

    /// Copy another cell's value, preserving a cached number's kind.
    pub fn assign_var(&mut self, dst: VarId, src: VarId, settings: &VarSettings) -> VarResult<()> {
        let src = self.resolve(src);
        let dst_concrete = self.resolve(dst);
        if src == dst_concrete {
            return Ok(());
        }
        enum Source {
            Int(i64),
            Float(f64),
            Object(ObjectRef),
            Text(String),
        }
        let source = if matches!(self.cells[src.index()].kind, VarKind::Normal) {
            match &self.cells[src.index()].repr {
                Repr::Pending {
                    num: PendingNum::Int64(v),
                    ..
                } => Source::Int(*v),
                Repr::Pending {
                    num: PendingNum::Double(v),
                    ..
                } => Source::Float(*v),
                Repr::Object { obj, .. } => Source::Object(obj.clone()),
                Repr::Text { buf, cache } => match cache {
                    NumCache::Int64(v) => Source::Int(*v),
                    NumCache::Double(v) => Source::Float(*v),
                    _ => Source::Text(buf.text().to_owned()),
                },
            }
        } else {
            Source::Text(self.with_contents(src, settings, str::to_owned))
        };
        if matches!(source, Source::Text(_)) {
            self.maybe_warn_uninitialized(src);
        }
        match source {
            Source::Int(v) => self.assign_int64(dst, v, settings),
            Source::Float(v) => self.assign_double(dst, v, settings),
            Source::Object(o) => self.assign_object(dst, o),
            Source::Text(t) => self.assign_str(dst, &t, settings),
        }
    }

    /// Store an evaluator token's value.
    pub fn assign_token(
        &mut self,
        id: VarId,
        token: &Token,
        settings: &VarSettings,
    ) -> VarResult<()> {
        match token {
            Token::Int(v) => self.assign_int64(id, *v, settings),
            Token::Float(v) => self.assign_double(id, *v, settings),
            Token::Str(s) => self.assign_str(id, s, settings),
            Token::Object(o) => self.assign_object(id, o.clone()),
            Token::Var(v) => self.assign_var(id, *v, settings),
            Token::Missing => {
                // An omitted value blanks the cell and re-marks it so an
                // unguarded read can be diagnosed.
                self.free(id, FreeMode::Always, false);
                let id = self.resolve(id);
                self.cells[id.index()].attrib.insert(VarAttrib::UNINITIALIZED);
                Ok(())
            }
        }
    }

    // Reads

    /// Run `f` over the current textual contents, synthesizing a pending
    /// number's text first (and caching it, unless caching is disabled).
    pub fn with_contents<R>(
        &mut self,
        id: VarId,
        settings: &VarSettings,
        f: impl FnOnce(&str) -> R,
    ) -> R {
        let id = self.resolve(id);
        match self.read_path(id) {
            ReadPath::Shared(handle) => {
                let mut buffer = handle.borrow_mut();
                f(buffer.contents())
            }
            ReadPath::Builtin(produce, name) => f(&produce(&name)),
            ReadPath::Normal => {
                self.update_contents(id, settings);
                self.maybe_warn_uninitialized(id);
                match &self.cells[id.index()].repr {
                    Repr::Text { buf, .. } | Repr::Pending { buf, .. } => f(buf.text()),
                    // No text until an explicit conversion is requested.
                    Repr::Object { .. } => f(""),
                }
            }
        }
    }

    /// Like [`VarArena::with_contents`] but without synthesis: a pending
    /// number's stale buffer is returned as-is and no warning is raised.
    pub fn with_raw_contents<R>(&self, id: VarId, f: impl FnOnce(&str) -> R) -> R {
        let id = self.resolve(id);
        let cell = &self.cells[id.index()];
        match &cell.kind {
            VarKind::Shared(handle) => {
                let handle = handle.clone();
                let mut buffer = handle.borrow_mut();
                f(buffer.contents())
            }
            VarKind::Builtin(produce) => f(&produce(&cell.name)),
            VarKind::Normal => match &cell.repr {
                Repr::Text { buf, .. } | Repr::Pending { buf, .. } => f(buf.text()),
                Repr::Object { .. } => f(""),
            },
        }
    }

    /// Owned copy of the contents.
    pub fn text(&mut self, id: VarId, settings: &VarSettings) -> String {
        self.with_contents(id, settings, str::to_owned)
    }

    fn read_path(&self, id: VarId) -> ReadPath {
        let cell = &self.cells[id.index()];
        match &cell.kind {
            VarKind::Normal => ReadPath::Normal,
            VarKind::Shared(handle) => ReadPath::Shared(handle.clone()),
            VarKind::Builtin(produce) => ReadPath::Builtin(*produce, cell.name.clone()),
        }
    }

    /// Render a pending number into the buffer, keeping the cache valid.
    fn update_contents(&mut self, id: VarId, settings: &VarSettings) {
        let cell = &mut self.cells[id.index()];
        if !matches!(cell.repr, Repr::Pending { .. }) {
            return;
        }
        let repr = mem::replace(&mut cell.repr, Repr::empty());
        let Repr::Pending { mut buf, num } = repr else {
            unreachable!()
        };
        let (text, cache) = match num {
            PendingNum::Int64(v) => (render_int(v, &settings.format), NumCache::Int64(v)),
            PendingNum::Double(v) => (render_float(v, &settings.format), NumCache::Double(v)),
        };
        // Rendered numbers are bounded and small; the ceiling is not
        // consulted here.
        buf.grow(text.len(), false);
        buf.set(&text);
        cell.repr = Repr::Text { buf, cache };
    }

    /// Numeric value as an integer, preferring a valid cache.
    ///
    /// `known_pure` is the caller's assertion that the text form is a pure
    /// integer; only then is a freshly parsed value cached.
    pub fn to_int64(&mut self, id: VarId, known_pure: bool) -> i64 {
        let id = self.resolve(id);
        if !matches!(self.cells[id.index()].kind, VarKind::Normal) {
            return match self.classify_external(id) {
                NumKind::Int(v) => v,
                NumKind::Float(v) => v as i64,
                NumKind::NotNumeric => 0,
            };
        }
        let cell = &mut self.cells[id.index()];
        let caching =
            !cell.attrib.contains(VarAttrib::CACHE_DISABLED);
        match &mut cell.repr {
            Repr::Object { .. } => 0,
            Repr::Pending { num, .. } => match *num {
                PendingNum::Int64(v) => v,
                PendingNum::Double(v) => v as i64,
            },
            Repr::Text { buf, cache } => match *cache {
                NumCache::Int64(v) => v,
                NumCache::Double(v) => v as i64,
                NumCache::NonNumeric => 0,
                NumCache::Unknown => match classify(buf.text()) {
                    NumKind::Int(v) => {
                        if known_pure && caching {
                            *cache = NumCache::Int64(v);
                        }
                        v
                    }
                    NumKind::Float(v) => {
                        if known_pure && caching {
                            *cache = NumCache::Double(v);
                        }
                        v as i64
                    }
                    NumKind::NotNumeric => {
                        if caching {
                            // Remember the negative result to skip re-parsing.
                            *cache = NumCache::NonNumeric;
                        }
                        0
                    }
                },
            },
        }
    }

    /// Numeric value as a double, preferring a valid cache.
    pub fn to_double(&mut self, id: VarId, known_pure: bool) -> f64 {
        let id = self.resolve(id);
        if !matches!(self.cells[id.index()].kind, VarKind::Normal) {
            return match self.classify_external(id) {
                NumKind::Int(v) => v as f64,
                NumKind::Float(v) => v,
                NumKind::NotNumeric => 0.0,
            };
        }
        let cell = &mut self.cells[id.index()];
        let caching =
            !cell.attrib.contains(VarAttrib::CACHE_DISABLED);
        match &mut cell.repr {
            Repr::Object { .. } => 0.0,
            Repr::Pending { num, .. } => match *num {
                PendingNum::Int64(v) => v as f64,
                PendingNum::Double(v) => v,
            },
            Repr::Text { buf, cache } => match *cache {
                NumCache::Int64(v) => v as f64,
                NumCache::Double(v) => v,
                NumCache::NonNumeric => 0.0,
                NumCache::Unknown => match classify(buf.text()) {
                    NumKind::Int(v) => {
                        if known_pure && caching {
                            *cache = NumCache::Int64(v);
                        }
                        v as f64
                    }
                    NumKind::Float(v) => {
                        if known_pure && caching {
                            *cache = NumCache::Double(v);
                        }
                        v
                    }
                    NumKind::NotNumeric => {
                        if caching {
                            *cache = NumCache::NonNumeric;
                        }
                        0.0
                    }
                },
            },
        }
    }

    fn classify_external(&self, id: VarId) -> NumKind {
        self.with_raw_contents(id, classify)
    }

    // Concatenation

    /// Append text, in place when the remaining room allows, otherwise via
    /// an exact-fit reallocation. A pending number is rendered first.
    pub fn append(&mut self, id: VarId, text: &str, settings: &VarSettings) -> VarResult<()> {
        let id = self.resolve(id);
        self.check_writable(id)?;
        if text.is_empty() {
            return Ok(());
        }
        if let VarKind::Shared(handle) = &self.cells[id.index()].kind {
            let handle = handle.clone();
            let mut combined = handle.borrow_mut().contents().to_owned();
            combined.push_str(text);
            return handle.borrow_mut().set(&combined);
        }
        self.update_contents(id, settings);

        // Ceiling check before any mutation.
        let new_len = self.length(id) + text.len();
        self.check_ceiling(id, new_len, settings)?;

        let cell = &mut self.cells[id.index()];
        let repr = mem::replace(&mut cell.repr, Repr::empty());
        match repr {
            Repr::Object { obj, mut buf } => {
                // Appending onto an object replaces it with the text form.
                buf.free(FreeMode::Always);
                buf.grow(text.len(), false);
                buf.set(text);
                cell.repr = Repr::Text {
                    buf,
                    cache: NumCache::Unknown,
                };
                drop(obj);
            }
            Repr::Text { mut buf, .. } => {
                if !buf.append_if_room(text) {
                    buf.append_realloc(text);
                }
                // Appending digits can change purity either way.
                cell.repr = Repr::Text {
                    buf,
                    cache: NumCache::Unknown,
                };
            }
            Repr::Pending { .. } => unreachable!("rendered above"),
        }
        cell.attrib.remove(VarAttrib::UNINITIALIZED);
        Ok(())
    }

    /// Re-derive the apparent length from the stored bytes, truncating at
    /// the first NUL. Adopted strings built by foreign writers may carry a
    /// terminator plus garbage after it. Returns the resulting length.
    pub fn set_length_from_contents(&mut self, id: VarId) -> usize {
        let id = self.resolve(id);
        let cell = &mut self.cells[id.index()];
        if let Repr::Text { buf, cache } = &mut cell.repr {
            if let Some(pos) = buf.text().as_bytes().iter().position(|&b| b == 0) {
                buf.truncate(pos);
                *cache = NumCache::Unknown;
            }
            buf.len()
        } else {
            0
        }
    }

    /// Shorten the stored text in place (substring-onto-self assignment).
    pub fn shorten(&mut self, id: VarId, new_len: usize) {
        let id = self.resolve(id);
        let cell = &mut self.cells[id.index()];
        if let Repr::Text { buf, cache } = &mut cell.repr {
            if new_len < buf.len() {
                buf.truncate(new_len);
                *cache = NumCache::Unknown;
            }
        }
    }

    /// Adopt a caller-built string as the cell's storage, trimming waste
    /// above 64 bytes (extra capacity is seldom utilized).
    pub fn accept_new_mem(&mut self, id: VarId, mut new_text: String) -> VarResult<()> {
        let id = self.resolve(id);
        self.check_writable(id)?;
        if let VarKind::Shared(handle) = &self.cells[id.index()].kind {
            // The collaborator owns its memory; copy the normal way.
            let handle = handle.clone();
            return handle.borrow_mut().set(&new_text);
        }
        if new_text.capacity() - new_text.len() > 64 {
            new_text.shrink_to_fit();
        }
        let cell = &mut self.cells[id.index()];
        let repr = mem::replace(&mut cell.repr, Repr::empty());
        let (mut buf, old_obj) = split_repr(repr);
        buf.adopt(new_text);
        cell.repr = Repr::Text {
            buf,
            cache: NumCache::Unknown,
        };
        cell.attrib.remove(VarAttrib::UNINITIALIZED);
        drop(old_obj);
        Ok(())
    }

    // Freeing

    /// Blank the cell per `mode`.
    ///
    /// With `require_init`, the cell is additionally re-marked as requiring
    /// initialization, and alias cells are skipped entirely (their targets
    /// belong to someone else's frame). Used by function-frame cleanup.
    pub fn free(&mut self, id: VarId, mode: FreeMode, require_init: bool) {
        let id = if require_init {
            if self.cells[id.index()].alias_for.is_some() {
                return;
            }
            id
        } else {
            self.resolve(id)
        };
        let cell = &mut self.cells[id.index()];
        if mode == FreeMode::AlwaysExcludeStatic && cell.attrib.contains(VarAttrib::STATIC) {
            // The one case where the cell isn't even blanked.
            return;
        }
        let repr = mem::replace(&mut cell.repr, Repr::empty());
        let (mut buf, old_obj) = split_repr(repr);
        buf.free(mode);
        cell.repr = Repr::Text {
            buf,
            cache: NumCache::Unknown,
        };
        cell.attrib.remove(VarAttrib::UNINITIALIZED);
        if require_init {
            cell.attrib.insert(VarAttrib::UNINITIALIZED);
        }
        drop(old_obj);
    }

    /// Release a held object reference, leaving the cell blank.
    /// No-op for cells not holding an object. Used at teardown.
    pub fn release_object(&mut self, id: VarId) {
        let id = self.resolve(id);
        let cell = &mut self.cells[id.index()];
        let repr = mem::replace(&mut cell.repr, Repr::empty());
        match repr {
            Repr::Object { obj, mut buf } => {
                buf.free(FreeMode::Always);
                cell.repr = Repr::Text {
                    buf,
                    cache: NumCache::Unknown,
                };
                drop(obj);
            }
            other => cell.repr = other,
        }
    }

    // Caching control

    /// Flush any pending synthesis, then permanently disable numeric
    /// caching for this cell: future number assignments materialize their
    /// text immediately and reads reflect exactly what was last written.
    pub fn disable_cache(&mut self, id: VarId, settings: &VarSettings) {
        let id = self.resolve(id);
        self.update_contents(id, settings);
        let cell = &mut self.cells[id.index()];
        cell.attrib.insert(VarAttrib::CACHE_DISABLED);
        if let Repr::Text { cache, .. } = &mut cell.repr {
            *cache = NumCache::Unknown;
        }
    }

    // Aliasing

    /// Redirect `id` to forward all operations to `target`'s storage.
    ///
    /// If `target` is itself an alias it is walked to its concrete end
    /// here, at creation time, so aliases never chain at use time. Making
    /// a cell its own alias is a no-op. An object held in the cell's own
    /// storage is released, but only after the new target is installed.
    pub fn set_alias(&mut self, id: VarId, target: VarId) {
        let mut concrete = target;
        while let Some(next) = self.cells[concrete.index()].alias_for {
            concrete = next;
        }
        // Refuse to point a cell at itself; it could only arise from an
        // already-degenerate caller state.
        if concrete == id {
            return;
        }
        tracing::debug!(
            alias = %self.cells[id.index()].name,
            target = %self.cells[concrete.index()].name,
            "retargeting alias"
        );
        let cell = &mut self.cells[id.index()];
        cell.alias_for = Some(concrete);
        if matches!(cell.repr, Repr::Object { .. }) {
            let repr = mem::replace(&mut cell.repr, Repr::empty());
            if let Repr::Object { obj, mut buf } = repr {
                buf.free(FreeMode::Always);
                cell.repr = Repr::Text {
                    buf,
                    cache: NumCache::Unknown,
                };
                drop(obj);
            }
        }
    }

    /// Convert an alias back to a concrete cell; its own storage (blanked
    /// by an earlier free) becomes dominant again.
    pub fn clear_alias(&mut self, id: VarId) {
        self.cells[id.index()].alias_for = None;
    }

    // Token bridge

    /// Textual form of an evaluator token.
    pub fn token_text(&mut self, token: &Token, settings: &VarSettings) -> String {
        match token {
            Token::Missing => String::new(),
            Token::Str(s) => s.to_string(),
            Token::Int(v) => render_int(*v, &settings.format),
            Token::Float(v) => render_float(*v, &settings.format),
            Token::Object(_) => String::new(),
            Token::Var(id) => self.text(*id, settings),
        }
    }

    /// Integer value of an evaluator token.
    pub fn token_to_int64(&mut self, token: &Token) -> i64 {
        match token {
            Token::Missing | Token::Object(_) => 0,
            Token::Int(v) => *v,
            Token::Float(v) => *v as i64,
            Token::Str(s) => match classify(s) {
                NumKind::Int(v) => v,
                NumKind::Float(v) => v as i64,
                NumKind::NotNumeric => 0,
            },
            Token::Var(id) => self.to_int64(*id, false),
        }
    }

    /// Float value of an evaluator token.
    pub fn token_to_double(&mut self, token: &Token) -> f64 {
        match token {
            Token::Missing | Token::Object(_) => 0.0,
            Token::Int(v) => *v as f64,
            Token::Float(v) => *v,
            Token::Str(s) => match classify(s) {
                NumKind::Int(v) => v as f64,
                NumKind::Float(v) => v,
                NumKind::NotNumeric => 0.0,
            },
            Token::Var(id) => self.to_double(*id, false),
        }
    }

    // Internals

    pub(crate) fn cell(&self, id: VarId) -> &VarCell {
        &self.cells[id.index()]
    }

    pub(crate) fn cell_mut(&mut self, id: VarId) -> &mut VarCell {
        &mut self.cells[id.index()]
    }

    fn check_writable(&self, id: VarId) -> VarResult<()> {
        let cell = &self.cells[id.index()];
        if cell.is_read_only() {
            Err(VarError::ReadOnly {
                name: cell.name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// The recoverable allocation failure: growing past the ceiling.
    /// Checked before any mutation so the prior value stays intact.
    fn check_ceiling(&self, id: VarId, needed: usize, settings: &VarSettings) -> VarResult<()> {
        let cell = &self.cells[id.index()];
        let current = match &cell.repr {
            Repr::Text { buf, .. } | Repr::Pending { buf, .. } | Repr::Object { buf, .. } => {
                buf.capacity()
            }
        };
        if needed > current && needed > settings.max_capacity {
            return Err(VarError::CapacityExceeded {
                name: cell.name.to_string(),
                requested: needed,
                max: settings.max_capacity,
            });
        }
        Ok(())
    }

    fn maybe_warn_uninitialized(&mut self, id: VarId) {
        let cell = &self.cells[id.index()];
        if matches!(cell.kind, VarKind::Normal)
            && cell.attrib.contains(VarAttrib::UNINITIALIZED)
        {
            let name = cell.name.clone();
            tracing::warn!(var = %name, "read of uninitialized variable");
            if let Some(mut hook) = self.warn_uninit.take() {
                hook(&name);
                self.warn_uninit = Some(hook);
            }
        }
    }
}

fn split_repr(repr: Repr) -> (TextBuf, Option<ObjectRef>) {
    match repr {
        Repr::Text { buf, .. } | Repr::Pending { buf, .. } => (buf, None),
        Repr::Object { obj, buf } => (buf, Some(obj)),
    }
}
