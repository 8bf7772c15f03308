//! Growable text buffer with the runtime's capacity policy.
//!
//! Reassignment-heavy script code makes buffer churn the dominant cost of
//! variable storage, so growth is tiered rather than exact-fit: small
//! strings round up to fixed block sizes and large strings reserve a
//! percentage of headroom. A buffer never shrinks back to the unallocated
//! state once it has entered the heap class; this bounds the total number
//! of allocation cycles per variable.

/// Largest capacity served by the small-allocation class.
pub(crate) const MAX_ALLOC_SMALL: usize = 64;

/// Capacity floor that fits any standard file path.
pub(crate) const PATH_CAPACITY: usize = 260;

/// Buffers above this size are released by [`FreeMode::IfLarge`].
pub(crate) const FREE_LARGE_THRESHOLD: usize = 4 * 1024;

/// How a cell's buffer was allocated.
///
/// `Small` buffers are blanked but never released (their fixed block sizes
/// make reuse cheap and fragmentation bounded). Once a buffer is `Heap` it
/// stays `Heap` even when its capacity is released back to zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AllocMethod {
    /// No storage has ever been reserved; the buffer is the empty string.
    None,
    /// Fixed-size block from the small class (4, 8 or 64 bytes).
    Small,
    /// Policy-grown heap allocation.
    Heap,
}

/// Release policy for [`crate::VarArena::free`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FreeMode {
    /// Blank the cell and release any heap buffer.
    Always,
    /// Like `Always`, but static cells are left completely untouched.
    AlwaysExcludeStatic,
    /// Blank in place, retaining the current capacity.
    Never,
    /// Blank, releasing the buffer only above [`FREE_LARGE_THRESHOLD`].
    ///
    /// Reuse-heavy code such as loops benefits from keeping small buffers
    /// around, while large ones are returned to the allocator promptly.
    IfLarge,
}

/// Compute the granted capacity for a requested byte length.
///
/// `exact` bypasses the rounding tiers (capacity-reservation APIs want the
/// precise size), except for the minimum block of 4 which always applies in
/// the small class.
fn grown_capacity(needed: usize, exact: bool, method: AllocMethod) -> (usize, AllocMethod) {
    if method != AllocMethod::Heap && needed <= MAX_ALLOC_SMALL {
        let capacity = if needed <= 4 {
            4
        } else if exact {
            needed
        } else if needed <= 8 {
            8
        } else {
            MAX_ALLOC_SMALL
        };
        (capacity, AllocMethod::Small)
    } else {
        let capacity = if exact {
            needed
        } else if needed < 16 {
            // Holds nearly any formatted number; going smaller is
            // counterproductive given per-allocation overhead.
            16
        } else if needed < PATH_CAPACITY {
            PATH_CAPACITY
        } else if needed < 160 * 1024 {
            needed + needed / 10 // 10% extra
        } else if needed < 1600 * 1024 {
            needed + 16 * 1024
        } else if needed < 6400 * 1024 {
            needed + needed / 100 // 1% extra
        } else {
            needed + 64 * 1024
        };
        (capacity, AllocMethod::Heap)
    }
}

/// Owned text storage for one cell.
#[derive(Clone, Debug, Default)]
pub(crate) struct TextBuf {
    text: String,
    method: AllocMethodState,
}

// Wrapper so Default lands on AllocMethod::None without a manual impl on
// the public enum.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AllocMethodState(pub AllocMethod);

impl Default for AllocMethodState {
    fn default() -> Self {
        AllocMethodState(AllocMethod::None)
    }
}

impl TextBuf {
    pub(crate) fn new() -> Self {
        TextBuf::default()
    }

    /// An empty buffer already tagged as heap-class.
    ///
    /// Used when resetting a cell for a new recursion layer: the fresh
    /// layer must never enter the small class, which is never released.
    pub(crate) fn new_heap() -> Self {
        TextBuf {
            text: String::new(),
            method: AllocMethodState(AllocMethod::Heap),
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn len(&self) -> usize {
        self.text.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.text.capacity()
    }

    pub(crate) fn method(&self) -> AllocMethod {
        self.method.0
    }

    /// Grow to hold at least `needed` bytes, applying the tier policy.
    ///
    /// Existing contents are preserved. Does nothing when the current
    /// capacity already suffices, so callers can rely on buffer-address
    /// stability in that case.
    pub(crate) fn grow(&mut self, needed: usize, exact: bool) {
        if needed <= self.text.capacity() {
            return;
        }
        let (target, method) = grown_capacity(needed, exact, self.method.0);
        tracing::debug!(needed, target, ?method, "growing variable buffer");
        let mut grown = String::with_capacity(target);
        grown.push_str(&self.text);
        self.text = grown;
        self.method = AllocMethodState(method);
    }

    /// Replace the contents. Caller has already grown the buffer, so this
    /// never reallocates.
    pub(crate) fn set(&mut self, s: &str) {
        debug_assert!(self.text.capacity() >= s.len());
        self.text.clear();
        self.text.push_str(s);
    }

    /// Append without reallocating, if the remaining room allows it.
    pub(crate) fn append_if_room(&mut self, s: &str) -> bool {
        if self.text.capacity() - self.text.len() >= s.len() {
            self.text.push_str(s);
            true
        } else {
            false
        }
    }

    /// Append via a new exact-fit buffer sized to old + appended length.
    ///
    /// The old buffer is fully copied before being dropped, so an appended
    /// slice may not alias it (guaranteed by the borrow checker).
    pub(crate) fn append_realloc(&mut self, s: &str) {
        let mut grown = String::with_capacity(self.text.len() + s.len());
        grown.push_str(&self.text);
        grown.push_str(s);
        self.text = grown;
        self.method = AllocMethodState(AllocMethod::Heap);
    }

    /// Shorten the apparent length in place (substring assignment onto self).
    pub(crate) fn truncate(&mut self, len: usize) {
        self.text.truncate(len);
    }

    /// Blank the buffer per `mode`, which must not be `AlwaysExcludeStatic`
    /// (statics are filtered out by the caller before reaching here).
    pub(crate) fn free(&mut self, mode: FreeMode) {
        match self.method.0 {
            AllocMethod::None => {}
            // Small blocks are never returned to the allocator.
            AllocMethod::Small => self.text.clear(),
            AllocMethod::Heap => {
                let release = match mode {
                    FreeMode::Always | FreeMode::AlwaysExcludeStatic => true,
                    FreeMode::Never => false,
                    FreeMode::IfLarge => self.text.capacity() > FREE_LARGE_THRESHOLD,
                };
                if release {
                    // Capacity returns to zero but the method stays Heap.
                    self.text = String::new();
                } else {
                    self.text.clear();
                }
            }
        }
    }

    /// Adopt a caller-built string as the new storage.
    pub(crate) fn adopt(&mut self, s: String) {
        self.text = s;
        self.method = AllocMethodState(AllocMethod::Heap);
    }
}
