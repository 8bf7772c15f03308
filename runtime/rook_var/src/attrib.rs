//! Attribute bits carried by every variable cell.
//!
//! The numeric-cache discriminant is *not* part of these flags; it lives in
//! the cell's representation enum so that mutually exclusive cache states
//! are unrepresentable as combinations. What remains here are the
//! independent boolean properties.

use bitflags::bitflags;

bitflags! {
    /// Independent per-cell properties.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct VarAttrib: u8 {
        /// Function-local variable that survives across calls.
        ///
        /// Statics are never backed up by the recursion machinery and are
        /// skipped by frame teardown.
        const STATIC = 1 << 0;

        /// The cell has never been assigned since creation (or since the
        /// frame cleanup that re-marked it). Reading it still yields the
        /// empty string, but raises an advisory warning.
        const UNINITIALIZED = 1 << 1;

        /// Numeric caching is permanently disabled for this cell.
        ///
        /// Number assignments materialize their text immediately and reads
        /// never trust a cached value. Required for cells whose backing
        /// store can change out-of-band.
        const CACHE_DISABLED = 1 << 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_independent() {
        let mut a = VarAttrib::empty();
        a.insert(VarAttrib::STATIC);
        a.insert(VarAttrib::UNINITIALIZED);
        assert!(a.contains(VarAttrib::STATIC));
        a.remove(VarAttrib::UNINITIALIZED);
        assert!(a.contains(VarAttrib::STATIC));
        assert!(!a.contains(VarAttrib::UNINITIALIZED));
    }
}
