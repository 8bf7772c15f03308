//! Reference-counted object payloads.
//!
//! Script objects are opaque to this layer; a cell only holds a shared
//! handle and participates in its lifetime. The one invariant the storage
//! layer owes the object system: when a cell's object is replaced, the old
//! reference is dropped only *after* the new value is fully installed, so
//! that destructor-triggered reentrant code observes a consistent cell.

use std::fmt;
use std::rc::Rc;

/// Minimal interface the runtime needs from a script object.
///
/// The scripting thread model is a single logical thread, so plain `Rc`
/// reference counting suffices.
pub trait ScriptObject {
    /// Human-readable type name, for diagnostics.
    fn type_name(&self) -> &str {
        "Object"
    }
}

/// Shared handle to a script object.
#[derive(Clone)]
pub struct ObjectRef(Rc<dyn ScriptObject>);

impl ObjectRef {
    pub fn new(object: impl ScriptObject + 'static) -> Self {
        ObjectRef(Rc::new(object))
    }

    /// Identity comparison (two handles to the same object).
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live references, observable for lifetime assertions.
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ObjectRef({}, refs={})",
            self.0.type_name(),
            Rc::strong_count(&self.0)
        )
    }
}
