//! Function descriptors and the per-namespace function table.
//!
//! Only the parts of a function this layer needs exist here: its name, its
//! variable lists (for backup/restore and teardown), and whether it is
//! built in (built-ins have no script-visible locals to release).

use rustc_hash::FxHashMap;

use rook_var::VarId;

use crate::error::{ScopeError, ScopeResult};

/// Position of a function inside its namespace's [`FuncList`].
pub type FuncIndex = usize;

/// One script or built-in function, as the scope layer sees it.
#[derive(Debug, Default)]
pub struct Func {
    name: Box<str>,
    pub is_builtin: bool,
    /// Eagerly declared locals and statics, in declaration order.
    pub vars: VarTable,
    /// Locals discovered lazily (first assignment inside the body).
    pub lazy_vars: VarTable,
    /// Functions defined inside this function's body.
    pub funcs: FuncList,
}

impl Func {
    pub fn new(name: &str, is_builtin: bool) -> Self {
        Func {
            name: name.into(),
            is_builtin,
            ..Func::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Name-to-cell table for one scope, preserving declaration order.
/// Lookup is ASCII case-insensitive.
#[derive(Debug, Default)]
pub struct VarTable {
    order: Vec<VarId>,
    by_name: FxHashMap<Box<str>, VarId>,
}

impl VarTable {
    pub fn find(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name.to_ascii_lowercase().as_str()).copied()
    }

    /// Register a cell under `name`. Caller has already checked for
    /// absence via [`VarTable::find`].
    pub fn insert(&mut self, name: &str, id: VarId) {
        let prior = self
            .by_name
            .insert(name.to_ascii_lowercase().into_boxed_str(), id);
        debug_assert!(prior.is_none());
        self.order.push(id);
    }

    /// Cells in declaration order.
    pub fn ids(&self) -> &[VarId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Insertion-ordered function table with case-insensitive lookup.
#[derive(Debug, Default)]
pub struct FuncList {
    funcs: Vec<Func>,
    by_name: FxHashMap<Box<str>, FuncIndex>,
}

impl FuncList {
    /// Add a function, rejecting a duplicate name without mutating state.
    pub fn add(&mut self, func: Func) -> ScopeResult<FuncIndex> {
        let key = func.name().to_ascii_lowercase().into_boxed_str();
        if self.by_name.contains_key(&key) {
            return Err(ScopeError::DuplicateFunc {
                name: func.name().to_string(),
            });
        }
        let index = self.funcs.len();
        self.by_name.insert(key, index);
        self.funcs.push(func);
        Ok(index)
    }

    pub fn find(&self, name: &str) -> Option<FuncIndex> {
        self.by_name.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn get(&self, index: FuncIndex) -> &Func {
        &self.funcs[index]
    }

    pub fn get_mut(&mut self, index: FuncIndex) -> &mut Func {
        &mut self.funcs[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Func> {
        self.funcs.iter()
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut list = FuncList::default();
        let idx = list.add(Func::new("DoThing", false)).unwrap();
        assert_eq!(list.find("dothing"), Some(idx));
        assert_eq!(list.find("DOTHING"), Some(idx));
        assert_eq!(list.find("other"), None);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut list = FuncList::default();
        list.add(Func::new("f", false)).unwrap();
        let err = list.add(Func::new("F", true)).unwrap_err();
        assert_eq!(
            err,
            ScopeError::DuplicateFunc {
                name: "F".to_string()
            }
        );
        assert_eq!(list.len(), 1);
    }
}
