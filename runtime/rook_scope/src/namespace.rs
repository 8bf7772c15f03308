//! The namespace tree: lexical scope containers for variables, functions
//! and nested namespaces.
//!
//! Nodes live in an arena owned by [`NameSpaces`] and are addressed by
//! stable [`NameSpaceId`] handles. Two reserved nodes exist outside the
//! tree: the script root and the standard-library namespace, reachable by
//! fixed name from anywhere.
//!
//! There is no ambient "current namespace". Every lookup takes an explicit
//! [`ScopeContext`] naming the namespace (and optionally the function)
//! the code in question was defined in, so nothing has to be saved and
//! restored around nested lookups.

use rook_var::{VarArena, VarId};

use crate::error::{ScopeError, ScopeResult};
use crate::exec::{CodeRange, ExecResult, InitExec};
use crate::func::{Func, FuncIndex, FuncList, VarTable};
use crate::settings::Settings;

/// Sentinel display name for namespaces declared without a name. It never
/// matches any lookup, not even a query of this literal string.
pub const ANONYMOUS_NAME: &str = "<anonymous namespace>";

/// Nested-namespace lists grow by this many slots at a time.
const LIST_GROW_BY: usize = 5;

/// Stable handle to a node in a [`NameSpaces`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NameSpaceId(u32);

impl NameSpaceId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
enum NsName {
    Named(Box<str>),
    Anonymous,
}

impl NsName {
    /// Case-insensitive match; anonymous matches nothing, including the
    /// sentinel string itself.
    fn matches(&self, query: &str) -> bool {
        match self {
            NsName::Named(name) => name.eq_ignore_ascii_case(query),
            NsName::Anonymous => false,
        }
    }

    fn display(&self) -> &str {
        match self {
            NsName::Named(name) => name,
            NsName::Anonymous => ANONYMOUS_NAME,
        }
    }
}

/// Where a lookup should search, relative to a [`ScopeContext`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VarLookup {
    /// Function locals first (when inside a function), then the
    /// namespace's variables.
    Default,
    /// Namespace variables only.
    Global,
    /// Function locals only.
    Local,
}

/// The point of view of some executing code: which namespace it was
/// defined in, and which function (if any) it is the body of.
#[derive(Clone, Copy, Debug)]
pub struct ScopeContext {
    pub namespace: NameSpaceId,
    pub func: Option<FuncIndex>,
}

impl ScopeContext {
    /// Top-level code of a namespace.
    pub fn top_level(namespace: NameSpaceId) -> Self {
        ScopeContext {
            namespace,
            func: None,
        }
    }

    /// Body of a function defined in `namespace`.
    pub fn in_func(namespace: NameSpaceId, func: FuncIndex) -> Self {
        ScopeContext {
            namespace,
            func: Some(func),
        }
    }

    /// Make `namespace` current, reporting whether a change occurred so
    /// callers can skip a save/restore when nothing moved. Crossing into
    /// another namespace leaves any function scope behind.
    pub fn enter(&mut self, namespace: NameSpaceId) -> bool {
        if self.namespace == namespace {
            return false;
        }
        self.namespace = namespace;
        self.func = None;
        true
    }
}

/// Insertion-ordered list of nested namespaces.
#[derive(Debug, Default)]
pub(crate) struct NameSpaceList {
    ids: Vec<NameSpaceId>,
}

impl NameSpaceList {
    fn push(&mut self, id: NameSpaceId) {
        if self.ids.len() == self.ids.capacity() {
            self.ids.reserve_exact(LIST_GROW_BY);
        }
        self.ids.push(id);
    }

    fn pop(&mut self) -> Option<NameSpaceId> {
        self.ids.pop()
    }

    /// First case-insensitive match in insertion order.
    fn find(&self, name: &str, nodes: &[NameSpace]) -> Option<NameSpaceId> {
        self.ids
            .iter()
            .copied()
            .find(|id| nodes[id.index()].name.matches(name))
    }

    fn ids(&self) -> &[NameSpaceId] {
        &self.ids
    }
}

/// One lexical scope container.
#[derive(Debug)]
pub struct NameSpace {
    name: NsName,
    outer: Option<NameSpaceId>,
    is_top: bool,
    nested: NameSpaceList,
    pub funcs: FuncList,
    /// Eagerly declared namespace variables, in declaration order.
    vars: VarTable,
    /// Variables discovered lazily (first use at top level).
    lazy_vars: VarTable,
    pub settings: Settings,
    auto_init: Option<CodeRange>,
    static_inits: Vec<CodeRange>,
    auto_init_done: bool,
    /// Imports that may be absent without a load error.
    optional_imports: Vec<Box<str>>,
    /// Source files folded into this namespace, in inclusion order.
    sources: Vec<Box<str>>,
}

impl NameSpace {
    fn new(name: NsName, outer: Option<NameSpaceId>, is_top: bool) -> Self {
        NameSpace {
            name,
            outer,
            is_top,
            nested: NameSpaceList::default(),
            funcs: FuncList::default(),
            vars: VarTable::default(),
            lazy_vars: VarTable::default(),
            settings: Settings::default(),
            auto_init: None,
            static_inits: Vec::new(),
            auto_init_done: false,
            optional_imports: Vec::new(),
            sources: Vec::new(),
        }
    }
}

/// Arena owning every namespace node, plus the two reserved roots.
pub struct NameSpaces {
    nodes: Vec<NameSpace>,
    root: NameSpaceId,
    stdlib: NameSpaceId,
}

impl Default for NameSpaces {
    fn default() -> Self {
        NameSpaces::new()
    }
}

impl NameSpaces {
    /// An arena holding just the script root and the standard-library
    /// namespace. Both are top-level and mutually unreachable via `Outer`.
    pub fn new() -> Self {
        let nodes = vec![
            NameSpace::new(NsName::Named("Script".into()), None, true),
            NameSpace::new(NsName::Named("std".into()), None, true),
        ];
        NameSpaces {
            nodes,
            root: NameSpaceId(0),
            stdlib: NameSpaceId(1),
        }
    }

    /// The script-root namespace.
    pub fn root(&self) -> NameSpaceId {
        self.root
    }

    /// The standard-library namespace.
    pub fn stdlib(&self) -> NameSpaceId {
        self.stdlib
    }

    pub fn name(&self, id: NameSpaceId) -> &str {
        self.nodes[id.index()].name.display()
    }

    pub fn outer(&self, id: NameSpaceId) -> Option<NameSpaceId> {
        self.nodes[id.index()].outer
    }

    pub fn is_top(&self, id: NameSpaceId) -> bool {
        self.nodes[id.index()].is_top
    }

    pub fn node(&self, id: NameSpaceId) -> &NameSpace {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NameSpaceId) -> &mut NameSpace {
        &mut self.nodes[id.index()]
    }

    /// The settings in effect for code running under `ctx`.
    pub fn active_settings(&self, ctx: &ScopeContext) -> &Settings {
        &self.nodes[ctx.namespace.index()].settings
    }

    // Structural mutation, valid only while the loader is populating the
    // declaring scope.

    /// Create a child namespace. `name: None` declares it anonymous.
    ///
    /// Fails on a sibling name collision without mutating anything.
    pub fn insert_nested(
        &mut self,
        outer: NameSpaceId,
        name: Option<&str>,
        is_top: bool,
    ) -> ScopeResult<NameSpaceId> {
        let ns_name = match name {
            Some(n) => {
                if self.nodes[outer.index()]
                    .nested
                    .find(n, &self.nodes)
                    .is_some()
                {
                    return Err(ScopeError::DuplicateNameSpace {
                        name: n.to_string(),
                    });
                }
                NsName::Named(n.into())
            }
            None => NsName::Anonymous,
        };
        let id = NameSpaceId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        tracing::debug!(name = ns_name.display(), outer = self.name(outer), "declaring namespace");
        self.nodes.push(NameSpace::new(ns_name, Some(outer), is_top));
        self.nodes[outer.index()].nested.push(id);
        Ok(id)
    }

    /// Unwind the most recently declared child of `outer`. Only valid
    /// while that child is still the newest node in the arena.
    pub fn remove_last(&mut self, outer: NameSpaceId) {
        let removed = self.nodes[outer.index()].nested.pop();
        debug_assert_eq!(
            removed.map(|id| id.index()),
            Some(self.nodes.len() - 1),
            "remove_last is only valid during declaration unwinding"
        );
        if removed.is_some() {
            self.nodes.pop();
        }
    }

    /// Find a nested namespace by name, optionally honoring the reserved
    /// names first: `Script` (root), `std` (standard library), `Outer`
    /// (immediate parent) and `Library` (nearest enclosing top-level node,
    /// never the queried node itself).
    pub fn get_nested(
        &self,
        from: NameSpaceId,
        name: &str,
        allow_reserved: bool,
    ) -> Option<NameSpaceId> {
        if allow_reserved {
            if name.eq_ignore_ascii_case("Script") {
                return Some(self.root);
            }
            if name.eq_ignore_ascii_case("std") {
                return Some(self.stdlib);
            }
            if name.eq_ignore_ascii_case("Outer") {
                return self.nodes[from.index()].outer;
            }
            if name.eq_ignore_ascii_case("Library") {
                let mut cursor = self.nodes[from.index()].outer;
                while let Some(id) = cursor {
                    if self.nodes[id.index()].is_top {
                        return Some(id);
                    }
                    cursor = self.nodes[id.index()].outer;
                }
                return None;
            }
        }
        self.nodes[from.index()].nested.find(name, &self.nodes)
    }

    /// Direct children in declaration order.
    pub fn nested_ids(&self, id: NameSpaceId) -> &[NameSpaceId] {
        self.nodes[id.index()].nested.ids()
    }

    // Variables

    /// Eagerly declare a namespace variable (loader path). Returns the
    /// existing cell when the name is already declared here.
    pub fn declare_var(
        &mut self,
        id: NameSpaceId,
        name: &str,
        arena: &mut VarArena,
    ) -> ScopeResult<VarId> {
        let node = &self.nodes[id.index()];
        if let Some(var) = node.vars.find(name).or_else(|| node.lazy_vars.find(name)) {
            return Ok(var);
        }
        VarArena::validate_name(name)?;
        let var = arena.alloc(name, false);
        self.nodes[id.index()].vars.insert(name, var);
        Ok(var)
    }

    /// Scope-aware variable lookup, without creating anything.
    pub fn find_var(&self, ctx: &ScopeContext, name: &str, lookup: VarLookup) -> Option<VarId> {
        let node = &self.nodes[ctx.namespace.index()];
        let func = ctx.func.map(|f| node.funcs.get(f));
        let in_locals =
            |f: &Func| f.vars.find(name).or_else(|| f.lazy_vars.find(name));
        let in_globals = || node.vars.find(name).or_else(|| node.lazy_vars.find(name));
        match lookup {
            VarLookup::Local => func.and_then(in_locals),
            VarLookup::Global => in_globals(),
            VarLookup::Default => func.and_then(in_locals).or_else(in_globals),
        }
    }

    /// Scope-aware lookup that creates the cell on a miss, registering it
    /// in the lazily-declared table of the scope `lookup` selects.
    pub fn find_or_add_var(
        &mut self,
        ctx: &ScopeContext,
        name: &str,
        lookup: VarLookup,
        arena: &mut VarArena,
    ) -> ScopeResult<VarId> {
        if let Some(var) = self.find_var(ctx, name, lookup) {
            return Ok(var);
        }
        VarArena::validate_name(name)?;
        let node = &mut self.nodes[ctx.namespace.index()];
        let local_home = match (lookup, ctx.func) {
            (VarLookup::Global, _) | (_, None) => None,
            (_, Some(f)) => Some(f),
        };
        let var = match local_home {
            Some(f) => {
                let var = arena.alloc(name, true);
                node.funcs.get_mut(f).lazy_vars.insert(name, var);
                var
            }
            None => {
                let var = arena.alloc(name, false);
                node.lazy_vars.insert(name, var);
                var
            }
        };
        Ok(var)
    }

    // Functions

    /// Find a function by name, starting at `from` and optionally
    /// descending into nested namespaces depth-first.
    pub fn find_func(
        &self,
        from: NameSpaceId,
        name: &str,
        search_nested: bool,
    ) -> Option<(NameSpaceId, FuncIndex)> {
        let node = &self.nodes[from.index()];
        if let Some(index) = node.funcs.find(name) {
            return Some((from, index));
        }
        if search_nested {
            for &child in node.nested.ids() {
                if let Some(hit) = self.find_func(child, name, true) {
                    return Some(hit);
                }
            }
        }
        None
    }

    // Loader bookkeeping

    /// Register (or extend) the namespace's auto-init code range.
    pub fn set_auto_init(&mut self, id: NameSpaceId, range: CodeRange) {
        self.nodes[id.index()].auto_init = Some(range);
    }

    /// Register a static-initializer range; these run before the
    /// namespace's own auto-init section, in registration order.
    pub fn add_static_init(&mut self, id: NameSpaceId, range: CodeRange) {
        self.nodes[id.index()].static_inits.push(range);
    }

    pub fn add_optional_import(&mut self, id: NameSpaceId, name: &str) {
        self.nodes[id.index()].optional_imports.push(name.into());
    }

    pub fn optional_imports(&self, id: NameSpaceId) -> impl Iterator<Item = &str> {
        self.nodes[id.index()]
            .optional_imports
            .iter()
            .map(AsRef::as_ref)
    }

    pub fn add_source(&mut self, id: NameSpaceId, path: &str) {
        self.nodes[id.index()].sources.push(path.into());
    }

    pub fn sources(&self, id: NameSpaceId) -> impl Iterator<Item = &str> {
        self.nodes[id.index()].sources.iter().map(AsRef::as_ref)
    }

    /// Whether `path` was already folded into this namespace, compared
    /// case-insensitively the way file systems this targets do.
    pub fn has_source(&self, id: NameSpaceId, path: &str) -> bool {
        self.nodes[id.index()]
            .sources
            .iter()
            .any(|s| s.eq_ignore_ascii_case(path))
    }

    // Bulk traversals

    /// Run initialization code depth-first, children before parent, in
    /// declaration order, short-circuiting on the first non-success.
    ///
    /// Inner declarations are fully initialized before the enclosing
    /// scope's top-level code runs. A node runs at most once; the hotkey
    /// criterion is cleared before the node's own section.
    pub fn run_auto_init(
        &mut self,
        id: NameSpaceId,
        exec: &mut dyn InitExec,
        arena: &mut VarArena,
    ) -> ExecResult {
        if self.nodes[id.index()].auto_init_done {
            return Ok(());
        }
        let children: Vec<NameSpaceId> = self.nodes[id.index()].nested.ids().to_vec();
        for child in children {
            self.run_auto_init(child, exec, arena)?;
        }
        let node = &mut self.nodes[id.index()];
        node.settings.hot_criterion = None;
        let static_inits = node.static_inits.clone();
        let auto_init = node.auto_init;
        for range in static_inits {
            exec.run(id, range, arena)?;
        }
        if let Some(range) = auto_init {
            tracing::debug!(namespace = self.name(id), "running auto-init section");
            exec.run(id, range, arena)?;
        }
        self.nodes[id.index()].auto_init_done = true;
        Ok(())
    }

    /// Teardown: release every object reference reachable from this
    /// namespace. Own variables first, then non-built-in functions'
    /// locals and statics, then nested namespaces last. An outer scope's
    /// variables are more likely to reference nested-scope objects than
    /// the reverse, so outer-held references go first.
    pub fn release_var_objects(&self, id: NameSpaceId, arena: &mut VarArena) {
        let node = &self.nodes[id.index()];
        for &var in node.vars.ids() {
            arena.release_object(var);
        }
        for &var in node.lazy_vars.ids() {
            arena.release_object(var);
        }
        for func in node.funcs.iter() {
            release_func_objects(func, arena);
        }
        for &child in node.nested.ids() {
            self.release_var_objects(child, arena);
        }
    }
}

fn release_func_objects(func: &Func, arena: &mut VarArena) {
    if func.is_builtin {
        return;
    }
    for &var in func.vars.ids() {
        arena.release_object(var);
    }
    for &var in func.lazy_vars.ids() {
        arena.release_object(var);
    }
    for nested in func.funcs.iter() {
        release_func_objects(nested, arena);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn duplicate_sibling_rejected_without_mutation() {
        let mut spaces = NameSpaces::new();
        let root = spaces.root();
        let lib = spaces.insert_nested(root, Some("Lib"), false).unwrap();
        let err = spaces.insert_nested(root, Some("LIB"), false).unwrap_err();
        assert_eq!(
            err,
            ScopeError::DuplicateNameSpace {
                name: "LIB".to_string()
            }
        );
        assert_eq!(spaces.nested_ids(root), [lib]);
        assert_eq!(spaces.get_nested(root, "lib", false), Some(lib));
    }

    #[test]
    fn anonymous_namespaces_never_match() {
        let mut spaces = NameSpaces::new();
        let root = spaces.root();
        let anon = spaces.insert_nested(root, None, false).unwrap();
        assert_eq!(spaces.name(anon), ANONYMOUS_NAME);
        assert_eq!(spaces.get_nested(root, ANONYMOUS_NAME, false), None);

        // Two anonymous siblings coexist.
        spaces.insert_nested(root, None, false).unwrap();
        assert_eq!(spaces.nested_ids(root).len(), 2);
    }

    #[test]
    fn reserved_names_resolve_relative_to_the_node() {
        let mut spaces = NameSpaces::new();
        let root = spaces.root();
        let mid = spaces.insert_nested(root, Some("Mid"), false).unwrap();
        let leaf = spaces.insert_nested(mid, Some("Leaf"), false).unwrap();

        assert_eq!(spaces.get_nested(leaf, "script", true), Some(spaces.root()));
        assert_eq!(spaces.get_nested(leaf, "std", true), Some(spaces.stdlib()));
        assert_eq!(spaces.get_nested(leaf, "Outer", true), Some(mid));
        // Library walks outward and never lands on the starting node.
        assert_eq!(spaces.get_nested(leaf, "Library", true), Some(root));
        assert_eq!(spaces.get_nested(root, "Library", true), None);

        // Reserved names are invisible when disallowed.
        assert_eq!(spaces.get_nested(leaf, "Outer", false), None);
    }

    #[test]
    fn remove_last_unwinds_a_declaration() {
        let mut spaces = NameSpaces::new();
        let root = spaces.root();
        spaces.insert_nested(root, Some("Keep"), false).unwrap();
        spaces.insert_nested(root, Some("Broken"), false).unwrap();
        spaces.remove_last(root);
        assert_eq!(spaces.nested_ids(root).len(), 1);
        assert_eq!(spaces.get_nested(root, "Broken", false), None);
        // The name is free for a retry.
        spaces.insert_nested(root, Some("Broken"), false).unwrap();
    }

    #[test]
    fn lookup_prefers_locals_then_globals() {
        let mut arena = VarArena::new();
        let mut spaces = NameSpaces::new();
        let root = spaces.root();

        let global_x = spaces.declare_var(root, "x", &mut arena).unwrap();
        let f = spaces
            .node_mut(root)
            .funcs
            .add(Func::new("work", false))
            .unwrap();
        let ctx = ScopeContext::in_func(root, f);
        let local_x = spaces
            .find_or_add_var(&ctx, "x", VarLookup::Local, &mut arena)
            .unwrap();
        assert_ne!(global_x, local_x);

        assert_eq!(spaces.find_var(&ctx, "x", VarLookup::Default), Some(local_x));
        assert_eq!(spaces.find_var(&ctx, "x", VarLookup::Global), Some(global_x));
        assert_eq!(spaces.find_var(&ctx, "x", VarLookup::Local), Some(local_x));

        let top = ScopeContext::top_level(root);
        assert_eq!(spaces.find_var(&top, "x", VarLookup::Default), Some(global_x));
        assert_eq!(spaces.find_var(&top, "x", VarLookup::Local), None);
    }

    #[test]
    fn find_func_descends_into_nested_namespaces_on_request() {
        let mut spaces = NameSpaces::new();
        let root = spaces.root();
        let lib = spaces.insert_nested(root, Some("Lib"), false).unwrap();
        let helper = spaces
            .node_mut(lib)
            .funcs
            .add(Func::new("Helper", false))
            .unwrap();

        assert_eq!(spaces.find_func(root, "helper", false), None);
        assert_eq!(spaces.find_func(root, "helper", true), Some((lib, helper)));
    }

    #[test]
    fn invalid_variable_names_are_rejected() {
        let mut arena = VarArena::new();
        let mut spaces = NameSpaces::new();
        let root = spaces.root();
        let err = spaces.declare_var(root, "9lives", &mut arena).unwrap_err();
        assert!(matches!(err, ScopeError::Var(_)));
    }
}
