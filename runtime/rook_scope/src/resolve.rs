//! Scoped-path resolution: `Lib->Inner->x`.
//!
//! A scoped reference names a chain of namespaces followed by one leaf
//! identifier. Every namespace segment honors the reserved names (`Script`,
//! `std`, `Outer`, `Library`), so `Outer->Outer->y` and `Library->x` both work.

use rook_var::{VarArena, VarId};

use crate::error::{ScopeError, ScopeResult};
use crate::func::FuncIndex;
use crate::namespace::{NameSpaceId, NameSpaces, ScopeContext, VarLookup};

/// The operator separating path segments.
pub const SCOPE_OPERATOR: &str = "->";

/// Walk the namespace segments of `path`, returning the namespace the
/// leaf identifier lives in plus the leaf itself.
pub fn resolve_namespace_path<'p>(
    spaces: &NameSpaces,
    from: NameSpaceId,
    path: &'p str,
) -> ScopeResult<(NameSpaceId, &'p str)> {
    let mut current = from;
    let mut segments = path.split(SCOPE_OPERATOR);
    // Split always yields at least one element.
    let mut leaf = segments.next().unwrap_or_default();
    for next in segments {
        let name = leaf.trim();
        current = spaces
            .get_nested(current, name, true)
            .ok_or_else(|| ScopeError::UnknownNameSpace {
                name: name.to_string(),
            })?;
        leaf = next;
    }
    let leaf = leaf.trim();
    if leaf.is_empty() {
        return Err(ScopeError::MalformedPath {
            path: path.to_string(),
        });
    }
    Ok((current, leaf))
}

/// Resolve a scoped variable reference without creating anything.
pub fn find_scoped_var(
    spaces: &NameSpaces,
    ctx: &ScopeContext,
    path: &str,
) -> ScopeResult<Option<VarId>> {
    let (home, leaf) = resolve_namespace_path(spaces, ctx.namespace, path)?;
    let leaf_ctx = if home == ctx.namespace {
        *ctx
    } else {
        // Crossing a namespace boundary leaves function locals behind.
        ScopeContext::top_level(home)
    };
    Ok(spaces.find_var(&leaf_ctx, leaf, lookup_for(ctx, home)))
}

/// Resolve a scoped variable reference, creating the cell in the target
/// namespace on a miss.
pub fn resolve_scoped_var(
    spaces: &mut NameSpaces,
    ctx: &ScopeContext,
    path: &str,
    arena: &mut VarArena,
) -> ScopeResult<VarId> {
    let (home, leaf) = resolve_namespace_path(spaces, ctx.namespace, path)?;
    let lookup = lookup_for(ctx, home);
    let leaf_ctx = if home == ctx.namespace {
        *ctx
    } else {
        ScopeContext::top_level(home)
    };
    spaces.find_or_add_var(&leaf_ctx, leaf, lookup, arena)
}

/// Resolve a scoped function reference.
pub fn find_scoped_func(
    spaces: &NameSpaces,
    ctx: &ScopeContext,
    path: &str,
) -> ScopeResult<Option<(NameSpaceId, FuncIndex)>> {
    let (home, leaf) = resolve_namespace_path(spaces, ctx.namespace, path)?;
    Ok(spaces.find_func(home, leaf, false))
}

/// An unqualified reference keeps the caller's scope rules; a qualified
/// one always targets the other namespace's variables.
fn lookup_for(ctx: &ScopeContext, home: NameSpaceId) -> VarLookup {
    if home == ctx.namespace {
        VarLookup::Default
    } else {
        VarLookup::Global
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn paths_walk_nested_and_reserved_segments() {
        let mut spaces = NameSpaces::new();
        let root = spaces.root();
        let lib = spaces.insert_nested(root, Some("Lib"), false).unwrap();
        let inner = spaces.insert_nested(lib, Some("Inner"), false).unwrap();

        assert_eq!(
            resolve_namespace_path(&spaces, root, "Lib->Inner->x").unwrap(),
            (inner, "x")
        );
        assert_eq!(
            resolve_namespace_path(&spaces, inner, "Outer->Outer->y").unwrap(),
            (root, "y")
        );
        assert_eq!(
            resolve_namespace_path(&spaces, inner, "Library->z").unwrap(),
            (root, "z")
        );
        assert_eq!(
            resolve_namespace_path(&spaces, root, "plain").unwrap(),
            (root, "plain")
        );
    }

    #[test]
    fn unknown_segment_and_empty_leaf_are_errors() {
        let spaces = NameSpaces::new();
        let root = spaces.root();
        assert!(matches!(
            resolve_namespace_path(&spaces, root, "Nope->x"),
            Err(ScopeError::UnknownNameSpace { .. })
        ));
        assert!(matches!(
            resolve_namespace_path(&spaces, root, "std->"),
            Err(ScopeError::MalformedPath { .. })
        ));
    }

    #[test]
    fn qualified_references_bypass_function_locals() {
        let mut arena = VarArena::new();
        let mut spaces = NameSpaces::new();
        let root = spaces.root();
        let lib = spaces.insert_nested(root, Some("Lib"), false).unwrap();
        let x = spaces.declare_var(lib, "x", &mut arena).unwrap();

        let ctx = ScopeContext::top_level(root);
        let found = find_scoped_var(&spaces, &ctx, "Lib->x").unwrap();
        assert_eq!(found, Some(x));
        // Creation lands in the named namespace, not the caller's.
        let y = resolve_scoped_var(&mut spaces, &ctx, "Lib->y", &mut arena).unwrap();
        let lib_ctx = ScopeContext::top_level(lib);
        assert_eq!(spaces.find_var(&lib_ctx, "y", VarLookup::Global), Some(y));
        assert_eq!(spaces.find_var(&ctx, "y", VarLookup::Global), None);
    }
}
