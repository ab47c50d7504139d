//! Ghost-chain traversal: `deghost`, `walk_to_file`, `nonv_root`, `ptr_equals`,
//! and the child-slot swap `replace` uses. Ground truth:
//! `original_source/src/types/Object.cpp` (`deghost`, `walkToFile`,
//! `ptrEquals`, `ptrswap`, `nonvRoot`).

use crate::{Arena, NameKind, Node, ObjectId};

/// Bound on ghost-chain length (spec §5: "cyclic ghost chains must be
/// prevented by construction... implementations must detect and reject it
/// at render time by walking the chain and bounding its length"). The
/// original has no such bound and would infinite-loop on a cycle.
pub const GHOST_CHAIN_LIMIT: usize = 1024;

/// Walk `id`'s ghost chain to its terminus. Detects cycles via a bounded
/// visited list (chains are expected to be short; a `Vec` scan beats a
/// `HashSet` allocation for the common case) and logs + stops early if the
/// bound is exceeded, returning the last id visited rather than looping.
pub fn deghost(arena: &Arena, id: ObjectId) -> ObjectId {
    let mut current = id;
    let mut visited = Vec::with_capacity(4);
    loop {
        if visited.len() >= GHOST_CHAIN_LIMIT || visited.contains(&current) {
            tracing::error!(target: "scope", object = ?current, "ghost cycle detected");
            return current;
        }
        visited.push(current);
        match arena.object(current).ghost {
            Some(next) => current = next,
            None => return current,
        }
    }
}

/// Walk up the parent chain until an object with `is_file` set is found.
pub fn walk_to_file(arena: &Arena, id: ObjectId) -> ObjectId {
    let mut current = id;
    loop {
        let slot = arena.object(current);
        if slot.is_file {
            return current;
        }
        match slot.parent {
            Some(parent) => current = parent,
            None => {
                tracing::warn!(target: "scope", object = ?current, "file walk failed: tree has no file ancestor");
                return current;
            }
        }
    }
}

/// Walk up the parent chain until a non-Virtual object (one with a real
/// name or enumerated index) is found.
pub fn nonv_root(arena: &Arena, id: ObjectId) -> ObjectId {
    let mut current = id;
    loop {
        let slot = arena.object(current);
        match slot.parent {
            None => return current,
            Some(parent) => {
                if slot.name_kind == NameKind::Virtual {
                    current = parent;
                } else {
                    return current;
                }
            }
        }
    }
}

/// Pointer-equality forwarded through ghosting, matching `Object::ptrEquals`.
pub fn ptr_equals(arena: &Arena, a: ObjectId, b: ObjectId) -> bool {
    deghost(arena, a) == deghost(arena, b)
}

/// Replace every `Node::Object(current)` child slot of `parent` with
/// `replacement`. Matches `Object::ptrswap`, forwarded through `parent`'s own
/// ghost first (the original forwards the whole call when `this` — the
/// object whose children are being scanned — is itself a ghost).
pub fn ptrswap(arena: &mut Arena, parent: ObjectId, current: ObjectId, replacement: ObjectId) {
    let parent = deghost(arena, parent);
    let child_ids: Vec<_> = arena.object(parent).children.clone();
    for nid in child_ids {
        if let Node::Object(oid) = arena.node_mut(nid) {
            if *oid == current {
                *oid = replacement;
            }
        }
    }
}
