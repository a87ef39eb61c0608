use ahash::AHashMap;

use crate::{
    heap::{Heap, HeapId},
    value::Value,
};

/// One link of the environment chain: a name-to-value mapping with a parent
/// link.
///
/// Scopes live in the heap arena alongside every other runtime object, which
/// is what lets closures keep their defining frames alive and lets the
/// mark-sweep pass reclaim frames once nothing references them.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    pub vars: AHashMap<String, Value>,
    pub parent: Option<HeapId>,
}

impl Scope {
    /// The root frame: builtins and top-level bindings, no parent.
    pub(crate) fn new_root() -> Self {
        Self::default()
    }

    pub(crate) fn new_child(parent: HeapId) -> Self {
        Self {
            vars: AHashMap::new(),
            parent: Some(parent),
        }
    }
}

/// Looks a name up, walking the parent chain from the given frame.
pub(crate) fn lookup_name(heap: &Heap, scope: HeapId, name: &str) -> Option<Value> {
    let mut current = Some(scope);
    while let Some(id) = current {
        let frame = heap.scope(id);
        if let Some(value) = frame.vars.get(name) {
            return Some(*value);
        }
        current = frame.parent;
    }
    None
}

/// Binds a name in the given frame, shadowing any outer binding.
pub(crate) fn assign_name(heap: &mut Heap, scope: HeapId, name: &str, value: Value) {
    heap.scope_mut(scope).vars.insert(name.to_owned(), value);
}

/// Unbinds a name from the given frame only; returns whether it was bound.
pub(crate) fn unbind_name(heap: &mut Heap, scope: HeapId, name: &str) -> bool {
    heap.scope_mut(scope).vars.remove(name).is_some()
}
