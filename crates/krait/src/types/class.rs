use indexmap::IndexMap;

use crate::{
    heap::{Heap, HeapData, HeapId},
    value::Value,
};

/// A user-defined class: name, optional single base, and the attribute map
/// snapshotted from executing the class body.
#[derive(Debug, Clone)]
pub(crate) struct Class {
    pub name: String,
    pub base: Option<HeapId>,
    pub attrs: IndexMap<String, Value>,
}

/// An instance: a non-owning link to its class plus its own attribute map.
#[derive(Debug, Clone)]
pub(crate) struct Instance {
    pub class: HeapId,
    pub attrs: IndexMap<String, Value>,
}

/// Looks up an attribute on a class, walking the single-inheritance base
/// chain.
///
/// # Panics
/// Panics if `class_id` does not refer to a class; callers guarantee this.
pub(crate) fn lookup_class_attr(heap: &Heap, class_id: HeapId, name: &str) -> Option<Value> {
    let mut current = Some(class_id);
    while let Some(id) = current {
        let HeapData::Class(class) = heap.get(id) else {
            panic!("class base chain must contain only classes");
        };
        if let Some(value) = class.attrs.get(name) {
            return Some(*value);
        }
        current = class.base;
    }
    None
}
