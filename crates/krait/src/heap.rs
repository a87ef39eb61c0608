use num_bigint::BigInt;

use crate::{
    exceptions::SimpleException,
    function::Function,
    namespace::Scope,
    types::{Class, Dict, Instance, Set},
    value::Value,
};

/// Handle to a value stored in the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HeapId(u32);

impl HeapId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Heap-allocated runtime data.
///
/// Everything that is not a small immediate lives here, including scope
/// frames: closures, classes, and instances form cycles freely because
/// reclamation is a mark-sweep pass rather than reference counting.
#[derive(Debug, Clone)]
pub(crate) enum HeapData {
    Str(String),
    /// Integer outside the i64 immediate range.
    LongInt(BigInt),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Set),
    Dict(Dict),
    Function(Function),
    /// A function paired with the instance it was read through; calling it
    /// prepends the instance as the first argument.
    BoundMethod {
        func: HeapId,
        instance: HeapId,
    },
    Class(Class),
    Instance(Instance),
    /// A caught built-in exception, materialized so handlers can match and
    /// bind it.
    Exception(SimpleException),
    Scope(Scope),
}

/// Marks the heap id behind a value, if it has one.
fn mark_value(value: Value, mark: &mut impl FnMut(HeapId)) {
    if let Some(id) = value.ref_id() {
        mark(id);
    }
}

impl HeapData {
    /// Visits every heap id this object refers to.
    fn trace(&self, mark: &mut impl FnMut(HeapId)) {
        match self {
            Self::Str(_) | Self::LongInt(_) | Self::Exception(_) => {}
            Self::List(items) | Self::Tuple(items) => {
                for item in items {
                    mark_value(*item, mark);
                }
            }
            Self::Set(set) => {
                for item in set.iter() {
                    mark_value(*item, mark);
                }
            }
            Self::Dict(dict) => {
                for (_, entry) in dict.iter() {
                    mark_value(entry.key, mark);
                    mark_value(entry.value, mark);
                }
            }
            Self::Function(func) => {
                for (_, default) in &func.params {
                    if let Some(value) = default {
                        mark_value(*value, mark);
                    }
                }
                mark(func.scope);
            }
            Self::BoundMethod { func, instance } => {
                mark(*func);
                mark(*instance);
            }
            Self::Class(class) => {
                if let Some(base) = class.base {
                    mark(base);
                }
                for value in class.attrs.values() {
                    mark_value(*value, mark);
                }
            }
            Self::Instance(instance) => {
                mark(instance.class);
                for value in instance.attrs.values() {
                    mark_value(*value, mark);
                }
            }
            Self::Scope(scope) => {
                if let Some(parent) = scope.parent {
                    mark(parent);
                }
                for value in scope.vars.values() {
                    mark_value(*value, mark);
                }
            }
        }
    }
}

/// The slotted arena holding all non-immediate runtime objects.
///
/// Slots are recycled through a free list. Collection happens only between
/// REPL chunks, when the global scope is the sole root, so the evaluator
/// never needs to register temporary roots.
#[derive(Debug, Default)]
pub(crate) struct Heap {
    slots: Vec<Option<HeapData>>,
    free: Vec<u32>,
}

impl Heap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&mut self, data: HeapData) -> HeapId {
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(data);
            return HeapId(index);
        }
        let index = u32::try_from(self.slots.len()).expect("heap exceeded u32 slots");
        self.slots.push(Some(data));
        HeapId(index)
    }

    /// # Panics
    /// Panics if the slot was collected; live code never holds such an id.
    pub(crate) fn get(&self, id: HeapId) -> &HeapData {
        self.slots[id.index()].as_ref().expect("heap slot used after collection")
    }

    pub(crate) fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        self.slots[id.index()].as_mut().expect("heap slot used after collection")
    }

    /// # Panics
    /// Panics if the slot does not hold a scope frame.
    pub(crate) fn scope(&self, id: HeapId) -> &Scope {
        match self.get(id) {
            HeapData::Scope(scope) => scope,
            other => panic!("expected scope frame, found {other:?}"),
        }
    }

    pub(crate) fn scope_mut(&mut self, id: HeapId) -> &mut Scope {
        match self.get_mut(id) {
            HeapData::Scope(scope) => scope,
            other => panic!("expected scope frame, found {other:?}"),
        }
    }

    /// Mark-sweep collection from the given roots.
    ///
    /// Anything unreachable is dropped and its slot recycled. Cycles through
    /// closures, classes, and instances are reclaimed like everything else.
    pub(crate) fn collect(&mut self, roots: impl IntoIterator<Item = HeapId>) {
        let mut marked = vec![false; self.slots.len()];
        let mut work: Vec<HeapId> = roots.into_iter().collect();
        while let Some(id) = work.pop() {
            let index = id.index();
            if marked[index] {
                continue;
            }
            marked[index] = true;
            if let Some(data) = &self.slots[index] {
                data.trace(&mut |child| work.push(child));
            }
        }
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !marked[index] {
                *slot = None;
                self.free.push(u32::try_from(index).expect("slot index fits u32"));
            }
        }
    }

    /// Number of live objects, for observability and tests.
    pub(crate) fn live_objects(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_reclaims_unreachable_objects() {
        let mut heap = Heap::new();
        let root = heap.allocate(HeapData::Scope(Scope::new_root()));
        let garbage = heap.allocate(HeapData::Str("orphan".to_owned()));
        let kept = heap.allocate(HeapData::Str("kept".to_owned()));
        heap.scope_mut(root).vars.insert("s".to_owned(), Value::Ref(kept));

        heap.collect([root]);

        assert_eq!(heap.live_objects(), 2);
        assert!(matches!(heap.get(kept), HeapData::Str(s) if s == "kept"));
        // The freed slot is recycled by the next allocation.
        let reused = heap.allocate(HeapData::Str("new".to_owned()));
        assert_eq!(reused, garbage);
    }

    #[test]
    fn collect_reclaims_cycles() {
        let mut heap = Heap::new();
        let a = heap.allocate(HeapData::List(Vec::new()));
        let b = heap.allocate(HeapData::List(vec![Value::Ref(a)]));
        match heap.get_mut(a) {
            HeapData::List(items) => items.push(Value::Ref(b)),
            _ => unreachable!(),
        }

        heap.collect([]);
        assert_eq!(heap.live_objects(), 0);
    }

    #[test]
    fn scopes_keep_their_parents_alive() {
        let mut heap = Heap::new();
        let root = heap.allocate(HeapData::Scope(Scope::new_root()));
        let child = heap.allocate(HeapData::Scope(Scope::new_child(root)));

        heap.collect([child]);
        assert_eq!(heap.live_objects(), 2);
    }
}
