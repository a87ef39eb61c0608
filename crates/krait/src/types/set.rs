use indexmap::IndexMap;

use crate::{types::DictKey, value::Value};

/// An unordered collection of unique hashable values.
///
/// Backed by the same key normalization as dicts; iteration and printing
/// follow first-insertion order, so `{1, 2, 2, 1}` prints as `{1, 2}`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Set {
    entries: IndexMap<DictKey, Value>,
}

impl Set {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Inserts a value; duplicates keep the first occurrence.
    pub(crate) fn insert(&mut self, key: DictKey, value: Value) {
        self.entries.entry(key).or_insert(value);
    }

    pub(crate) fn contains(&self, key: &DictKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &DictKey> {
        self.entries.keys()
    }
}
