use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{
    exceptions::{ExcType, RunResult},
    heap::{Heap, HeapData},
    value::Value,
};

/// A hashable key derived from a value.
///
/// Numeric keys are normalized so `True`, `1`, and `1.0` address the same
/// slot; the original key value is kept alongside each entry for printing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum DictKey {
    None,
    Int(i64),
    Big(BigInt),
    /// Bit pattern of a non-integral float.
    FloatBits(u64),
    Str(String),
    Tuple(Vec<DictKey>),
    Builtin(&'static str),
}

impl DictKey {
    /// Derives a key from a value, or raises `TypeError` for unhashable
    /// (mutable) values.
    pub(crate) fn from_value(value: Value, heap: &Heap) -> RunResult<Self> {
        match value {
            Value::None => Ok(Self::None),
            Value::Bool(b) => Ok(Self::Int(i64::from(b))),
            Value::Int(v) => Ok(Self::Int(v)),
            Value::Float(v) => Ok(Self::from_float(v)),
            Value::Builtin(b) => Ok(Self::Builtin(b.name())),
            Value::Ref(id) => match heap.get(id) {
                HeapData::Str(s) => Ok(Self::Str(s.clone())),
                HeapData::LongInt(big) => Ok(match big.to_i64() {
                    Some(v) => Self::Int(v),
                    None => Self::Big(big.clone()),
                }),
                HeapData::Tuple(items) => {
                    let keys = items
                        .iter()
                        .map(|item| Self::from_value(*item, heap))
                        .collect::<RunResult<Vec<_>>>()?;
                    Ok(Self::Tuple(keys))
                }
                _ => Err(ExcType::type_error(format!(
                    "unhashable type: '{}'",
                    value.type_name(heap)
                ))),
            },
        }
    }

    fn from_float(value: f64) -> Self {
        // Integral floats share their slot with the equal integer.
        if value.fract() == 0.0 && value.abs() < 9.2e18 {
            Self::Int(value as i64)
        } else {
            Self::FloatBits(value.to_bits())
        }
    }
}

/// One dict entry: the key value as written plus the mapped value.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DictEntry {
    pub key: Value,
    pub value: Value,
}

/// An insertion-ordered mapping with hashable keys.
#[derive(Debug, Clone, Default)]
pub(crate) struct Dict {
    entries: IndexMap<DictKey, DictEntry>,
}

impl Dict {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, key: &DictKey) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value)
    }

    /// Inserts or updates; an updated entry keeps its original position.
    pub(crate) fn insert(&mut self, key: DictKey, key_value: Value, value: Value) {
        self.entries.insert(
            key,
            DictEntry {
                key: key_value,
                value,
            },
        );
    }

    /// Removes an entry, preserving the order of the remaining entries.
    pub(crate) fn remove(&mut self, key: &DictKey) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&DictKey, &DictEntry)> {
        self.entries.iter()
    }
}
