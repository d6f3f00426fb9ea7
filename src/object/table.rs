//! Associative table from Value to Value.
//!
//! Backs property and method storage on classes, instances and modules as
//! well as dictionary items. Iteration follows first-insertion order.

use ahash::RandomState;
use indexmap::IndexMap;

use super::value::{Key, Value};
use crate::error::RuntimeError;

#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: IndexMap<Key, Value, RandomState>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `key`. Absence is `None`, never an error.
    pub fn get(&self, key: Value) -> Option<Value> {
        self.entries.get(&Key(key)).copied()
    }

    pub fn contains(&self, key: Value) -> bool {
        self.entries.contains_key(&Key(key))
    }

    /// Insert or overwrite. An existing key keeps its position.
    /// Returns true when the key was not present before.
    pub fn set(&mut self, key: Value, value: Value) -> bool {
        self.entries.insert(Key(key), value).is_none()
    }

    /// Room for `additional` more entries without reallocating.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), RuntimeError> {
        self.entries.try_reserve(additional)?;
        Ok(())
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.entries.shrink_to_fit();
    }

    /// Remove `key`, preserving the order of the remaining entries.
    pub fn delete(&mut self, key: Value) -> Option<Value> {
        self.entries.shift_remove(&Key(key))
    }

    /// Copy every entry of `self` into `dest`, overwriting existing keys.
    pub fn add_all(&self, dest: &mut Table) -> Result<(), RuntimeError> {
        dest.entries.try_reserve(self.entries.len())?;
        for (key, value) in &self.entries {
            dest.entries.insert(*key, *value);
        }
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = Value> + '_ {
        self.entries.keys().map(|k| k.0)
    }

    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.entries.values().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.entries.iter().map(|(k, v)| (k.0, *v))
    }

    /// Entry at insertion position `index`.
    pub fn get_index(&self, index: usize) -> Option<(Value, Value)> {
        self.entries.get_index(index).map(|(k, v)| (k.0, *v))
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}
