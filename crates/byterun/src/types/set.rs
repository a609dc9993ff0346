use indexmap::IndexMap;

use crate::{
    exception_private::{ExcType, RunResult},
    types::dict::HashKey,
    value::Value,
};

/// Insertion-ordered Python set.
#[derive(Debug, Clone, Default)]
pub struct Set {
    items: IndexMap<HashKey, Value, ahash::RandomState>,
}

impl Set {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_values(values: impl IntoIterator<Item = Value>) -> RunResult<Self> {
        let mut set = Self::new();
        for value in values {
            set.add(value)?;
        }
        Ok(set)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `value`; returns false when an equal element was already present.
    pub(crate) fn add(&mut self, value: Value) -> RunResult<bool> {
        let key = HashKey::new(&value)?;
        if self.items.contains_key(&key) {
            return Ok(false);
        }
        self.items.insert(key, value);
        Ok(true)
    }

    pub(crate) fn contains(&self, value: &Value) -> RunResult<bool> {
        Ok(self.items.contains_key(&HashKey::new(value)?))
    }

    pub(crate) fn discard(&mut self, value: &Value) -> RunResult<bool> {
        Ok(self.items.shift_remove(&HashKey::new(value)?).is_some())
    }

    pub(crate) fn remove(&mut self, value: &Value) -> RunResult<()> {
        if self.discard(value)? {
            Ok(())
        } else {
            Err(ExcType::key_error(value))
        }
    }

    pub(crate) fn pop(&mut self) -> RunResult<Value> {
        self.items
            .shift_remove_index(0)
            .map(|(_, v)| v)
            .ok_or_else(ExcType::key_error_pop_empty_set)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn item_at(&self, index: usize) -> Option<Value> {
        self.items.get_index(index).map(|(_, v)| v.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.values()
    }

    pub(crate) fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for (key, value) in &other.items {
            result.items.entry(key.clone()).or_insert_with(|| value.clone());
        }
        result
    }

    pub(crate) fn intersection(&self, other: &Self) -> Self {
        let items = self
            .items
            .iter()
            .filter(|(key, _)| other.items.contains_key(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self { items }
    }

    pub(crate) fn difference(&self, other: &Self) -> Self {
        let items = self
            .items
            .iter()
            .filter(|(key, _)| !other.items.contains_key(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self { items }
    }

    pub(crate) fn symmetric_difference(&self, other: &Self) -> Self {
        let mut result = self.difference(other);
        for (key, value) in &other.items {
            if !self.items.contains_key(key) {
                result.items.insert(key.clone(), value.clone());
            }
        }
        result
    }

    pub(crate) fn is_subset(&self, other: &Self) -> bool {
        self.items.keys().all(|key| other.items.contains_key(key))
    }
}
