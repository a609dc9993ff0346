use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    exception_private::{ExcType, RunResult},
    types::Type,
    value::Value,
};

/// Hashable projection of a value, used as the key of dicts and sets.
///
/// Numeric keys collapse the way Python's hashing does: `1`, `1.0` and `True` are the same
/// key. Objects without value semantics (functions, classes, instances) hash by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum HashKey {
    None,
    Ellipsis,
    Int(i64),
    /// Bit pattern of a non-integral float.
    Float(u64),
    Str(Rc<str>),
    Tuple(Vec<HashKey>),
    Type(Type),
    Exc(crate::exception_private::ExcType),
    Builtin(crate::builtins::Builtin),
    Identity(usize),
}

impl HashKey {
    /// Computes the key for `value`, failing with TypeError for mutable containers.
    pub(crate) fn new(value: &Value) -> RunResult<Self> {
        let key = match value {
            Value::None => Self::None,
            Value::Ellipsis => Self::Ellipsis,
            Value::Bool(b) => Self::Int(i64::from(*b)),
            Value::Int(i) => Self::Int(*i),
            Value::Float(f) => float_key(*f),
            Value::Str(s) => Self::Str(s.clone()),
            Value::Tuple(items) => Self::Tuple(items.iter().map(Self::new).collect::<RunResult<_>>()?),
            Value::Type(t) => Self::Type(*t),
            Value::ExcType(e) => Self::Exc(*e),
            Value::Builtin(b) => Self::Builtin(*b),
            Value::Range(range) => Self::Tuple(vec![Self::Int(range.start), Self::Int(range.stop), Self::Int(range.step)]),
            Value::List(_) | Value::Dict(_) | Value::Set(_) | Value::Slice(_) => {
                return Err(ExcType::type_error_unhashable(&value.type_name()))
            }
            other => Self::Identity(other.id()),
        };
        Ok(key)
    }

    /// Integer hash exposed through the `hash()` builtin.
    pub(crate) fn py_hash(&self) -> i64 {
        use std::hash::{BuildHasher, Hash, Hasher};
        match self {
            Self::Int(i) => *i,
            other => {
                let mut hasher = ahash::RandomState::with_seeds(1, 2, 3, 4).build_hasher();
                other.hash(&mut hasher);
                i64::from_ne_bytes(hasher.finish().to_ne_bytes())
            }
        }
    }
}

fn float_key(f: f64) -> HashKey {
    if f.fract() == 0.0 && f.abs() < 9.2e18 {
        HashKey::Int(f as i64)
    } else {
        HashKey::Float(f.to_bits())
    }
}

/// Insertion-ordered Python dict.
///
/// Each entry keeps the original key value alongside the stored value so that iteration
/// yields the keys exactly as they were inserted.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: IndexMap<HashKey, (Value, Value), ahash::RandomState>,
}

impl Dict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity_and_hasher(capacity, ahash::RandomState::new()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, key: &Value) -> RunResult<Option<Value>> {
        let hash_key = HashKey::new(key)?;
        Ok(self.entries.get(&hash_key).map(|(_, v)| v.clone()))
    }

    /// Looks up a string key without allocating a value for it.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<Value> {
        self.entries.get(&HashKey::Str(key.into())).map(|(_, v)| v.clone())
    }

    pub(crate) fn contains(&self, key: &Value) -> RunResult<bool> {
        Ok(self.entries.contains_key(&HashKey::new(key)?))
    }

    /// Inserts or replaces an entry, keeping the original position of an existing key.
    pub(crate) fn set(&mut self, key: Value, value: Value) -> RunResult<()> {
        let hash_key = HashKey::new(&key)?;
        match self.entries.get_mut(&hash_key) {
            Some(entry) => entry.1 = value,
            None => {
                self.entries.insert(hash_key, (key, value));
            }
        }
        Ok(())
    }

    /// Inserts a string-keyed entry, used for keyword arguments and namespaces.
    pub fn set_str(&mut self, key: &str, value: Value) {
        let key: Rc<str> = key.into();
        self.entries
            .insert(HashKey::Str(key.clone()), (Value::Str(key), value));
    }

    pub(crate) fn remove(&mut self, key: &Value) -> RunResult<Option<Value>> {
        let hash_key = HashKey::new(key)?;
        Ok(self.entries.shift_remove(&hash_key).map(|(_, v)| v))
    }

    pub(crate) fn pop_last(&mut self) -> Option<(Value, Value)> {
        self.entries.pop().map(|(_, entry)| entry)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn key_at(&self, index: usize) -> Option<Value> {
        self.entries.get_index(index).map(|(_, (k, _))| k.clone())
    }

    #[must_use]
    pub fn keys(&self) -> Vec<Value> {
        self.entries.values().map(|(k, _)| k.clone()).collect()
    }

    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.entries.values().map(|(_, v)| v.clone()).collect()
    }

    #[must_use]
    pub fn items(&self) -> Vec<(Value, Value)> {
        self.entries.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.values().map(|(k, v)| (k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_keys_collapse() {
        let mut dict = Dict::new();
        dict.set(Value::Int(1), Value::Str("int".into())).unwrap();
        dict.set(Value::Float(1.0), Value::Str("float".into())).unwrap();
        dict.set(Value::Bool(true), Value::Str("bool".into())).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&Value::Int(1)).unwrap().unwrap().py_str(), "bool");
        // the first inserted key is kept
        assert_eq!(dict.keys()[0].py_repr(), "1");
    }

    #[test]
    fn test_unhashable_key() {
        let mut dict = Dict::new();
        let list = Value::List(Rc::new(std::cell::RefCell::new(vec![])));
        assert!(dict.set(list, Value::None).is_err());
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut dict = Dict::new();
        for key in ["a", "b", "c"] {
            dict.set_str(key, Value::None);
        }
        dict.remove(&Value::Str("b".into())).unwrap();
        let keys: Vec<_> = dict.keys().iter().map(|k| k.py_str().into_owned()).collect();
        assert_eq!(keys, ["a", "c"]);
    }
}
