//! Name-binding scopes shared between frames.
//!
//! A module's globals are one `Namespace` handed to every frame executing code from that
//! module, so writes made through `STORE_GLOBAL` in one function are visible to all others.
//! Cloning a `Namespace` clones the handle, never the bindings.

use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{types::Dict, value::Value};

type Bindings = IndexMap<Rc<str>, Value, ahash::RandomState>;

/// A shared, insertion-ordered mapping from names to values.
#[derive(Debug, Clone, Default)]
pub struct Namespace(Rc<RefCell<Bindings>>);

impl Namespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default module globals: `__name__`, `__doc__` and `__package__` bound.
    #[must_use]
    pub fn new_module(name: &str) -> Self {
        let namespace = Self::new();
        namespace.set("__name__", Value::Str(name.into()));
        namespace.set("__doc__", Value::None);
        namespace.set("__package__", Value::None);
        namespace
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<Rc<str>>, value: Value) {
        self.0.borrow_mut().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.0.borrow_mut().shift_remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.borrow().contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// True when both handles refer to the same bindings.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Copies the current bindings out, so callers can iterate while the scope is mutated.
    #[must_use]
    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        self.0.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Builds a namespace from the string keys of a dict, e.g. a `__builtins__` mapping.
    #[must_use]
    pub fn from_dict(dict: &Dict) -> Self {
        let namespace = Self::new();
        for (key, value) in dict.iter() {
            if let Value::Str(name) = key {
                namespace.set(name.clone(), value.clone());
            }
        }
        namespace
    }

    /// Snapshot of the bindings as a dict value, as `LOAD_LOCALS` and `locals()` expose them.
    #[must_use]
    pub fn to_dict(&self) -> Dict {
        let mut dict = Dict::new();
        for (name, value) in self.0.borrow().iter() {
            dict.set_str(name, value.clone());
        }
        dict
    }

    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

/// A host-registered module reachable through `IMPORT_NAME`.
#[derive(Debug)]
pub struct Module {
    name: Rc<str>,
    namespace: Namespace,
}

impl Module {
    #[must_use]
    pub fn new(name: &str, namespace: Namespace) -> Self {
        Self {
            name: name.into(),
            namespace,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_handle() {
        let globals = Namespace::new_module("__main__");
        let alias = globals.clone();
        alias.set("x", Value::Int(1));
        assert!(matches!(globals.get("x"), Some(Value::Int(1))));
        assert!(globals.ptr_eq(&alias));
        assert!(!globals.ptr_eq(&Namespace::new()));
    }

    #[test]
    fn test_module_defaults() {
        let globals = Namespace::new_module("pkg");
        assert_eq!(globals.get("__name__").unwrap().py_str(), "pkg");
        assert!(globals.contains("__doc__"));
        assert_eq!(globals.remove("__package__").map(|v| v.py_repr().into_owned()), Some("None".to_owned()));
    }
}
