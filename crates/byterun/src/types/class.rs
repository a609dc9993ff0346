//! User-defined classes and their instances.

use std::rc::Rc;

use crate::{exception_private::ExcType, namespace::Namespace, value::Value};

/// A class created by `__build_class__` from a class body namespace.
#[derive(Debug)]
pub struct Class {
    name: Rc<str>,
    /// Base classes in declaration order: other classes, builtin exception classes or `object`.
    bases: Vec<Value>,
    attrs: Namespace,
}

impl Class {
    #[must_use]
    pub fn new(name: Rc<str>, bases: Vec<Value>, attrs: Namespace) -> Self {
        Self { name, bases, attrs }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn bases(&self) -> &[Value] {
        &self.bases
    }

    #[must_use]
    pub fn attrs(&self) -> &Namespace {
        &self.attrs
    }

    /// Module the class was defined in, as recorded by the class body in `__module__`.
    #[must_use]
    pub fn module(&self) -> Option<Rc<str>> {
        match self.attrs.get("__module__") {
            Some(Value::Str(module)) => Some(module),
            _ => None,
        }
    }

    /// Looks `name` up on the class and then on its bases, depth first, left to right.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.attrs.get(name) {
            return Some(value);
        }
        self.bases.iter().find_map(|base| match base {
            Value::Class(base) => base.lookup(name),
            _ => None,
        })
    }

    /// True when `self` is `other` or derives from it.
    #[must_use]
    pub fn is_subclass_of(self: &Rc<Self>, other: &Rc<Self>) -> bool {
        Rc::ptr_eq(self, other)
            || self.bases.iter().any(|base| match base {
                Value::Class(base) => base.is_subclass_of(other),
                _ => false,
            })
    }

    /// The builtin exception class this class ultimately derives from, if any.
    #[must_use]
    pub fn exc_base(&self) -> Option<ExcType> {
        self.bases.iter().find_map(|base| match base {
            Value::ExcType(exc_type) => Some(*exc_type),
            Value::Class(base) => base.exc_base(),
            _ => None,
        })
    }
}

/// An instance of a user-defined class with its own attribute namespace.
#[derive(Debug)]
pub struct Instance {
    class: Rc<Class>,
    attrs: Namespace,
}

impl Instance {
    #[must_use]
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            attrs: Namespace::new(),
        }
    }

    #[must_use]
    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    #[must_use]
    pub fn attrs(&self) -> &Namespace {
        &self.attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_through_bases() {
        let base_ns = Namespace::new();
        base_ns.set("greet", Value::Int(1));
        let base = Rc::new(Class::new("Base".into(), vec![], base_ns));
        let child = Rc::new(Class::new("Child".into(), vec![Value::Class(base.clone())], Namespace::new()));
        assert!(matches!(child.lookup("greet"), Some(Value::Int(1))));
        assert!(child.lookup("missing").is_none());
        assert!(child.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&child));
    }

    #[test]
    fn test_exc_base() {
        let err = Rc::new(Class::new(
            "MyError".into(),
            vec![Value::ExcType(ExcType::ValueError)],
            Namespace::new(),
        ));
        let sub = Class::new("SubError".into(), vec![Value::Class(err)], Namespace::new());
        assert_eq!(sub.exc_base(), Some(ExcType::ValueError));
    }
}
