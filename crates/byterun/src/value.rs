use std::{
    borrow::Cow,
    cell::RefCell,
    cmp::Ordering,
    fmt::{self, Write},
    rc::Rc,
};

use ahash::AHashSet;

use crate::{
    builtins::Builtin,
    bytecode::Code,
    exception_private::{ExcType, RunResult},
    exception_public::StackFrame,
    for_iterator::ForIterator,
    frame::Why,
    function::{BuiltinMethod, Cell, Function, Method, NativeFunction},
    generator::Generator,
    namespace::Module,
    types::{
        str::{float_repr, string_repr_fmt},
        Class, Dict, ExceptionValue, Instance, Range, Set, Slice, Type,
    },
};

/// Primary value type representing Python objects at runtime.
///
/// Immutable scalars are stored inline. Everything with identity or interior mutability is
/// shared through `Rc`, and mutable containers sit behind a `RefCell`, so cloning a `Value`
/// clones a reference exactly like assignment does in Python.
#[derive(Clone)]
pub enum Value {
    None,
    Ellipsis,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Tuple(Rc<Vec<Value>>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    Set(Rc<RefCell<Set>>),
    Range(Range),
    Slice(Slice),
    /// A compiled unit loaded as a constant, consumed by `MAKE_FUNCTION`.
    Code(Rc<Code>),
    /// A closure cell, as pushed by `LOAD_CLOSURE`.
    Cell(Rc<Cell>),
    Function(Rc<Function>),
    Method(Rc<Method>),
    Builtin(Builtin),
    BuiltinMethod(Rc<BuiltinMethod>),
    /// A function supplied by the host.
    Native(Rc<NativeFunction>),
    /// A builtin type such as `int` or `list`.
    Type(Type),
    /// A builtin exception class such as `ValueError`.
    ExcType(ExcType),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Exception(Rc<ExceptionValue>),
    Traceback(Rc<Vec<StackFrame>>),
    Iterator(Rc<RefCell<ForIterator>>),
    Generator(Rc<RefCell<Generator>>),
    Module(Rc<Module>),
    /// Reason token saved on the operand stack by a finally block, consumed by `END_FINALLY`.
    #[doc(hidden)]
    Why(Why),
    /// Pushed by `WITH_CLEANUP` when `__exit__` swallowed the exception.
    #[doc(hidden)]
    Silenced,
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.py_repr())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v.into())
    }
}

impl Value {
    #[must_use]
    pub fn tuple(items: Vec<Value>) -> Self {
        Self::Tuple(Rc::new(items))
    }

    #[must_use]
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn dict(dict: Dict) -> Self {
        Self::Dict(Rc::new(RefCell::new(dict)))
    }

    #[must_use]
    pub fn set(set: Set) -> Self {
        Self::Set(Rc::new(RefCell::new(set)))
    }

    /// Converts a `usize` length or index into an int value.
    pub(crate) fn from_len(len: usize) -> Self {
        Self::Int(i64::try_from(len).unwrap_or(i64::MAX))
    }

    /// The builtin type of the value; user instances report `object`.
    #[must_use]
    pub fn py_type(&self) -> Type {
        match self {
            Self::None => Type::NoneType,
            Self::Ellipsis => Type::Ellipsis,
            Self::Bool(_) => Type::Bool,
            Self::Int(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::Str(_) => Type::Str,
            Self::Tuple(_) => Type::Tuple,
            Self::List(_) => Type::List,
            Self::Dict(_) => Type::Dict,
            Self::Set(_) => Type::Set,
            Self::Range(_) => Type::Range,
            Self::Slice(_) => Type::Slice,
            Self::Code(_) => Type::Code,
            Self::Cell(_) => Type::Cell,
            Self::Function(_) => Type::Function,
            Self::Method(_) => Type::Method,
            Self::Builtin(_) | Self::BuiltinMethod(_) | Self::Native(_) => Type::BuiltinFunction,
            Self::Type(_) | Self::ExcType(_) | Self::Class(_) => Type::Type,
            Self::Instance(_) | Self::Why(_) | Self::Silenced => Type::Object,
            Self::Exception(_) => Type::Exception,
            Self::Traceback(_) => Type::Traceback,
            Self::Iterator(_) => Type::Iterator,
            Self::Generator(_) => Type::Generator,
            Self::Module(_) => Type::Module,
        }
    }

    /// The class of the value as a first-class value, as returned by `type(x)`.
    #[must_use]
    pub fn type_value(&self) -> Value {
        match self {
            Self::Instance(instance) => Value::Class(instance.class().clone()),
            Self::Exception(exc) => exc.class_value(),
            other => Value::Type(other.py_type()),
        }
    }

    /// Name of the value's class as used in error messages.
    #[must_use]
    pub fn type_name(&self) -> Cow<'static, str> {
        match self {
            Self::Instance(instance) => Cow::Owned(instance.class().name().to_owned()),
            Self::Exception(exc) => Cow::Owned(exc.type_name().into_owned()),
            Self::Iterator(iter) => Cow::Borrowed(iter.borrow().type_name()),
            other => Cow::Borrowed(other.py_type().into()),
        }
    }

    /// Python truthiness for values that don't need the interpreter to decide it.
    #[must_use]
    pub fn py_bool(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(v) => *v != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Tuple(items) => !items.is_empty(),
            Self::List(items) => !items.borrow().is_empty(),
            Self::Dict(dict) => !dict.borrow().is_empty(),
            Self::Set(set) => !set.borrow().is_empty(),
            Self::Range(range) => !range.is_empty(),
            _ => true,
        }
    }

    /// Length of sized builtin values, `None` when the value has no `len()`.
    #[must_use]
    pub fn py_len(&self) -> Option<usize> {
        match self {
            // Count Unicode characters, not bytes, to match Python semantics
            Self::Str(s) => Some(s.chars().count()),
            Self::Tuple(items) => Some(items.len()),
            Self::List(items) => Some(items.borrow().len()),
            Self::Dict(dict) => Some(dict.borrow().len()),
            Self::Set(set) => Some(set.borrow().len()),
            Self::Range(range) => Some(range.len()),
            _ => None,
        }
    }

    /// Identity of the value, exposed through `id()`.
    ///
    /// Shared values use the address of their allocation. Immediate values have no address,
    /// so their id is derived from the value itself.
    #[must_use]
    pub fn id(&self) -> usize {
        fn addr<T: ?Sized>(rc: &Rc<T>) -> usize {
            Rc::as_ptr(rc).cast::<()>() as usize
        }
        match self {
            Self::None => 0x10,
            Self::Ellipsis => 0x20,
            Self::Silenced => 0x30,
            Self::Bool(b) => 0x40 + usize::from(*b),
            Self::Int(i) => (*i as usize).rotate_left(4) | 0x1,
            Self::Float(f) => (f.to_bits() as usize).rotate_left(4) | 0x2,
            Self::Range(r) => (r.start as usize).rotate_left(8) ^ (r.stop as usize).rotate_left(4) ^ 0x3,
            Self::Slice(s) => (s.start.unwrap_or(-1) as usize).rotate_left(8) ^ (s.stop.unwrap_or(-1) as usize) ^ 0x4,
            Self::Type(t) => 0x1000 + *t as usize,
            Self::ExcType(e) => 0x2000 + *e as usize,
            Self::Builtin(b) => 0x3000 + *b as usize,
            Self::Why(w) => 0x4000 + *w as usize,
            Self::Str(s) => addr(s),
            Self::Tuple(v) => addr(v),
            Self::List(v) => addr(v),
            Self::Dict(v) => addr(v),
            Self::Set(v) => addr(v),
            Self::Code(v) => addr(v),
            Self::Cell(v) => addr(v),
            Self::Function(v) => addr(v),
            Self::Method(v) => addr(v),
            Self::BuiltinMethod(v) => addr(v),
            Self::Native(v) => addr(v),
            Self::Class(v) => addr(v),
            Self::Instance(v) => addr(v),
            Self::Exception(v) => addr(v),
            Self::Traceback(v) => addr(v),
            Self::Iterator(v) => addr(v),
            Self::Generator(v) => addr(v),
            Self::Module(v) => addr(v),
        }
    }

    /// The `is` operator.
    ///
    /// Immutable immediates compare by value; everything else compares by allocation.
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::Ellipsis, Self::Ellipsis) | (Self::Silenced, Self::Silenced) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::ExcType(a), Self::ExcType(b)) => a == b,
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Why(a), Self::Why(b)) => a == b,
            (Self::Range(_) | Self::Slice(_), _) => false,
            (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => a.id() == b.id(),
            _ => false,
        }
    }

    /// Structural equality for builtin values; falls back to identity for everything else.
    #[must_use]
    pub fn py_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Bool(a), _) => Self::Int(i64::from(*a)).py_eq(other),
            (_, Self::Bool(b)) => self.py_eq(&Self::Int(i64::from(*b))),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => seq_eq(a, b),
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b) || seq_eq(&a.borrow(), &b.borrow()),
            (Self::Dict(a), Self::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(key, value)| match b.get(key) {
                        Ok(Some(other)) => value.py_eq(&other),
                        _ => false,
                    })
            }
            (Self::Set(a), Self::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.is_subset(&b)
            }
            (Self::Range(a), Self::Range(b)) => {
                a.len() == b.len() && (a.is_empty() || (a.start == b.start && (a.len() == 1 || a.step == b.step)))
            }
            (Self::Slice(a), Self::Slice(b)) => a == b,
            (Self::Method(a), Self::Method(b)) => {
                a.func().is(b.func())
                    && match (a.receiver(), b.receiver()) {
                        (Some(x), Some(y)) => x.is(y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            _ => self.is(other),
        }
    }

    /// Ordering for `<`, `<=`, `>` and `>=` between builtin values.
    ///
    /// Returns `None` when the two values are not orderable against each other.
    #[must_use]
    pub fn py_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Bool(a), _) => Self::Int(i64::from(*a)).py_cmp(other),
            (_, Self::Bool(b)) => self.py_cmp(&Self::Int(i64::from(*b))),
            (Self::Str(a), Self::Str(b)) => a.partial_cmp(b),
            (Self::Tuple(a), Self::Tuple(b)) => seq_cmp(a, b),
            (Self::List(a), Self::List(b)) => seq_cmp(&a.borrow(), &b.borrow()),
            (Self::Set(a), Self::Set(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                match (a.is_subset(&b), b.is_subset(&a)) {
                    (true, true) => Some(Ordering::Equal),
                    (true, false) => Some(Ordering::Less),
                    (false, true) => Some(Ordering::Greater),
                    (false, false) => None,
                }
            }
            _ => None,
        }
    }

    /// Interprets the value as an integer: ints and bools only.
    pub fn as_int(&self) -> RunResult<i64> {
        match self {
            Self::Int(i) => Ok(*i),
            Self::Bool(b) => Ok(i64::from(*b)),
            other => Err(ExcType::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                other.type_name()
            ))),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// `str(value)` for values whose string form doesn't involve user code.
    #[must_use]
    pub fn py_str(&self) -> Cow<'_, str> {
        match self {
            Self::Str(s) => Cow::Borrowed(s),
            Self::Exception(exc) => Cow::Owned(exc.message()),
            other => other.py_repr(),
        }
    }

    /// `repr(value)` for values whose repr doesn't involve user code.
    #[must_use]
    pub fn py_repr(&self) -> Cow<'static, str> {
        match self {
            Self::None => Cow::Borrowed("None"),
            Self::Ellipsis => Cow::Borrowed("Ellipsis"),
            Self::Bool(true) => Cow::Borrowed("True"),
            Self::Bool(false) => Cow::Borrowed("False"),
            other => {
                let mut s = String::new();
                // writing into a String cannot fail
                let _ = other.repr_fmt(&mut s, &mut AHashSet::new());
                Cow::Owned(s)
            }
        }
    }

    /// Writes the repr, tracking the containers being printed so self-references render as `[...]`.
    fn repr_fmt(&self, f: &mut impl Write, seen: &mut AHashSet<usize>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Ellipsis => f.write_str("Ellipsis"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&float_repr(*v)),
            Self::Str(s) => string_repr_fmt(s, f),
            Self::Tuple(items) => {
                f.write_char('(')?;
                write_items(f, items, seen)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Self::List(items) => {
                if !seen.insert(self.id()) {
                    return f.write_str("[...]");
                }
                f.write_char('[')?;
                write_items(f, &items.borrow(), seen)?;
                seen.remove(&self.id());
                f.write_char(']')
            }
            Self::Dict(dict) => {
                if !seen.insert(self.id()) {
                    return f.write_str("{...}");
                }
                f.write_char('{')?;
                for (i, (key, value)) in dict.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    key.repr_fmt(f, seen)?;
                    f.write_str(": ")?;
                    value.repr_fmt(f, seen)?;
                }
                seen.remove(&self.id());
                f.write_char('}')
            }
            Self::Set(set) => {
                let set = set.borrow();
                if set.is_empty() {
                    return f.write_str("set()");
                }
                f.write_char('{')?;
                let items: Vec<Value> = set.iter().cloned().collect();
                write_items(f, &items, seen)?;
                f.write_char('}')
            }
            Self::Range(range) => range.repr_fmt(f),
            Self::Slice(slice) => slice.repr_fmt(f),
            Self::Code(code) => write!(
                f,
                "<code object {} at {:#x}, file \"{}\", line {}>",
                code.name(),
                self.id(),
                code.filename(),
                code.first_line()
            ),
            Self::Cell(cell) => match cell.get() {
                Some(value) => write!(f, "<cell at {:#x}: {} object>", self.id(), value.type_name()),
                None => write!(f, "<cell at {:#x}: empty>", self.id()),
            },
            Self::Function(func) => write!(f, "<function {} at {:#x}>", func.name(), self.id()),
            Self::Method(method) => {
                let name = method.name();
                match method.receiver() {
                    Some(receiver) => {
                        write!(f, "<bound method {}.{name} of ", method.class().name())?;
                        receiver.repr_fmt(f, seen)?;
                        f.write_char('>')
                    }
                    None => write!(f, "<unbound method {}.{name}>", method.class().name()),
                }
            }
            Self::Builtin(builtin) => write!(f, "<built-in function {builtin}>"),
            Self::BuiltinMethod(method) => write!(
                f,
                "<built-in method {} of {} object at {:#x}>",
                method.name(),
                method.receiver().type_name(),
                method.receiver().id()
            ),
            Self::Native(native) => write!(f, "<built-in function {}>", native.name()),
            Self::Type(t) => write!(f, "<class '{t}'>"),
            Self::ExcType(e) => write!(f, "<class '{e}'>"),
            Self::Class(class) => match class.module() {
                Some(module) => write!(f, "<class '{module}.{}'>", class.name()),
                None => write!(f, "<class '{}'>", class.name()),
            },
            Self::Instance(instance) => {
                let class = instance.class();
                match class.module() {
                    Some(module) => write!(f, "<{module}.{} object at {:#x}>", class.name(), self.id()),
                    None => write!(f, "<{} object at {:#x}>", class.name(), self.id()),
                }
            }
            Self::Exception(exc) => exc.repr_fmt(f),
            Self::Traceback(_) => write!(f, "<traceback object at {:#x}>", self.id()),
            Self::Iterator(iter) => write!(f, "<{} object at {:#x}>", iter.borrow().type_name(), self.id()),
            Self::Generator(generator) => match generator.try_borrow() {
                Ok(generator) => write!(f, "<generator object {} at {:#x}>", generator.name(), self.id()),
                Err(_) => write!(f, "<generator object at {:#x}>", self.id()),
            },
            Self::Module(module) => write!(f, "<module '{}'>", module.name()),
            Self::Why(why) => write!(f, "<why {why}>"),
            Self::Silenced => f.write_str("<silenced>"),
        }
    }
}

fn write_items(f: &mut impl Write, items: &[Value], seen: &mut AHashSet<usize>) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.repr_fmt(f, seen)?;
    }
    Ok(())
}

fn seq_eq(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is(y) || x.py_eq(y))
}

/// Lexicographic ordering: the first unequal pair decides, otherwise the shorter sequence is less.
fn seq_cmp(a: &[Value], b: &[Value]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b) {
        if !x.py_eq(y) {
            return x.py_cmp(y);
        }
    }
    a.len().partial_cmp(&b.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr() {
        assert_eq!(Value::tuple(vec![Value::Int(1)]).py_repr(), "(1,)");
        assert_eq!(
            Value::list(vec![Value::Str("a".into()), Value::Float(2.0), Value::None]).py_repr(),
            "['a', 2.0, None]"
        );
        assert_eq!(Value::set(Set::new()).py_repr(), "set()");
        assert_eq!(Value::Type(Type::Int).py_repr(), "<class 'int'>");
        assert_eq!(Value::ExcType(ExcType::KeyError).py_repr(), "<class 'KeyError'>");
    }

    #[test]
    fn test_self_referencing_list() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.py_repr(), "[1, [...]]");
        // break the cycle so the test doesn't leak
        if let Value::List(items) = &list {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_numeric_equality_and_order() {
        assert!(Value::Int(1).py_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).py_eq(&Value::Int(1)));
        assert_eq!(Value::Int(1).py_cmp(&Value::Float(1.5)), Some(Ordering::Less));
        assert_eq!(Value::Int(1).py_cmp(&Value::Str("a".into())), None);
        let a = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::tuple(vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(a.py_cmp(&b), Some(Ordering::Less));
    }

    #[test]
    fn test_identity() {
        let a = Value::list(vec![]);
        let b = Value::list(vec![]);
        assert!(a.py_eq(&b));
        assert!(!a.is(&b));
        assert!(a.is(&a.clone()));
        assert!(Value::None.is(&Value::None));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Str("".into()).py_bool());
        assert!(Value::list(vec![Value::None]).py_bool());
        assert!(!Value::Float(0.0).py_bool());
    }
}
