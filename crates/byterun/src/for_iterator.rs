//! Iterator support for `GET_ITER`/`FOR_ITER` and the iterator builtins.
//!
//! This module provides the `ForIterator` struct which encapsulates iteration state
//! for the builtin iterable types. It stores positions rather than Rust iterators, so that
//! the container can be borrowed afresh on every step: lists may grow while being iterated,
//! and dicts or sets that change size are detected instead of iterated inconsistently.
//!
//! `enumerate` and `zip` wrap other iterators, which may be generators or user objects.
//! Advancing those needs the interpreter, so their `for_next` takes a callback that
//! advances one inner iterator.

use std::{cell::RefCell, rc::Rc};

use crate::{
    exception_private::{ExcType, RunResult},
    types::{Dict, Range, Set},
    value::Value,
};

/// Advances one wrapped iterator, returning `None` once it is exhausted.
pub(crate) type Advance<'a> = dyn FnMut(&Value) -> RunResult<Option<Value>> + 'a;

/// Iterator state for Python for loops.
///
/// Contains the current iteration index and the type-specific iteration data.
#[derive(Debug)]
pub struct ForIterator {
    /// Current iteration index, shared across all iterator types.
    index: usize,
    /// Type-specific iteration data.
    iter_value: ForIterValue,
}

/// Type-specific iteration data for the different iterable types.
#[derive(Debug)]
enum ForIterValue {
    /// Iterating over a Range, yields `Value::Int`.
    Range { start: i64, step: i64, len: usize },
    /// Yields cloned items. Checks the current list length on each step, so appending during
    /// iteration is allowed as in Python.
    List(Rc<RefCell<Vec<Value>>>),
    /// Tuples are immutable so the length is the tuple's own.
    Tuple(Rc<Vec<Value>>),
    /// Yields keys. Checks `len` against the current size to detect mutation.
    DictKeys { dict: Rc<RefCell<Dict>>, len: usize },
    /// Yields single-character strings, walking the string by byte offset.
    Str { string: Rc<str>, byte_offset: usize },
    /// Yields elements. Checks `len` against the current size to detect mutation.
    Set { set: Rc<RefCell<Set>>, len: usize },
    /// `reversed()`: a snapshot of the sequence, already in reverse order.
    Reversed(Vec<Value>),
    /// `enumerate()`: yields `(count, item)` tuples.
    Enumerate { inner: Value, count: i64 },
    /// `zip()`: stops at the shortest inner iterator.
    Zip(Vec<Value>),
}

impl ForIterator {
    /// Creates an iterator over a builtin iterable.
    ///
    /// Returns `None` if the value is not a builtin iterable.
    #[must_use]
    pub fn new(value: &Value) -> Option<Self> {
        let iter_value = match value {
            Value::Range(range) => ForIterValue::from_range(range),
            Value::List(list) => ForIterValue::List(list.clone()),
            Value::Tuple(tuple) => ForIterValue::Tuple(tuple.clone()),
            Value::Dict(dict) => ForIterValue::DictKeys {
                len: dict.borrow().len(),
                dict: dict.clone(),
            },
            Value::Set(set) => ForIterValue::Set {
                len: set.borrow().len(),
                set: set.clone(),
            },
            Value::Str(string) => ForIterValue::Str {
                string: string.clone(),
                byte_offset: 0,
            },
            _ => return None,
        };
        Some(Self { index: 0, iter_value })
    }

    pub(crate) fn reversed(mut items: Vec<Value>) -> Self {
        items.reverse();
        Self::from_value(ForIterValue::Reversed(items))
    }

    pub(crate) fn enumerate(inner: Value, start: i64) -> Self {
        Self::from_value(ForIterValue::Enumerate { inner, count: start })
    }

    pub(crate) fn zip(inners: Vec<Value>) -> Self {
        Self::from_value(ForIterValue::Zip(inners))
    }

    fn from_value(iter_value: ForIterValue) -> Self {
        Self { index: 0, iter_value }
    }

    /// Python class name of the iterator, e.g. `list_iterator`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match &self.iter_value {
            ForIterValue::Range { .. } => "range_iterator",
            ForIterValue::List(_) => "list_iterator",
            ForIterValue::Tuple(_) => "tuple_iterator",
            ForIterValue::DictKeys { .. } => "dict_keyiterator",
            ForIterValue::Str { .. } => "str_iterator",
            ForIterValue::Set { .. } => "set_iterator",
            ForIterValue::Reversed(_) => "list_reverseiterator",
            ForIterValue::Enumerate { .. } => "enumerate",
            ForIterValue::Zip(_) => "zip",
        }
    }

    /// Returns the next item from the iterator, advancing the internal index.
    ///
    /// Returns `Ok(None)` when the iterator is exhausted, and RuntimeError if a dict or set
    /// changed size since iteration started. `advance` steps wrapped iterators.
    pub(crate) fn for_next(&mut self, advance: &mut Advance<'_>) -> RunResult<Option<Value>> {
        let i = self.index;
        let item = match &mut self.iter_value {
            ForIterValue::Range { start, step, len } => {
                if i >= *len {
                    return Ok(None);
                }
                let offset = i64::try_from(i).unwrap_or(i64::MAX);
                Value::Int(*start + offset * *step)
            }
            ForIterValue::List(list) => match list.borrow().get(i) {
                Some(item) => item.clone(),
                None => return Ok(None),
            },
            ForIterValue::Tuple(tuple) => match tuple.get(i) {
                Some(item) => item.clone(),
                None => return Ok(None),
            },
            ForIterValue::DictKeys { dict, len } => {
                let dict = dict.borrow();
                if dict.len() != *len {
                    return Err(ExcType::runtime_error_dict_changed_size());
                }
                match dict.key_at(i) {
                    Some(key) => key,
                    None => return Ok(None),
                }
            }
            ForIterValue::Set { set, len } => {
                let set = set.borrow();
                if set.len() != *len {
                    return Err(ExcType::runtime_error_set_changed_size());
                }
                match set.item_at(i) {
                    Some(item) => item,
                    None => return Ok(None),
                }
            }
            ForIterValue::Str { string, byte_offset } => {
                let Some(c) = string[*byte_offset..].chars().next() else {
                    return Ok(None);
                };
                *byte_offset += c.len_utf8();
                Value::Str(c.to_string().into())
            }
            ForIterValue::Reversed(items) => match items.get(i) {
                Some(item) => item.clone(),
                None => return Ok(None),
            },
            ForIterValue::Enumerate { inner, count } => {
                let Some(item) = advance(inner)? else {
                    return Ok(None);
                };
                let pair = Value::tuple(vec![Value::Int(*count), item]);
                *count += 1;
                pair
            }
            ForIterValue::Zip(inners) => {
                if inners.is_empty() {
                    return Ok(None);
                }
                let mut items = Vec::with_capacity(inners.len());
                for inner in inners.iter() {
                    match advance(inner)? {
                        Some(item) => items.push(item),
                        None => return Ok(None),
                    }
                }
                Value::tuple(items)
            }
        };
        self.index += 1;
        Ok(Some(item))
    }

    /// Collects the remaining items of an iterator over a builtin container.
    ///
    /// Used by `list()`, `tuple()` and similar constructors when no wrapped iterator
    /// needs the interpreter.
    pub(crate) fn collect(mut self, advance: &mut Advance<'_>) -> RunResult<Vec<Value>> {
        let mut items = Vec::new();
        while let Some(item) = self.for_next(advance)? {
            items.push(item);
        }
        Ok(items)
    }
}

impl ForIterValue {
    fn from_range(range: &Range) -> Self {
        Self::Range {
            start: range.start,
            step: range.step,
            len: range.len(),
        }
    }
}
