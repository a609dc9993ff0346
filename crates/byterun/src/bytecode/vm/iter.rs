//! The iteration protocol: `GET_ITER`, `FOR_ITER`, `YIELD_FROM` and the helpers builtins
//! use to consume iterables.

use std::{cell::RefCell, rc::Rc};

use super::{GeneratorState, VM};
use crate::{
    exception_private::{ExcType, RunError, RunResult},
    for_iterator::ForIterator,
    frame::Why,
    io::PrintWriter,
    value::Value,
};

impl<P: PrintWriter> VM<'_, P> {
    /// `iter(value)`: iterators and generators are their own iterators.
    pub(crate) fn get_iter(&mut self, value: Value) -> RunResult<Value> {
        match value {
            Value::Iterator(_) | Value::Generator(_) => Ok(value),
            Value::Instance(_) => match self.call_special(&value, "__iter__", Vec::new())? {
                Some(iterator) => Ok(iterator),
                None => Err(ExcType::type_error_not_iterable(&value.type_name())),
            },
            other => match ForIterator::new(&other) {
                Some(iterator) => Ok(Value::Iterator(Rc::new(RefCell::new(iterator)))),
                None => Err(ExcType::type_error_not_iterable(&other.type_name())),
            },
        }
    }

    /// Advances an iterator, returning `None` once it is exhausted.
    ///
    /// User iterators signal exhaustion by raising `StopIteration` from `__next__`.
    pub(crate) fn iter_next(&mut self, iterator: &Value) -> RunResult<Option<Value>> {
        match iterator {
            Value::Iterator(state) => {
                let state = state.clone();
                // re-entered from the code it is advancing, e.g. a generator calling next() on
                // the enumerate wrapping it
                let Ok(mut iterator) = state.try_borrow_mut() else {
                    return Err(ExcType::generator_already_executing());
                };
                let mut advance = |inner: &Value| self.iter_next(inner);
                iterator.for_next(&mut advance)
            }
            Value::Generator(generator) => match self.resume(generator, Value::None)? {
                GeneratorState::Yielded(value) => Ok(Some(value)),
                GeneratorState::Complete(_) => Ok(None),
            },
            Value::Instance(_) => match self.call_special(iterator, "__next__", Vec::new()) {
                Ok(Some(value)) => Ok(Some(value)),
                Ok(None) => Err(ExcType::type_error_not_iterator(&iterator.type_name())),
                Err(RunError::Exc(raise)) if is_stop_iteration(&raise.value) => Ok(None),
                Err(err) => Err(err),
            },
            other => Err(ExcType::type_error_not_iterator(&other.type_name())),
        }
    }

    /// Drains any iterable into a vector.
    pub(crate) fn collect_iter(&mut self, iterable: Value) -> RunResult<Vec<Value>> {
        match &iterable {
            Value::Tuple(items) => return Ok(items.as_ref().clone()),
            Value::List(items) => return Ok(items.borrow().clone()),
            _ => {}
        }
        let iterator = self.get_iter(iterable)?;
        let mut items = Vec::new();
        while let Some(item) = self.iter_next(&iterator)? {
            items.push(item);
        }
        Ok(items)
    }

    /// `FOR_ITER`: pushes the next item, or pops the exhausted iterator and jumps to `target`.
    pub(super) fn for_iter(&mut self, target: usize) -> RunResult<()> {
        let iterator = self.top()?;
        match self.iter_next(&iterator)? {
            Some(item) => self.push(item),
            None => {
                self.pop()?;
                self.jump(target)
            }
        }
    }

    /// `YIELD_FROM`: stack `..., receiver, value`.
    ///
    /// Sends `value` into the receiver (or advances it, for plain iterators). Anything it
    /// produces is yielded from this frame with the instruction pointer rewound, so the next
    /// resumption executes `YIELD_FROM` again with the sent value on top. Once the receiver
    /// is exhausted its return value replaces it on the stack.
    pub(super) fn yield_from(&mut self) -> RunResult<Why> {
        let value = self.pop()?;
        let receiver = self.top()?;
        let produced = match &receiver {
            Value::Generator(generator) => match self.resume(generator, value)? {
                GeneratorState::Yielded(item) => Some(item),
                GeneratorState::Complete(result) => {
                    self.pop()?;
                    self.push(result)?;
                    None
                }
            },
            _ => {
                if !matches!(value, Value::None) {
                    return Err(ExcType::attribute_error(&receiver.type_name(), "send"));
                }
                match self.iter_next(&receiver)? {
                    Some(item) => Some(item),
                    None => {
                        self.pop()?;
                        self.push(Value::None)?;
                        None
                    }
                }
            }
        };
        match produced {
            Some(item) => {
                let frame = self.frame_mut()?;
                frame.return_value = item;
                frame.ip = frame.instr_start;
                Ok(Why::Yield)
            }
            None => Ok(Why::None),
        }
    }
}

fn is_stop_iteration(value: &Value) -> bool {
    match value {
        Value::Exception(exc) => exc.builtin_kind().is_subclass_of(ExcType::StopIteration),
        _ => false,
    }
}
