use std::rc::Rc;

use crate::{
    exception_private::{ExcType, RunResult},
    value::Value,
};

/// Arguments of one call: positional values plus keyword arguments in call-site order.
///
/// This is the single calling convention shared by interpreted functions, builtins and
/// host-native functions, so any of them can appear at any call site.
#[derive(Debug, Clone, Default)]
pub struct ArgValues {
    pub args: Vec<Value>,
    pub kwargs: Vec<(Rc<str>, Value)>,
}

impl ArgValues {
    #[must_use]
    pub fn new(args: Vec<Value>, kwargs: Vec<(Rc<str>, Value)>) -> Self {
        Self { args, kwargs }
    }

    /// Positional arguments only.
    #[must_use]
    pub fn positional(args: Vec<Value>) -> Self {
        Self { args, kwargs: Vec::new() }
    }

    /// Number of positional arguments.
    #[must_use]
    pub fn count(&self) -> usize {
        self.args.len()
    }

    /// Inserts an implicit receiver as the first positional argument.
    pub(crate) fn prepend(&mut self, receiver: Value) {
        self.args.insert(0, receiver);
    }

    /// Fails when keyword arguments were passed to a callable that takes none.
    pub(crate) fn check_no_kwargs(&self, name: &str) -> RunResult<()> {
        if self.kwargs.is_empty() {
            Ok(())
        } else {
            Err(ExcType::type_error_no_kwargs(name))
        }
    }

    /// Removes a keyword argument, used by builtins with optional keywords such as `print(end=...)`.
    pub(crate) fn take_kwarg(&mut self, name: &str) -> Option<Value> {
        let index = self.kwargs.iter().position(|(key, _)| key.as_ref() == name)?;
        Some(self.kwargs.remove(index).1)
    }

    /// Checks that zero arguments were passed.
    pub(crate) fn check_zero_args(&self, name: &str) -> RunResult<()> {
        self.check_no_kwargs(name)?;
        if self.args.is_empty() {
            Ok(())
        } else {
            Err(ExcType::type_error_no_args(name, self.count()))
        }
    }

    /// Checks that exactly one argument was passed, returning it.
    pub(crate) fn get_one_arg(self, name: &str) -> RunResult<Value> {
        self.check_no_kwargs(name)?;
        let count = self.count();
        match <[Value; 1]>::try_from(self.args) {
            Ok([a]) => Ok(a),
            Err(_) => Err(ExcType::type_error_arg_count(name, 1, count)),
        }
    }

    /// Checks that exactly two arguments were passed, returning them as a tuple.
    pub(crate) fn get_two_args(self, name: &str) -> RunResult<(Value, Value)> {
        self.check_no_kwargs(name)?;
        let count = self.count();
        match <[Value; 2]>::try_from(self.args) {
            Ok([a, b]) => Ok((a, b)),
            Err(_) => Err(ExcType::type_error_arg_count(name, 2, count)),
        }
    }

    /// Checks that one or two arguments were passed, returning them as a tuple.
    pub(crate) fn get_one_two_args(self, name: &str) -> RunResult<(Value, Option<Value>)> {
        self.check_no_kwargs(name)?;
        let count = self.count();
        let mut args = self.args.into_iter();
        match (args.next(), args.next(), args.next()) {
            (Some(a), b, None) => Ok((a, b)),
            (None, _, _) => Err(ExcType::type_error_at_least(name, 1, count)),
            _ => Err(ExcType::type_error_at_most(name, 2, count)),
        }
    }

    /// Checks that zero or one arguments were passed.
    pub(crate) fn get_zero_one_arg(self, name: &str) -> RunResult<Option<Value>> {
        self.check_no_kwargs(name)?;
        let count = self.count();
        let mut args = self.args.into_iter();
        match (args.next(), args.next()) {
            (a, None) => Ok(a),
            _ => Err(ExcType::type_error_at_most(name, 1, count)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_helpers() {
        let args = ArgValues::positional(vec![Value::Int(1)]);
        assert!(matches!(args.get_one_arg("len"), Ok(Value::Int(1))));

        let args = ArgValues::positional(vec![Value::Int(1), Value::Int(2)]);
        assert!(args.get_one_arg("len").is_err());

        let args = ArgValues::positional(vec![Value::Int(1)]);
        let (a, b) = args.get_one_two_args("get").unwrap();
        assert!(matches!(a, Value::Int(1)));
        assert!(b.is_none());
    }

    #[test]
    fn test_take_kwarg() {
        let mut args = ArgValues::new(vec![], vec![("end".into(), Value::Str("".into()))]);
        assert!(args.take_kwarg("sep").is_none());
        assert!(args.take_kwarg("end").is_some());
        assert!(args.check_no_kwargs("print").is_ok());
    }
}
