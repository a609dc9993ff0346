//! Implementation of the iter(), next(), any() and all() builtin functions.

use crate::{
    args::ArgValues,
    bytecode::{GeneratorState, VM},
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    value::Value,
};

pub(super) fn builtin_iter<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    let iterable = args.get_one_arg("iter")?;
    vm.get_iter(iterable)
}

/// `next(iterator[, default])`: an exhausted iterator returns `default` or raises
/// `StopIteration`, carrying a generator's return value.
pub(super) fn builtin_next<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    let (iterator, default) = args.get_one_two_args("next")?;
    match &iterator {
        Value::Generator(generator) => match vm.resume(generator, Value::None)? {
            GeneratorState::Yielded(value) => Ok(value),
            GeneratorState::Complete(result) => default.ok_or_else(|| ExcType::stop_iteration(result)),
        },
        Value::Iterator(_) | Value::Instance(_) => match vm.iter_next(&iterator)? {
            Some(value) => Ok(value),
            None => default.ok_or_else(|| ExcType::stop_iteration(Value::None)),
        },
        other => Err(ExcType::type_error_not_iterator(&other.type_name())),
    }
}

pub(super) fn builtin_any<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    let iterator = vm.get_iter(args.get_one_arg("any")?)?;
    while let Some(item) = vm.iter_next(&iterator)? {
        if vm.py_truthy(&item)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

pub(super) fn builtin_all<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    let iterator = vm.get_iter(args.get_one_arg("all")?)?;
    while let Some(item) = vm.iter_next(&iterator)? {
        if !vm.py_truthy(&item)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::NoPrint;

    #[test]
    fn test_next_default_and_exhaustion() {
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let iterator = builtin_iter(&mut vm, ArgValues::positional(vec![Value::list(vec![Value::Int(5)])])).unwrap();
        let first = builtin_next(&mut vm, ArgValues::positional(vec![iterator.clone()])).unwrap();
        assert_eq!(first.py_repr(), "5");
        let fallback = builtin_next(&mut vm, ArgValues::positional(vec![iterator.clone(), Value::Int(0)])).unwrap();
        assert_eq!(fallback.py_repr(), "0");
        assert!(builtin_next(&mut vm, ArgValues::positional(vec![iterator])).is_err());
        assert!(builtin_next(&mut vm, ArgValues::positional(vec![Value::list(vec![])])).is_err());
    }

    #[test]
    fn test_any_all() {
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let mixed = Value::list(vec![Value::Int(0), Value::Str("x".into())]);
        assert!(matches!(builtin_any(&mut vm, ArgValues::positional(vec![mixed.clone()])), Ok(Value::Bool(true))));
        assert!(matches!(builtin_all(&mut vm, ArgValues::positional(vec![mixed])), Ok(Value::Bool(false))));
        assert!(matches!(builtin_all(&mut vm, ArgValues::positional(vec![Value::list(vec![])])), Ok(Value::Bool(true))));
    }
}
