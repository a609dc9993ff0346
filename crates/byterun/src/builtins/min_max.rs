//! Implementation of the min() and max() builtin functions.

use crate::{
    args::ArgValues,
    bytecode::{CompareOp, VM},
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    value::Value,
};

/// Returns the smallest item of an iterable, or the smallest of two or more arguments.
pub(super) fn builtin_min<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    builtin_min_max(vm, args, true)
}

/// Returns the largest item of an iterable, or the largest of two or more arguments.
pub(super) fn builtin_max<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    builtin_min_max(vm, args, false)
}

/// Shared implementation for min() and max(), with the `key` and `default` keywords.
///
/// Items are ordered with `<`, so instances defining `__lt__` take part. The first of
/// several equal extremes wins.
fn builtin_min_max<P: PrintWriter>(vm: &mut VM<'_, P>, mut args: ArgValues, is_min: bool) -> RunResult<Value> {
    let name = if is_min { "min" } else { "max" };
    let key = args.take_kwarg("key").filter(|key| !matches!(key, Value::None));
    let default = args.take_kwarg("default");
    args.check_no_kwargs(name)?;

    let mut positional = args.args;
    let items = match positional.len() {
        0 => return Err(ExcType::type_error_at_least(name, 1, 0)),
        1 => vm.collect_iter(positional.remove(0))?,
        _ if default.is_some() => {
            return Err(ExcType::type_error(format!(
                "Cannot specify a default for {name}() with multiple positional arguments"
            )))
        }
        _ => positional,
    };

    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let item_key = match &key {
            Some(key) => vm.call_value(key.clone(), ArgValues::positional(vec![item.clone()]))?,
            None => item.clone(),
        };
        let replace = match &best {
            None => true,
            Some((best_key, _)) => {
                let (lhs, rhs) = if is_min { (&item_key, best_key) } else { (best_key, &item_key) };
                let less = vm.compare(CompareOp::Lt, lhs, rhs)?;
                vm.py_truthy(&less)?
            }
        };
        if replace {
            best = Some((item_key, item));
        }
    }
    match best {
        Some((_, item)) => Ok(item),
        None => default.ok_or_else(|| ExcType::value_error(format!("{name}() arg is an empty sequence"))),
    }
}
