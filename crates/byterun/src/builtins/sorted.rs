//! Implementation of the sorted() builtin function.

use crate::{
    args::ArgValues,
    bytecode::VM,
    exception_private::RunResult,
    io::PrintWriter,
    value::Value,
};

/// Returns a new sorted list, accepting the `key` and `reverse` keywords of `list.sort`.
pub(super) fn builtin_sorted<P: PrintWriter>(vm: &mut VM<'_, P>, mut args: ArgValues) -> RunResult<Value> {
    let key = args.take_kwarg("key").filter(|key| !matches!(key, Value::None));
    let reverse = match args.take_kwarg("reverse") {
        Some(reverse) => vm.py_truthy(&reverse)?,
        None => false,
    };
    let iterable = args.get_one_arg("sorted")?;
    let items = vm.collect_iter(iterable)?;
    Ok(Value::list(vm.sort_values(items, key, reverse)?))
}
