//! Implementation of the sum() builtin function.

use crate::{
    args::ArgValues,
    bytecode::{BinaryOp, VM},
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    value::Value,
};

/// Adds the items of an iterable to `start` (default 0) from left to right.
pub(super) fn builtin_sum<P: PrintWriter>(vm: &mut VM<'_, P>, mut args: ArgValues) -> RunResult<Value> {
    let start_kwarg = args.take_kwarg("start");
    let (iterable, start) = args.get_one_two_args("sum")?;
    let mut total = start.or(start_kwarg).unwrap_or(Value::Int(0));
    if matches!(total, Value::Str(_)) {
        return Err(ExcType::type_error("sum() can't sum strings [use ''.join(seq) instead]"));
    }
    for item in vm.collect_iter(iterable)? {
        total = vm.binary_value(BinaryOp::Add, &total, &item, false)?;
    }
    Ok(total)
}
