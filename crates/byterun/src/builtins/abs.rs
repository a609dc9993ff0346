//! Implementation of the abs() builtin function.

use crate::{
    args::ArgValues,
    bytecode::VM,
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    value::Value,
};

/// Returns the absolute value of a number, or the result of `__abs__` on instances.
pub(super) fn builtin_abs<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    let value = args.get_one_arg("abs")?;
    match &value {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| ExcType::overflow("integer overflow in abs()")),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        _ => match vm.call_special(&value, "__abs__", Vec::new())? {
            Some(result) => Ok(result),
            None => Err(ExcType::type_error(format!(
                "bad operand type for abs(): '{}'",
                value.type_name()
            ))),
        },
    }
}
