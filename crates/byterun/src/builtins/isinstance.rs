//! Implementation of the isinstance(), issubclass() and callable() builtin functions.

use crate::{
    args::ArgValues,
    bytecode::{
        vm::{is_instance, is_subclass},
        VM,
    },
    exception_private::RunResult,
    io::PrintWriter,
    value::Value,
};

pub(super) fn builtin_isinstance(args: ArgValues) -> RunResult<Value> {
    let (value, classinfo) = args.get_two_args("isinstance")?;
    is_instance(&value, &classinfo).map(Value::Bool)
}

pub(super) fn builtin_issubclass(args: ArgValues) -> RunResult<Value> {
    let (cls, classinfo) = args.get_two_args("issubclass")?;
    is_subclass(&cls, &classinfo).map(Value::Bool)
}

/// Instances are callable when their class defines `__call__`.
pub(super) fn builtin_callable<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    let value = args.get_one_arg("callable")?;
    let callable = match &value {
        Value::Function(_)
        | Value::Method(_)
        | Value::Builtin(_)
        | Value::BuiltinMethod(_)
        | Value::Native(_)
        | Value::Type(_)
        | Value::ExcType(_)
        | Value::Class(_) => true,
        Value::Instance(_) => vm.user_method(&value, "__call__").is_some(),
        _ => false,
    };
    Ok(Value::Bool(callable))
}
