//! Implementation of the print() builtin function.

use crate::{
    args::ArgValues,
    bytecode::VM,
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    value::Value,
};

/// Writes the `str()` of each argument to stdout.
///
/// Supports the following keyword arguments:
/// - `sep`: separator between values (default: " ")
/// - `end`: string appended after the last value (default: "\n")
/// - `flush`: accepted but ignored, output is not buffered
pub(super) fn builtin_print<P: PrintWriter>(vm: &mut VM<'_, P>, mut args: ArgValues) -> RunResult<Value> {
    let sep = string_kwarg(args.take_kwarg("sep"), "sep")?;
    let end = string_kwarg(args.take_kwarg("end"), "end")?;
    args.take_kwarg("flush");
    if let Some((key, _)) = args.kwargs.first() {
        return Err(ExcType::type_error(format!(
            "'{key}' is an invalid keyword argument for print()"
        )));
    }

    let mut rendered = Vec::with_capacity(args.count());
    for value in &args.args {
        rendered.push(vm.str_value(value)?);
    }
    let output = rendered.join(sep.as_deref().unwrap_or(" "));
    let writer = vm.print_writer();
    writer.stdout_write(output.into());
    match end {
        Some(end) => writer.stdout_write(end.into()),
        None => writer.stdout_push('\n'),
    }
    Ok(Value::None)
}

/// `sep` and `end` may be None (the default) or a string.
fn string_kwarg(value: Option<Value>, name: &str) -> RunResult<Option<String>> {
    match value {
        None | Some(Value::None) => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s.to_string())),
        Some(other) => Err(ExcType::type_error(format!(
            "{name} must be None or a string, not {}",
            other.type_name()
        ))),
    }
}
