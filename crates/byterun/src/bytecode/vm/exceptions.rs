//! `RAISE_VARARGS` and the diagnostic report written when an exception is first caught.

use std::rc::Rc;

use super::VM;
use crate::{
    args::ArgValues,
    exception_private::{ExcType, ExceptionRaise, RunError, RunResult},
    exception_public::ByterunException,
    frame::Why,
    io::PrintWriter,
    types::ExceptionValue,
    value::Value,
};

impl<P: PrintWriter> VM<'_, P> {
    /// `RAISE_VARARGS(argc)`: 0 re-raises the exception being handled, 1 raises the popped
    /// exception, 2 raises it with the popped `__cause__`.
    pub(super) fn raise_varargs(&mut self, argc: u32) -> RunResult<Why> {
        match argc {
            0 => match &self.handled_exception {
                Some(info) => {
                    self.last_exception = Some(info.clone());
                    Ok(Why::Reraise)
                }
                None => Err(ExcType::runtime_error_no_active_exception()),
            },
            1 => {
                let exc = self.pop()?;
                let exc = self.make_exception(exc)?;
                Err(RunError::Exc(ExceptionRaise::new(exc)))
            }
            2 => {
                let cause = self.pop()?;
                let exc = self.pop()?;
                let exc = self.make_exception(exc)?;
                let cause = match cause {
                    Value::None => None,
                    cause => match self.make_exception(cause) {
                        Ok(cause) => Some(cause),
                        Err(_) => {
                            return Err(ExcType::type_error("exception causes must derive from BaseException"));
                        }
                    },
                };
                if let Value::Exception(value) = &exc {
                    value.set_cause(cause);
                }
                Err(RunError::Exc(ExceptionRaise::new(exc)))
            }
            other => Err(RunError::internal(format!("bad RAISE_VARARGS oparg {other}"))),
        }
    }

    /// Turns the operand of `raise` into an exception object: classes are instantiated
    /// with no arguments, instances are raised as they are.
    fn make_exception(&mut self, value: Value) -> RunResult<Value> {
        match value {
            exc @ Value::Exception(_) => Ok(exc),
            Value::ExcType(exc_type) => Ok(Value::Exception(Rc::new(ExceptionValue::new(exc_type, Vec::new())))),
            Value::Class(class) if class.exc_base().is_some() => self.instantiate(&class, ArgValues::default()),
            _ => Err(ExcType::type_error_not_exception()),
        }
    }

    /// Writes a traceback-style report of an exception at the point it was raised.
    ///
    /// Reporting is a side effect only; whether a handler catches the exception is decided
    /// afterwards by unwinding.
    pub(super) fn report_exception(&mut self, raise: &ExceptionRaise) {
        let report = ByterunException::from_raise(raise.clone());
        self.print_writer.stderr_write(format!("{report}\n").into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytecode::{CodeBuilder, Const, Opcode},
        io::CollectStringPrint,
        namespace::Namespace,
    };

    #[test]
    fn test_raise_is_reported_once() {
        let mut b = CodeBuilder::new("<module>");
        b.set_filename("demo.py")
            .set_line(3)
            .emit_name(Opcode::LoadName, "KeyError")
            .load_const(Const::Str("k".into()))
            .call_function(1, 0)
            .emit_arg(Opcode::RaiseVarargs, 1);
        let mut writer = CollectStringPrint::new();
        let mut vm = VM::new(&mut writer);
        let err = vm.run_code(b.build().unwrap(), Namespace::new_module("__main__")).unwrap_err();
        assert_eq!(err.exception().unwrap().summary(), "KeyError: 'k'");
        assert_eq!(
            writer.diagnostics(),
            "Traceback (most recent call last):\n  File \"demo.py\", line 3, in <module>\nKeyError: 'k'\n"
        );
    }

    #[test]
    fn test_raise_non_exception() {
        let mut b = CodeBuilder::new("<module>");
        b.load_const(Const::Int(5)).emit_arg(Opcode::RaiseVarargs, 1);
        let mut writer = CollectStringPrint::new();
        let mut vm = VM::new(&mut writer);
        let err = vm.run_code(b.build().unwrap(), Namespace::new_module("__main__")).unwrap_err();
        assert_eq!(
            err.exception().unwrap().summary(),
            "TypeError: exceptions must derive from BaseException"
        );
    }
}
