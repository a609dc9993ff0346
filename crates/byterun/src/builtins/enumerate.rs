//! Implementation of the enumerate(), zip() and reversed() builtin functions.
//!
//! All three produce lazy iterator values; `enumerate` and `zip` advance their inner
//! iterators only as they are themselves advanced.

use std::{cell::RefCell, rc::Rc};

use crate::{
    args::ArgValues,
    bytecode::VM,
    exception_private::{ExcType, RunResult},
    for_iterator::ForIterator,
    io::PrintWriter,
    value::Value,
};

pub(super) fn builtin_enumerate<P: PrintWriter>(vm: &mut VM<'_, P>, mut args: ArgValues) -> RunResult<Value> {
    let start_kwarg = args.take_kwarg("start");
    let (iterable, start) = args.get_one_two_args("enumerate")?;
    let start = match start.or(start_kwarg) {
        Some(start) => start.as_int()?,
        None => 0,
    };
    let inner = vm.get_iter(iterable)?;
    Ok(iterator(ForIterator::enumerate(inner, start)))
}

pub(super) fn builtin_zip<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    args.check_no_kwargs("zip")?;
    let mut inners = Vec::with_capacity(args.count());
    for iterable in args.args {
        inners.push(vm.get_iter(iterable)?);
    }
    Ok(iterator(ForIterator::zip(inners)))
}

/// `reversed(seq)` snapshots the sequence; instances may define `__reversed__`.
pub(super) fn builtin_reversed<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    let sequence = args.get_one_arg("reversed")?;
    match &sequence {
        Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Range(_) => {
            let items = vm.collect_iter(sequence)?;
            Ok(iterator(ForIterator::reversed(items)))
        }
        _ => match vm.call_special(&sequence, "__reversed__", Vec::new())? {
            Some(result) => Ok(result),
            None => Err(ExcType::type_error(format!(
                "'{}' object is not reversible",
                sequence.type_name()
            ))),
        },
    }
}

fn iterator(state: ForIterator) -> Value {
    Value::Iterator(Rc::new(RefCell::new(state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{io::NoPrint, types::Range};

    #[test]
    fn test_enumerate_zip_reversed() {
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let letters = Value::Str("ab".into());
        let args = ArgValues::new(vec![letters.clone()], vec![("start".into(), Value::Int(1))]);
        let pairs = builtin_enumerate(&mut vm, args).unwrap();
        assert_eq!(Value::list(vm.collect_iter(pairs).unwrap()).py_repr(), "[(1, 'a'), (2, 'b')]");

        let range = Value::Range(Range::from_args(&[Value::Int(3)]).unwrap());
        let zipped = builtin_zip(&mut vm, ArgValues::positional(vec![range.clone(), letters])).unwrap();
        assert_eq!(Value::list(vm.collect_iter(zipped).unwrap()).py_repr(), "[(0, 'a'), (1, 'b')]");

        let backwards = builtin_reversed(&mut vm, ArgValues::positional(vec![range])).unwrap();
        assert_eq!(Value::list(vm.collect_iter(backwards).unwrap()).py_repr(), "[2, 1, 0]");
        assert!(builtin_reversed(&mut vm, ArgValues::positional(vec![Value::Int(1)])).is_err());
    }
}
