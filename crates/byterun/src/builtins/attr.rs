//! Implementation of the getattr(), setattr() and hasattr() builtin functions.

use crate::{
    args::ArgValues,
    bytecode::VM,
    exception_private::{ExcType, RunError, RunResult},
    io::PrintWriter,
    value::Value,
};

/// `getattr(obj, name[, default])`: the default replaces an `AttributeError` only.
pub(super) fn builtin_getattr<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    args.check_no_kwargs("getattr")?;
    let count = args.count();
    let mut positional = args.args.into_iter();
    let (Some(obj), Some(name)) = (positional.next(), positional.next()) else {
        return Err(ExcType::type_error_at_least("getattr", 2, count));
    };
    let default = positional.next();
    if positional.next().is_some() {
        return Err(ExcType::type_error_at_most("getattr", 3, count));
    }
    let name = attr_name(&name, "getattr")?;
    match (vm.load_attr(&obj, name), default) {
        (Err(RunError::Exc(raise)), Some(default)) if is_attribute_error(&raise.value) => Ok(default),
        (result, _) => result,
    }
}

pub(super) fn builtin_setattr<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    args.check_no_kwargs("setattr")?;
    let count = args.count();
    let Ok([obj, name, value]) = <[Value; 3]>::try_from(args.args) else {
        return Err(ExcType::type_error_arg_count("setattr", 3, count));
    };
    vm.store_attr(&obj, attr_name(&name, "setattr")?, value)?;
    Ok(Value::None)
}

pub(super) fn builtin_hasattr<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    let (obj, name) = args.get_two_args("hasattr")?;
    match vm.load_attr(&obj, attr_name(&name, "hasattr")?) {
        Ok(_) => Ok(Value::Bool(true)),
        Err(RunError::Exc(raise)) if is_attribute_error(&raise.value) => Ok(Value::Bool(false)),
        Err(err) => Err(err),
    }
}

fn attr_name<'a>(name: &'a Value, function: &str) -> RunResult<&'a str> {
    name.as_str()
        .ok_or_else(|| ExcType::type_error(format!("{function}(): attribute name must be string")))
}

fn is_attribute_error(value: &Value) -> bool {
    matches!(value, Value::Exception(exc) if exc.builtin_kind().is_subclass_of(ExcType::AttributeError))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        io::NoPrint,
        namespace::Namespace,
        types::{Class, Instance},
    };

    #[test]
    fn test_attr_builtins() {
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let class = Rc::new(Class::new("Box".into(), vec![], Namespace::new()));
        let obj = Value::Instance(Rc::new(Instance::new(class)));
        let name = Value::Str("size".into());

        let missing = builtin_hasattr(&mut vm, ArgValues::positional(vec![obj.clone(), name.clone()]));
        assert!(matches!(missing, Ok(Value::Bool(false))));
        let fallback = builtin_getattr(&mut vm, ArgValues::positional(vec![obj.clone(), name.clone(), Value::Int(0)]));
        assert!(matches!(fallback, Ok(Value::Int(0))));

        builtin_setattr(&mut vm, ArgValues::positional(vec![obj.clone(), name.clone(), Value::Int(3)])).unwrap();
        let size = builtin_getattr(&mut vm, ArgValues::positional(vec![obj.clone(), name])).unwrap();
        assert!(matches!(size, Value::Int(3)));
        assert!(builtin_getattr(&mut vm, ArgValues::positional(vec![obj, Value::Int(1)])).is_err());
    }
}
