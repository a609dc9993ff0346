//! `LOAD_ATTR`, `STORE_ATTR` and `DELETE_ATTR`.
//!
//! Functions found on a class become methods: bound when looked up through an instance,
//! unbound when looked up through the class itself. Builtin containers and strings expose
//! their methods as [`BuiltinMethod`] values bound to the receiver.

use std::rc::Rc;

use super::{methods::MethodName, VM};
use crate::{
    args::ArgValues,
    exception_private::{ExcType, RunResult},
    function::{BuiltinMethod, Method},
    io::PrintWriter,
    types::{Class, ExcClass},
    value::Value,
};

impl<P: PrintWriter> VM<'_, P> {
    pub(crate) fn load_attr(&mut self, obj: &Value, name: &str) -> RunResult<Value> {
        match obj {
            Value::Instance(instance) => {
                if let Some(value) = instance.attrs().get(name) {
                    return Ok(value);
                }
                let class = instance.class();
                if let Some(value) = class.lookup(name) {
                    return Ok(bind(value, obj, class));
                }
                match name {
                    "__class__" => Ok(Value::Class(class.clone())),
                    "__dict__" => Ok(Value::dict(instance.attrs().to_dict())),
                    _ => match class.lookup("__getattr__") {
                        Some(getattr) => {
                            let args = ArgValues::positional(vec![obj.clone(), Value::Str(name.into())]);
                            self.call_value(getattr, args)
                        }
                        None => Err(ExcType::attribute_error(class.name(), name)),
                    },
                }
            }
            Value::Class(class) => {
                if let Some(value) = class.lookup(name) {
                    return Ok(match value {
                        func @ Value::Function(_) => Value::Method(Rc::new(Method::new(func, None, class.clone()))),
                        other => other,
                    });
                }
                match name {
                    "__name__" | "__qualname__" => Ok(Value::Str(class.name().into())),
                    "__bases__" => Ok(Value::tuple(class.bases().to_vec())),
                    "__dict__" => Ok(Value::dict(class.attrs().to_dict())),
                    _ => Err(ExcType::attribute_error_class(class.name(), name)),
                }
            }
            Value::Module(module) => match (module.namespace().get(name), name) {
                (Some(value), _) => Ok(value),
                (None, "__name__") => Ok(Value::Str(module.name().into())),
                (None, "__dict__") => Ok(Value::dict(module.namespace().to_dict())),
                (None, _) => Err(ExcType::attribute_error_module(module.name(), name)),
            },
            Value::Function(func) => func
                .attr(name)
                .ok_or_else(|| ExcType::attribute_error("function", name)),
            Value::Method(method) => match name {
                "__func__" => Ok(method.func().clone()),
                "__self__" => Ok(method.receiver().cloned().unwrap_or(Value::None)),
                "__name__" => Ok(Value::Str(method.name().into())),
                _ => match method.func() {
                    Value::Function(func) => func.attr(name).ok_or_else(|| ExcType::attribute_error("method", name)),
                    _ => Err(ExcType::attribute_error("method", name)),
                },
            },
            Value::Exception(exc) => {
                match name {
                    "args" => return Ok(Value::tuple(exc.args().to_vec())),
                    "__cause__" => return Ok(exc.cause().unwrap_or(Value::None)),
                    "__class__" => return Ok(exc.class_value()),
                    _ => {}
                }
                if let Some(value) = exc.attrs().get(name) {
                    return Ok(value);
                }
                if let ExcClass::User(class) = exc.class() {
                    if let Some(value) = class.lookup(name) {
                        return Ok(bind(value, obj, class));
                    }
                }
                Err(ExcType::attribute_error(&exc.type_name(), name))
            }
            Value::Type(t) if name == "__name__" => Ok(Value::Str(Into::<&'static str>::into(*t).into())),
            Value::ExcType(e) if name == "__name__" => Ok(Value::Str(Into::<&'static str>::into(*e).into())),
            Value::Builtin(b) if name == "__name__" => Ok(Value::Str(b.to_string().into())),
            Value::Code(code) => {
                let names = |names: &[Rc<str>]| Value::tuple(names.iter().map(|n| Value::Str(n.clone())).collect());
                match name {
                    "co_name" => Ok(Value::Str(code.name().into())),
                    "co_filename" => Ok(Value::Str(code.filename().into())),
                    "co_firstlineno" => Ok(Value::Int(i64::from(code.first_line()))),
                    "co_argcount" => Ok(Value::Int(i64::from(code.arg_count()))),
                    "co_kwonlyargcount" => Ok(Value::Int(i64::from(code.kwonly_arg_count()))),
                    "co_flags" => Ok(Value::Int(i64::from(code.flags().bits()))),
                    "co_names" => Ok(names(code.names())),
                    "co_varnames" => Ok(names(code.varnames())),
                    "co_cellvars" => Ok(names(code.cellvars())),
                    "co_freevars" => Ok(names(code.freevars())),
                    "co_consts" => Ok(Value::tuple(code.constants().iter().map(|c| c.to_value()).collect())),
                    _ => Err(ExcType::attribute_error("code", name)),
                }
            }
            Value::Cell(cell) if name == "cell_contents" => cell
                .get()
                .ok_or_else(|| ExcType::value_error("Cell is empty")),
            Value::Slice(slice) => {
                let part = match name {
                    "start" => slice.start,
                    "stop" => slice.stop,
                    "step" => slice.step,
                    _ => return Err(ExcType::attribute_error("slice", name)),
                };
                Ok(part.map_or(Value::None, Value::Int))
            }
            Value::Range(range) => match name {
                "start" => Ok(Value::Int(range.start)),
                "stop" => Ok(Value::Int(range.stop)),
                "step" => Ok(Value::Int(range.step)),
                _ => Err(ExcType::attribute_error("range", name)),
            },
            other => match MethodName::lookup(other, name) {
                Some(method) => Ok(Value::BuiltinMethod(Rc::new(BuiltinMethod::new(other.clone(), method)))),
                None => Err(ExcType::attribute_error(&other.type_name(), name)),
            },
        }
    }

    pub(crate) fn store_attr(&mut self, obj: &Value, name: &str, value: Value) -> RunResult<()> {
        match obj {
            Value::Instance(instance) => instance.attrs().set(name, value),
            Value::Class(class) => class.attrs().set(name, value),
            Value::Module(module) => module.namespace().set(name, value),
            Value::Exception(exc) => match name {
                "__cause__" => exc.set_cause(match value {
                    Value::None => None,
                    cause => Some(cause),
                }),
                "args" => return Err(ExcType::type_error("exception args cannot be reassigned")),
                _ => exc.attrs().set(name, value),
            },
            other => return Err(ExcType::attribute_error_no_setattr(&other.type_name(), name)),
        }
        Ok(())
    }

    pub(super) fn delete_attr(&mut self, obj: &Value, name: &str) -> RunResult<()> {
        let removed = match obj {
            Value::Instance(instance) => instance.attrs().remove(name),
            Value::Class(class) => class.attrs().remove(name),
            Value::Module(module) => module.namespace().remove(name),
            Value::Exception(exc) => exc.attrs().remove(name),
            other => return Err(ExcType::attribute_error_no_setattr(&other.type_name(), name)),
        };
        match removed {
            Some(_) => Ok(()),
            None => Err(match obj {
                Value::Class(class) => ExcType::attribute_error_class(class.name(), name),
                Value::Module(module) => ExcType::attribute_error_module(module.name(), name),
                other => ExcType::attribute_error(&other.type_name(), name),
            }),
        }
    }
}

/// A function found on the class of `receiver` becomes a method bound to it.
fn bind(value: Value, receiver: &Value, class: &Rc<Class>) -> Value {
    match value {
        func @ Value::Function(_) => Value::Method(Rc::new(Method::new(func, Some(receiver.clone()), class.clone()))),
        other => other,
    }
}
