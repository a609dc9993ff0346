//! `COMPARE_OP` predicates, membership, and the class checks shared with `isinstance`.

use std::cmp::Ordering;

use super::{blocks::is_exception_class, VM};
use crate::{
    bytecode::CompareOp,
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    types::{ExcClass, Type},
    value::Value,
};

impl<P: PrintWriter> VM<'_, P> {
    pub(crate) fn compare(&mut self, op: CompareOp, lhs: &Value, rhs: &Value) -> RunResult<Value> {
        let result = match op {
            CompareOp::Eq => self.py_equal(lhs, rhs)?,
            CompareOp::Ne => match self.call_special(lhs, "__ne__", vec![rhs.clone()])? {
                Some(result) => return Ok(result),
                None => !self.py_equal(lhs, rhs)?,
            },
            CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => return self.order(op, lhs, rhs),
            CompareOp::In => self.contains(rhs, lhs)?,
            CompareOp::NotIn => !self.contains(rhs, lhs)?,
            CompareOp::Is => lhs.is(rhs),
            CompareOp::IsNot => !lhs.is(rhs),
            CompareOp::ExceptionMatch => self.exception_match(lhs, rhs)?,
            CompareOp::NotExceptionMatch => !self.exception_match(lhs, rhs)?,
        };
        Ok(Value::Bool(result))
    }

    /// `==`, consulting `__eq__` on instances.
    pub(crate) fn py_equal(&mut self, lhs: &Value, rhs: &Value) -> RunResult<bool> {
        if let Some(result) = self.call_special(lhs, "__eq__", vec![rhs.clone()])? {
            return self.py_truthy(&result);
        }
        if let Some(result) = self.call_special(rhs, "__eq__", vec![lhs.clone()])? {
            return self.py_truthy(&result);
        }
        Ok(lhs.py_eq(rhs))
    }

    fn order(&mut self, op: CompareOp, lhs: &Value, rhs: &Value) -> RunResult<Value> {
        if let Some(ordering) = lhs.py_cmp(rhs) {
            let result = match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            return Ok(Value::Bool(result));
        }
        // NaN is unordered against every number
        if is_number(lhs) && is_number(rhs) {
            return Ok(Value::Bool(false));
        }

        let (dunder, reflected) = match op {
            CompareOp::Lt => ("__lt__", "__gt__"),
            CompareOp::Le => ("__le__", "__ge__"),
            CompareOp::Gt => ("__gt__", "__lt__"),
            _ => ("__ge__", "__le__"),
        };
        if let Some(result) = self.call_special(lhs, dunder, vec![rhs.clone()])? {
            return Ok(result);
        }
        if let Some(result) = self.call_special(rhs, reflected, vec![lhs.clone()])? {
            return Ok(result);
        }
        Err(ExcType::compare_type_error(op.symbol(), &lhs.type_name(), &rhs.type_name()))
    }

    /// `item in container`.
    pub(crate) fn contains(&mut self, container: &Value, item: &Value) -> RunResult<bool> {
        match container {
            Value::List(items) => {
                let items = items.borrow().clone();
                self.any_equal(&items, item)
            }
            Value::Tuple(items) => self.any_equal(items, item),
            Value::Str(s) => match item {
                Value::Str(needle) => Ok(s.contains(needle.as_ref())),
                other => Err(ExcType::type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    other.type_name()
                ))),
            },
            Value::Dict(dict) => dict.borrow().contains(item),
            Value::Set(set) => set.borrow().contains(item),
            Value::Range(range) => Ok(match item {
                Value::Int(_) | Value::Bool(_) => range.contains(item.as_int()?),
                _ => false,
            }),
            Value::Instance(_) => match self.call_special(container, "__contains__", vec![item.clone()])? {
                Some(result) => self.py_truthy(&result),
                None => {
                    let items = self.collect_iter(container.clone())?;
                    self.any_equal(&items, item)
                }
            },
            Value::Iterator(_) | Value::Generator(_) => {
                let items = self.collect_iter(container.clone())?;
                self.any_equal(&items, item)
            }
            other => Err(ExcType::type_error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }

    fn any_equal(&mut self, items: &[Value], item: &Value) -> RunResult<bool> {
        for candidate in items {
            if candidate.is(item) || self.py_equal(candidate, item)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `except handler:` matching against the exception class on the stack.
    ///
    /// Non-class operands fall back to an instance check.
    fn exception_match(&mut self, exc: &Value, handler: &Value) -> RunResult<bool> {
        check_handler(handler)?;
        match exc {
            Value::Exception(value) => Ok(value.matches(handler)),
            exc if is_exception_class(exc) => Ok(class_matches(exc, handler)),
            other => is_instance(other, handler),
        }
    }
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_) | Value::Bool(_))
}

fn check_handler(handler: &Value) -> RunResult<()> {
    match handler {
        Value::Tuple(handlers) => handlers.iter().try_for_each(check_handler),
        handler if is_exception_class(handler) => Ok(()),
        _ => Err(ExcType::except_invalid_type_error()),
    }
}

/// True when exception class `cls` is `handler`, a subclass of it, or matches an entry of a
/// handler tuple.
fn class_matches(cls: &Value, handler: &Value) -> bool {
    match (cls, handler) {
        (_, Value::Tuple(handlers)) => handlers.iter().any(|h| class_matches(cls, h)),
        (Value::ExcType(a), Value::ExcType(b)) => a.is_subclass_of(*b),
        (Value::Class(class), Value::ExcType(b)) => class.exc_base().is_some_and(|base| base.is_subclass_of(*b)),
        (Value::Class(class), Value::Class(other)) => class.is_subclass_of(other),
        _ => false,
    }
}

/// `isinstance(value, classinfo)`.
pub(crate) fn is_instance(value: &Value, classinfo: &Value) -> RunResult<bool> {
    match classinfo {
        Value::Tuple(options) => {
            for option in options.iter() {
                if is_instance(value, option)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Type(Type::Object) => Ok(true),
        Value::Type(t) => Ok(match value {
            Value::Instance(_) => false,
            Value::Exception(_) => *t == Type::Exception,
            other => other.py_type().is_instance_of(*t),
        }),
        Value::ExcType(exc_type) => Ok(match value {
            Value::Exception(exc) => exc.builtin_kind().is_subclass_of(*exc_type),
            _ => false,
        }),
        Value::Class(class) => Ok(match value {
            Value::Instance(instance) => instance.class().is_subclass_of(class),
            Value::Exception(exc) => match exc.class() {
                ExcClass::User(exc_class) => exc_class.is_subclass_of(class),
                ExcClass::Builtin(_) => false,
            },
            _ => false,
        }),
        _ => Err(ExcType::isinstance_arg2_error()),
    }
}

/// `issubclass(cls, classinfo)`.
pub(crate) fn is_subclass(cls: &Value, classinfo: &Value) -> RunResult<bool> {
    if let Value::Tuple(options) = classinfo {
        for option in options.iter() {
            if is_subclass(cls, option)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    if !matches!(classinfo, Value::Type(_) | Value::ExcType(_) | Value::Class(_)) {
        return Err(ExcType::type_error("issubclass() arg 2 must be a class or tuple of classes"));
    }
    Ok(match (cls, classinfo) {
        (Value::Type(_) | Value::ExcType(_) | Value::Class(_), Value::Type(Type::Object)) => true,
        (Value::Type(a), Value::Type(b)) => a.is_instance_of(*b),
        (Value::ExcType(_) | Value::Class(_), _) => class_matches(cls, classinfo),
        (Value::Type(_), _) => false,
        _ => return Err(ExcType::type_error("issubclass() arg 1 must be a class")),
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        namespace::Namespace,
        types::{Class, ExceptionValue, Instance},
    };

    #[test]
    fn test_class_matches() {
        let base = Rc::new(Class::new("AppError".into(), vec![Value::ExcType(ExcType::ValueError)], Namespace::new()));
        let derived = Value::Class(Rc::new(Class::new("Derived".into(), vec![Value::Class(base.clone())], Namespace::new())));
        assert!(class_matches(&derived, &Value::Class(base)));
        assert!(class_matches(&derived, &Value::ExcType(ExcType::Exception)));
        assert!(!class_matches(&derived, &Value::ExcType(ExcType::KeyError)));
        let handlers = Value::tuple(vec![Value::ExcType(ExcType::KeyError), Value::ExcType(ExcType::LookupError)]);
        assert!(class_matches(&Value::ExcType(ExcType::IndexError), &handlers));
    }

    #[test]
    fn test_invalid_handler() {
        assert!(check_handler(&Value::Int(1)).is_err());
        assert!(check_handler(&Value::tuple(vec![Value::ExcType(ExcType::KeyError)])).is_ok());
    }

    #[test]
    fn test_is_instance() {
        assert!(is_instance(&Value::Bool(true), &Value::Type(Type::Int)).unwrap());
        assert!(!is_instance(&Value::Int(1), &Value::Type(Type::Str)).unwrap());
        let exc = Value::Exception(Rc::new(ExceptionValue::new(ExcType::KeyError, vec![])));
        assert!(is_instance(&exc, &Value::ExcType(ExcType::LookupError)).unwrap());
        let class = Rc::new(Class::new("Point".into(), vec![], Namespace::new()));
        let point = Value::Instance(Rc::new(Instance::new(class.clone())));
        assert!(is_instance(&point, &Value::Class(class)).unwrap());
        assert!(is_instance(&point, &Value::Type(Type::Object)).unwrap());
        assert!(is_instance(&point, &Value::Int(3)).is_err());
    }

    #[test]
    fn test_is_subclass() {
        assert!(is_subclass(&Value::Type(Type::Bool), &Value::Type(Type::Int)).unwrap());
        assert!(is_subclass(&Value::ExcType(ExcType::KeyError), &Value::ExcType(ExcType::Exception)).unwrap());
        assert!(!is_subclass(&Value::Type(Type::Int), &Value::ExcType(ExcType::Exception)).unwrap());
    }
}
