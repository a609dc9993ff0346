//! Conversions that may run user code: truthiness, `repr`/`str`, `PRINT_EXPR`, and calling
//! builtin types as constructors.

use std::rc::Rc;

use ahash::AHashSet;

use super::VM;
use crate::{
    args::ArgValues,
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    namespace::Namespace,
    types::{str::string_repr, Class, Dict, Instance, Range, Set, Type},
    value::Value,
};

impl<P: PrintWriter> VM<'_, P> {
    /// Truthiness, consulting `__bool__` and then `__len__` on instances.
    pub(crate) fn py_truthy(&mut self, value: &Value) -> RunResult<bool> {
        if !matches!(value, Value::Instance(_)) {
            return Ok(value.py_bool());
        }
        if let Some(result) = self.call_special(value, "__bool__", Vec::new())? {
            return match result {
                Value::Bool(b) => Ok(b),
                other => Err(ExcType::type_error(format!(
                    "__bool__ should return bool, returned {}",
                    other.type_name()
                ))),
            };
        }
        if let Some(len) = self.call_special(value, "__len__", Vec::new())? {
            return Ok(len.as_int()? != 0);
        }
        Ok(true)
    }

    /// `repr(value)`, calling `__repr__` on user objects, including inside containers.
    pub(crate) fn repr_value(&mut self, value: &Value) -> RunResult<String> {
        self.repr_inner(value, &mut AHashSet::new())
    }

    fn repr_inner(&mut self, value: &Value, seen: &mut AHashSet<usize>) -> RunResult<String> {
        match value {
            Value::Instance(_) | Value::Exception(_) => match self.call_special(value, "__repr__", Vec::new())? {
                Some(Value::Str(s)) => Ok(s.to_string()),
                Some(other) => Err(ExcType::type_error(format!(
                    "__repr__ returned non-string (type {})",
                    other.type_name()
                ))),
                None => Ok(value.py_repr().into_owned()),
            },
            Value::List(items) => {
                if !seen.insert(value.id()) {
                    return Ok("[...]".to_owned());
                }
                let items = items.borrow().clone();
                let inner = self.repr_items(&items, seen)?;
                seen.remove(&value.id());
                Ok(format!("[{inner}]"))
            }
            Value::Tuple(items) => {
                let inner = self.repr_items(items, seen)?;
                Ok(if items.len() == 1 { format!("({inner},)") } else { format!("({inner})") })
            }
            Value::Dict(dict) => {
                if !seen.insert(value.id()) {
                    return Ok("{...}".to_owned());
                }
                let items = dict.borrow().items();
                let mut parts = Vec::with_capacity(items.len());
                for (key, item) in &items {
                    parts.push(format!("{}: {}", self.repr_inner(key, seen)?, self.repr_inner(item, seen)?));
                }
                seen.remove(&value.id());
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            other => Ok(other.py_repr().into_owned()),
        }
    }

    fn repr_items(&mut self, items: &[Value], seen: &mut AHashSet<usize>) -> RunResult<String> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            parts.push(self.repr_inner(item, seen)?);
        }
        Ok(parts.join(", "))
    }

    /// `str(value)`, calling `__str__` (or `__repr__`) on user objects.
    pub(crate) fn str_value(&mut self, value: &Value) -> RunResult<String> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            Value::Instance(_) | Value::Exception(_) => match self.call_special(value, "__str__", Vec::new())? {
                Some(Value::Str(s)) => Ok(s.to_string()),
                Some(other) => Err(ExcType::type_error(format!(
                    "__str__ returned non-string (type {})",
                    other.type_name()
                ))),
                None if matches!(value, Value::Exception(_)) => Ok(value.py_str().into_owned()),
                None => self.repr_value(value),
            },
            Value::List(_) | Value::Tuple(_) | Value::Dict(_) => self.repr_value(value),
            other => Ok(other.py_str().into_owned()),
        }
    }

    /// `PRINT_EXPR`: interactive echo of an expression statement's value.
    pub(super) fn print_expr(&mut self, value: &Value) -> RunResult<()> {
        if matches!(value, Value::None) {
            return Ok(());
        }
        let text = self.repr_value(value)?;
        self.print_writer.stdout_write(text.into());
        self.print_writer.stdout_push('\n');
        Ok(())
    }

    /// Calls a builtin type: `int("3")`, `list(range(3))`, `type(x)` and so on.
    pub(crate) fn construct(&mut self, t: Type, mut args: ArgValues) -> RunResult<Value> {
        let name: &'static str = t.into();
        match t {
            Type::Bool => match args.get_zero_one_arg(name)? {
                Some(value) => Ok(Value::Bool(self.py_truthy(&value)?)),
                None => Ok(Value::Bool(false)),
            },
            Type::Int => {
                args.check_no_kwargs(name)?;
                match args.args.as_slice() {
                    [] => Ok(Value::Int(0)),
                    [value] => self.to_int(value),
                    [Value::Str(s), base] => parse_int(s, base.as_int()?).map(Value::Int),
                    [_, _] => Err(ExcType::type_error("int() can't convert non-string with explicit base")),
                    _ => Err(ExcType::type_error_at_most(name, 2, args.count())),
                }
            }
            Type::Float => match args.get_zero_one_arg(name)? {
                None => Ok(Value::Float(0.0)),
                Some(Value::Float(f)) => Ok(Value::Float(f)),
                Some(Value::Int(i)) => Ok(Value::Float(i as f64)),
                Some(Value::Bool(b)) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
                Some(Value::Str(s)) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    ExcType::value_error(format!("could not convert string to float: {}", string_repr(&s)))
                }),
                Some(other) => Err(ExcType::type_error(format!(
                    "float() argument must be a string or a number, not '{}'",
                    other.type_name()
                ))),
            },
            Type::Str => match args.get_zero_one_arg(name)? {
                None => Ok(Value::Str("".into())),
                Some(value) => Ok(Value::Str(self.str_value(&value)?.into())),
            },
            Type::Tuple => match args.get_zero_one_arg(name)? {
                None => Ok(Value::tuple(Vec::new())),
                Some(value @ Value::Tuple(_)) => Ok(value),
                Some(iterable) => Ok(Value::tuple(self.collect_iter(iterable)?)),
            },
            Type::List => match args.get_zero_one_arg(name)? {
                None => Ok(Value::list(Vec::new())),
                Some(iterable) => Ok(Value::list(self.collect_iter(iterable)?)),
            },
            Type::Set => match args.get_zero_one_arg(name)? {
                None => Ok(Value::set(Set::new())),
                Some(iterable) => {
                    let items = self.collect_iter(iterable)?;
                    Ok(Value::set(Set::from_values(items)?))
                }
            },
            Type::Dict => {
                let kwargs = std::mem::take(&mut args.kwargs);
                let mut dict = match args.get_zero_one_arg(name)? {
                    None => Dict::new(),
                    Some(source) => self.dict_from(source)?,
                };
                for (key, value) in kwargs {
                    dict.set_str(&key, value);
                }
                Ok(Value::dict(dict))
            }
            Type::Range => {
                args.check_no_kwargs(name)?;
                match args.count() {
                    1..=3 => Ok(Value::Range(Range::from_args(&args.args)?)),
                    0 => Err(ExcType::type_error_at_least(name, 1, 0)),
                    n => Err(ExcType::type_error_at_most(name, 3, n)),
                }
            }
            Type::Object => {
                args.check_zero_args(name)?;
                let class = Rc::new(Class::new("object".into(), Vec::new(), Namespace::new()));
                Ok(Value::Instance(Rc::new(Instance::new(class))))
            }
            Type::Type => {
                args.check_no_kwargs(name)?;
                let count = args.count();
                match <[Value; 3]>::try_from(args.args) {
                    Ok([Value::Str(class_name), Value::Tuple(bases), Value::Dict(attrs)]) => {
                        let attrs = Namespace::from_dict(&attrs.borrow());
                        Ok(Value::Class(Rc::new(Class::new(class_name, bases.as_ref().clone(), attrs))))
                    }
                    Ok(_) => Err(ExcType::type_error("type() argument 1 must be str, 2 tuple, 3 dict")),
                    Err(args) => match <[Value; 1]>::try_from(args) {
                        Ok([value]) => Ok(value.type_value()),
                        Err(_) => Err(ExcType::type_error(format!(
                            "type() takes 1 or 3 arguments, got {count}"
                        ))),
                    },
                }
            }
            other => Err(ExcType::type_error(format!("cannot create '{other}' instances"))),
        }
    }

    fn to_int(&mut self, value: &Value) -> RunResult<Value> {
        match value {
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            Value::Float(f) => {
                if f.is_nan() {
                    Err(ExcType::value_error("cannot convert float NaN to integer"))
                } else if f.is_infinite() {
                    Err(ExcType::overflow("cannot convert float infinity to integer"))
                } else if f.trunc() < i64::MIN as f64 || f.trunc() >= i64::MAX as f64 {
                    Err(ExcType::overflow("int too large to convert"))
                } else {
                    Ok(Value::Int(f.trunc() as i64))
                }
            }
            Value::Str(s) => parse_int(s, 10).map(Value::Int),
            Value::Instance(_) => match self.call_special(value, "__int__", Vec::new())? {
                Some(result @ Value::Int(_)) => Ok(result),
                Some(other) => Err(ExcType::type_error(format!(
                    "__int__ returned non-int (type {})",
                    other.type_name()
                ))),
                None => Err(int_arg_error(value)),
            },
            other => Err(int_arg_error(other)),
        }
    }

    /// `dict(source)`: copies a dict, or collects an iterable of key/value pairs.
    pub(super) fn dict_from(&mut self, source: Value) -> RunResult<Dict> {
        if let Value::Dict(dict) = &source {
            return Ok(dict.borrow().clone());
        }
        let mut dict = Dict::new();
        for (i, pair) in self.collect_iter(source)?.into_iter().enumerate() {
            let items = self.collect_iter(pair)?;
            let Ok([key, value]) = <[Value; 2]>::try_from(items.clone()) else {
                return Err(ExcType::value_error(format!(
                    "dictionary update sequence element #{i} has length {}; 2 is required",
                    items.len()
                )));
            };
            dict.set(key, value)?;
        }
        Ok(dict)
    }
}

fn int_arg_error(value: &Value) -> crate::exception_private::RunError {
    ExcType::type_error(format!(
        "int() argument must be a string or a number, not '{}'",
        value.type_name()
    ))
}

/// Parses an int literal the way `int(s, base)` does: surrounding whitespace and
/// underscores between digits are allowed, and base 16, 8 or 2 accept their prefix.
fn parse_int(s: &str, base: i64) -> RunResult<i64> {
    let invalid = || {
        ExcType::value_error(format!(
            "invalid literal for int() with base {base}: {}",
            string_repr(s)
        ))
    };
    let radix = u32::try_from(base)
        .ok()
        .filter(|b| (2..=36).contains(b))
        .ok_or_else(|| ExcType::value_error("int() base must be >= 2 and <= 36"))?;
    let trimmed = s.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let prefix = match radix {
        16 => Some(["0x", "0X"]),
        8 => Some(["0o", "0O"]),
        2 => Some(["0b", "0B"]),
        _ => None,
    };
    let digits = prefix
        .and_then(|[lower, upper]| digits.strip_prefix(lower).or_else(|| digits.strip_prefix(upper)))
        .unwrap_or(digits);
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(invalid());
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = i64::from_str_radix(&cleaned, radix).map_err(|_| invalid())?;
    Ok(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CollectStringPrint;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(" 42 ", 10).unwrap(), 42);
        assert_eq!(parse_int("-1_000", 10).unwrap(), -1000);
        assert_eq!(parse_int("0xff", 16).unwrap(), 255);
        assert_eq!(parse_int("101", 2).unwrap(), 5);
        assert!(parse_int("1__0", 10).is_err());
        assert!(parse_int("", 10).is_err());
        assert!(parse_int("12", 1).is_err());
    }

    #[test]
    fn test_constructors() {
        let mut writer = CollectStringPrint::new();
        let mut vm = VM::new(&mut writer);
        let int = vm.construct(Type::Int, ArgValues::positional(vec![Value::Float(-2.7)])).unwrap();
        assert_eq!(int.py_repr(), "-2");
        let list = vm
            .construct(Type::List, ArgValues::positional(vec![Value::Str("ab".into())]))
            .unwrap();
        assert_eq!(list.py_repr(), "['a', 'b']");
        let pairs = Value::list(vec![Value::tuple(vec![Value::Str("k".into()), Value::Int(1)])]);
        let dict = vm
            .construct(
                Type::Dict,
                ArgValues::new(vec![pairs], vec![("z".into(), Value::None)]),
            )
            .unwrap();
        assert_eq!(dict.py_repr(), "{'k': 1, 'z': None}");
        let t = vm.construct(Type::Type, ArgValues::positional(vec![Value::Int(1)])).unwrap();
        assert_eq!(t.py_repr(), "<class 'int'>");
        assert!(vm.construct(Type::Function, ArgValues::default()).is_err());
    }

    #[test]
    fn test_print_expr_skips_none() {
        let mut writer = CollectStringPrint::new();
        {
            let mut vm = VM::new(&mut writer);
            vm.print_expr(&Value::None).unwrap();
            vm.print_expr(&Value::tuple(vec![Value::Int(1)])).unwrap();
        }
        assert_eq!(writer.output(), "(1,)\n");
    }
}
