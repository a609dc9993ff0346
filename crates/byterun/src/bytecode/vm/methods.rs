//! Methods of the builtin containers, strings and generators.
//!
//! `LOAD_ATTR` on a builtin value resolves the name to a [`MethodName`] and binds it to the
//! receiver; calling that bound method lands in [`VM::call_method`].

use std::{cmp::Ordering, str::FromStr};

use strum::{Display, EnumString, IntoStaticStr};

use super::{GeneratorState, VM};
use crate::{
    args::ArgValues,
    exception_private::{ExcType, RunError, RunResult},
    io::PrintWriter,
    types::str::brace_format,
    value::Value,
};

/// Name of a builtin method, as written after the dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum MethodName {
    Append,
    Extend,
    Pop,
    Insert,
    Remove,
    Index,
    Count,
    Reverse,
    Sort,
    Clear,
    Copy,
    Get,
    Keys,
    Values,
    Items,
    Setdefault,
    Update,
    Add,
    Discard,
    Join,
    Split,
    Upper,
    Lower,
    Strip,
    Startswith,
    Endswith,
    Replace,
    Format,
    Send,
    Close,
}

impl MethodName {
    /// Resolves `name` for `receiver`, if the receiver's type has such a method.
    pub(crate) fn lookup(receiver: &Value, name: &str) -> Option<Self> {
        Self::from_str(name).ok().filter(|method| method.applies_to(receiver))
    }

    fn applies_to(self, receiver: &Value) -> bool {
        use MethodName::{
            Add, Append, Clear, Close, Copy, Count, Discard, Endswith, Extend, Format, Get, Index, Insert, Items, Join,
            Keys, Lower, Pop, Remove, Replace, Reverse, Send, Setdefault, Sort, Split, Startswith, Strip, Update,
            Upper, Values,
        };
        match receiver {
            Value::List(_) => matches!(
                self,
                Append | Extend | Pop | Insert | Remove | Index | Count | Reverse | Sort | Clear | Copy
            ),
            Value::Tuple(_) => matches!(self, Index | Count),
            Value::Dict(_) => matches!(
                self,
                Get | Keys | Values | Items | Pop | Setdefault | Update | Clear | Copy
            ),
            Value::Set(_) => matches!(self, Add | Remove | Discard | Pop | Clear | Copy),
            Value::Str(_) => matches!(
                self,
                Join | Split | Upper | Lower | Strip | Startswith | Endswith | Replace | Format | Count
            ),
            Value::Generator(_) => matches!(self, Send | Close),
            _ => false,
        }
    }
}

impl<P: PrintWriter> VM<'_, P> {
    pub(crate) fn call_method(&mut self, receiver: Value, method: MethodName, args: ArgValues) -> RunResult<Value> {
        match receiver {
            Value::List(_) => self.list_method(&receiver, method, args),
            Value::Tuple(items) => {
                let items = items.as_ref().clone();
                match method {
                    MethodName::Index => {
                        let item = args.get_one_arg("index")?;
                        self.position(&items, &item)?
                            .map(Value::from_len)
                            .ok_or_else(|| ExcType::value_error("tuple.index(x): x not in tuple"))
                    }
                    _ => {
                        let item = args.get_one_arg("count")?;
                        self.count_equal(&items, &item)
                    }
                }
            }
            Value::Dict(_) => self.dict_method(&receiver, method, args),
            Value::Set(set) => {
                let name: &'static str = method.into();
                match method {
                    MethodName::Add => set.borrow_mut().add(args.get_one_arg(name)?).map(|_| Value::None),
                    MethodName::Remove => set.borrow_mut().remove(&args.get_one_arg(name)?).map(|()| Value::None),
                    MethodName::Discard => set.borrow_mut().discard(&args.get_one_arg(name)?).map(|_| Value::None),
                    MethodName::Pop => {
                        args.check_zero_args(name)?;
                        set.borrow_mut().pop()
                    }
                    MethodName::Clear => {
                        args.check_zero_args(name)?;
                        set.borrow_mut().clear();
                        Ok(Value::None)
                    }
                    _ => {
                        args.check_zero_args(name)?;
                        Ok(Value::set(set.borrow().clone()))
                    }
                }
            }
            Value::Str(s) => self.str_method(&s, method, args),
            Value::Generator(generator) => match method {
                MethodName::Send => match self.resume(&generator, args.get_one_arg("send")?)? {
                    GeneratorState::Yielded(value) => Ok(value),
                    GeneratorState::Complete(value) => Err(ExcType::stop_iteration(value)),
                },
                _ => {
                    args.check_zero_args("close")?;
                    let mut generator = generator.borrow_mut();
                    if generator.is_running() {
                        return Err(ExcType::generator_already_executing());
                    }
                    generator.close();
                    Ok(Value::None)
                }
            },
            other => Err(RunError::internal(format!(
                "builtin method {method} bound to a '{}' object",
                other.type_name()
            ))),
        }
    }

    fn list_method(&mut self, receiver: &Value, method: MethodName, mut args: ArgValues) -> RunResult<Value> {
        let Value::List(list) = receiver else {
            return Err(RunError::internal("list method without a list receiver"));
        };
        let name: &'static str = method.into();
        match method {
            MethodName::Append => {
                let item = args.get_one_arg(name)?;
                list.borrow_mut().push(item);
            }
            MethodName::Extend => {
                let items = self.collect_iter(args.get_one_arg(name)?)?;
                list.borrow_mut().extend(items);
            }
            MethodName::Pop => {
                let index = args.get_zero_one_arg(name)?.map(|i| i.as_int()).transpose()?;
                let mut items = list.borrow_mut();
                if items.is_empty() {
                    return Err(ExcType::index_error_pop_empty_list());
                }
                let position = match index {
                    None => items.len() - 1,
                    Some(index) => normalize_index(index, items.len()).ok_or_else(ExcType::index_error_pop_out_of_range)?,
                };
                return Ok(items.remove(position));
            }
            MethodName::Insert => {
                let (index, item) = args.get_two_args(name)?;
                let index = index.as_int()?;
                let mut items = list.borrow_mut();
                let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                let position = if index < 0 { (index + len).max(0) } else { index.min(len) };
                items.insert(usize::try_from(position).unwrap_or(0), item);
            }
            MethodName::Remove => {
                let item = args.get_one_arg(name)?;
                let items = list.borrow().clone();
                let position = self
                    .position(&items, &item)?
                    .ok_or_else(ExcType::value_error_remove_not_in_list)?;
                list.borrow_mut().remove(position);
            }
            MethodName::Index => {
                let item = args.get_one_arg(name)?;
                let items = list.borrow().clone();
                return self
                    .position(&items, &item)?
                    .map(Value::from_len)
                    .ok_or_else(ExcType::value_error_not_in_list);
            }
            MethodName::Count => {
                let item = args.get_one_arg(name)?;
                let items = list.borrow().clone();
                return self.count_equal(&items, &item);
            }
            MethodName::Reverse => {
                args.check_zero_args(name)?;
                list.borrow_mut().reverse();
            }
            MethodName::Sort => {
                if args.count() > 0 {
                    return Err(ExcType::type_error("sort() takes no positional arguments"));
                }
                let key = args.take_kwarg("key").filter(|key| !matches!(key, Value::None));
                let reverse = match args.take_kwarg("reverse") {
                    Some(reverse) => self.py_truthy(&reverse)?,
                    None => false,
                };
                if let Some((key, _)) = args.kwargs.first() {
                    return Err(ExcType::type_error(format!(
                        "'{key}' is an invalid keyword argument for sort()"
                    )));
                }
                let items = list.borrow().clone();
                let sorted = self.sort_values(items, key, reverse)?;
                *list.borrow_mut() = sorted;
            }
            MethodName::Clear => {
                args.check_zero_args(name)?;
                list.borrow_mut().clear();
            }
            _ => {
                args.check_zero_args(name)?;
                return Ok(Value::list(list.borrow().clone()));
            }
        }
        Ok(Value::None)
    }

    fn dict_method(&mut self, receiver: &Value, method: MethodName, args: ArgValues) -> RunResult<Value> {
        let Value::Dict(dict) = receiver else {
            return Err(RunError::internal("dict method without a dict receiver"));
        };
        let name: &'static str = method.into();
        match method {
            MethodName::Get => {
                let (key, default) = args.get_one_two_args(name)?;
                Ok(dict.borrow().get(&key)?.or(default).unwrap_or(Value::None))
            }
            MethodName::Keys => {
                args.check_zero_args(name)?;
                Ok(Value::list(dict.borrow().keys()))
            }
            MethodName::Values => {
                args.check_zero_args(name)?;
                Ok(Value::list(dict.borrow().values()))
            }
            MethodName::Items => {
                args.check_zero_args(name)?;
                let items = dict.borrow().items();
                Ok(Value::list(
                    items.into_iter().map(|(k, v)| Value::tuple(vec![k, v])).collect(),
                ))
            }
            MethodName::Pop => {
                let (key, default) = args.get_one_two_args(name)?;
                let removed = dict.borrow_mut().remove(&key)?;
                removed.or(default).ok_or_else(|| ExcType::key_error(&key))
            }
            MethodName::Setdefault => {
                let (key, default) = args.get_one_two_args(name)?;
                if let Some(existing) = dict.borrow().get(&key)? {
                    return Ok(existing);
                }
                let default = default.unwrap_or(Value::None);
                dict.borrow_mut().set(key, default.clone())?;
                Ok(default)
            }
            MethodName::Update => {
                let mut args = args;
                let kwargs = std::mem::take(&mut args.kwargs);
                if let Some(source) = args.get_zero_one_arg(name)? {
                    let entries = self.dict_from(source)?;
                    let mut target = dict.borrow_mut();
                    for (key, value) in entries.items() {
                        target.set(key, value)?;
                    }
                }
                let mut target = dict.borrow_mut();
                for (key, value) in kwargs {
                    target.set_str(&key, value);
                }
                Ok(Value::None)
            }
            MethodName::Clear => {
                args.check_zero_args(name)?;
                dict.borrow_mut().clear();
                Ok(Value::None)
            }
            _ => {
                args.check_zero_args(name)?;
                Ok(Value::dict(dict.borrow().clone()))
            }
        }
    }

    fn str_method(&mut self, s: &str, method: MethodName, args: ArgValues) -> RunResult<Value> {
        let name: &'static str = method.into();
        let result = match method {
            MethodName::Join => {
                let items = self.collect_iter(args.get_one_arg(name)?)?;
                let mut parts = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::Str(part) => parts.push(&**part),
                        other => {
                            return Err(ExcType::type_error(format!(
                                "sequence item {i}: expected str instance, {} found",
                                other.type_name()
                            )))
                        }
                    }
                }
                Value::from(parts.join(s))
            }
            MethodName::Split => {
                args.check_no_kwargs(name)?;
                let mut positional = args.args.into_iter();
                let sep = positional.next().unwrap_or(Value::None);
                let max_split = positional.next().map(|m| m.as_int()).transpose()?.unwrap_or(-1);
                let max_split = usize::try_from(max_split).ok();
                let parts = match &sep {
                    Value::None => split_whitespace(s, max_split),
                    Value::Str(sep) if sep.is_empty() => return Err(ExcType::value_error_empty_separator()),
                    Value::Str(sep) => match max_split {
                        Some(max) => s.splitn(max + 1, &**sep).map(str::to_owned).collect(),
                        None => s.split(&**sep).map(str::to_owned).collect(),
                    },
                    other => {
                        return Err(ExcType::type_error(format!(
                            "must be str or None, not {}",
                            other.type_name()
                        )))
                    }
                };
                Value::list(parts.into_iter().map(Value::from).collect())
            }
            MethodName::Upper => {
                args.check_zero_args(name)?;
                Value::from(s.to_uppercase())
            }
            MethodName::Lower => {
                args.check_zero_args(name)?;
                Value::from(s.to_lowercase())
            }
            MethodName::Strip => match args.get_zero_one_arg(name)? {
                None | Some(Value::None) => Value::from(s.trim()),
                Some(Value::Str(chars)) => Value::from(s.trim_matches(|c: char| chars.contains(c))),
                Some(other) => {
                    return Err(ExcType::type_error(format!(
                        "strip arg must be None or str, not {}",
                        other.type_name()
                    )))
                }
            },
            MethodName::Startswith | MethodName::Endswith => {
                let affix = args.get_one_arg(name)?;
                let test = |affix: &str| {
                    if method == MethodName::Startswith {
                        s.starts_with(affix)
                    } else {
                        s.ends_with(affix)
                    }
                };
                match &affix {
                    Value::Str(affix) => Value::Bool(test(&**affix)),
                    Value::Tuple(options) => Value::Bool(options.iter().any(|o| o.as_str().is_some_and(test))),
                    other => {
                        return Err(ExcType::type_error(format!(
                            "{name} first arg must be str or a tuple of str, not {}",
                            other.type_name()
                        )))
                    }
                }
            }
            MethodName::Replace => {
                args.check_no_kwargs(name)?;
                let count = args.count();
                let mut positional = args.args.into_iter();
                let (Some(old), Some(new)) = (positional.next(), positional.next()) else {
                    return Err(ExcType::type_error_at_least(name, 2, count));
                };
                let limit = positional.next().map(|c| c.as_int()).transpose()?;
                let (Value::Str(old), Value::Str(new)) = (&old, &new) else {
                    return Err(ExcType::type_error("replace() arguments must be str"));
                };
                match limit.and_then(|l| usize::try_from(l).ok()) {
                    Some(limit) => Value::from(s.replacen(&**old, new, limit)),
                    None => Value::from(s.replace(&**old, new)),
                }
            }
            MethodName::Format => {
                args.check_no_kwargs(name)?;
                let mut rendered = Vec::with_capacity(args.count());
                for arg in &args.args {
                    rendered.push(Value::from(self.str_value(arg)?));
                }
                Value::from(brace_format(s, &rendered)?)
            }
            _ => match args.get_one_arg(name)? {
                Value::Str(sub) if sub.is_empty() => Value::from_len(s.chars().count() + 1),
                Value::Str(sub) => Value::from_len(s.matches(&*sub).count()),
                other => {
                    return Err(ExcType::type_error(format!(
                        "must be str, not {}",
                        other.type_name()
                    )))
                }
            },
        };
        Ok(result)
    }

    /// Sorts by the builtin ordering, of the items or of `key(item)`.
    ///
    /// The sort is stable in both directions. Values that cannot be ordered against each
    /// other raise `TypeError`.
    pub(crate) fn sort_values(&mut self, items: Vec<Value>, key: Option<Value>, reverse: bool) -> RunResult<Vec<Value>> {
        let keys = match key {
            Some(key) => {
                let mut keys = Vec::with_capacity(items.len());
                for item in &items {
                    keys.push(self.call_value(key.clone(), ArgValues::positional(vec![item.clone()]))?);
                }
                keys
            }
            None => items.clone(),
        };
        let mut pairs: Vec<(Value, Value)> = keys.into_iter().zip(items).collect();
        let mut error = None;
        pairs.sort_by(|(a, _), (b, _)| {
            let ordering = a.py_cmp(b).unwrap_or_else(|| {
                let numbers = is_number(a) && is_number(b);
                if !numbers && error.is_none() {
                    error = Some(ExcType::compare_type_error("<", &a.type_name(), &b.type_name()));
                }
                Ordering::Equal
            });
            if reverse {
                ordering.reverse()
            } else {
                ordering
            }
        });
        match error {
            Some(err) => Err(err),
            None => Ok(pairs.into_iter().map(|(_, item)| item).collect()),
        }
    }

    fn position(&mut self, items: &[Value], item: &Value) -> RunResult<Option<usize>> {
        for (i, candidate) in items.iter().enumerate() {
            if candidate.is(item) || self.py_equal(candidate, item)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    fn count_equal(&mut self, items: &[Value], item: &Value) -> RunResult<Value> {
        let mut count = 0;
        for candidate in items {
            if candidate.is(item) || self.py_equal(candidate, item)? {
                count += 1;
            }
        }
        Ok(Value::from_len(count))
    }
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_) | Value::Bool(_))
}

/// Resolves a possibly negative index against `len`.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

/// `str.split()` without a separator: runs of whitespace separate, and the remainder after
/// `max_split` splits keeps its trailing whitespace.
fn split_whitespace(s: &str, max_split: Option<usize>) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if max_split == Some(parts.len()) {
            parts.push(rest.to_owned());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(rest[..end].to_owned());
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest.to_owned());
                break;
            }
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::NoPrint;

    fn call(receiver: &Value, name: &str, args: Vec<Value>) -> RunResult<Value> {
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let method = MethodName::lookup(receiver, name).expect("method exists");
        vm.call_method(receiver.clone(), method, ArgValues::positional(args))
    }

    #[test]
    fn test_lookup_respects_receiver_type() {
        assert_eq!(MethodName::lookup(&Value::list(vec![]), "append"), Some(MethodName::Append));
        assert_eq!(MethodName::lookup(&Value::Str("".into()), "append"), None);
        assert_eq!(MethodName::lookup(&Value::Str("".into()), "startswith"), Some(MethodName::Startswith));
        assert_eq!(MethodName::Setdefault.to_string(), "setdefault");
    }

    #[test]
    fn test_list_methods() {
        let list = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        call(&list, "append", vec![Value::Int(0)]).unwrap();
        assert_eq!(call(&list, "pop", vec![Value::Int(0)]).unwrap().py_repr(), "3");
        call(&list, "insert", vec![Value::Int(-1), Value::Int(9)]).unwrap();
        assert_eq!(list.py_repr(), "[1, 2, 9, 0]");
        call(&list, "sort", vec![]).unwrap();
        assert_eq!(list.py_repr(), "[0, 1, 2, 9]");
        assert_eq!(call(&list, "index", vec![Value::Int(9)]).unwrap().py_repr(), "3");
        assert!(call(&list, "remove", vec![Value::Int(5)]).is_err());
        assert!(call(&Value::list(vec![]), "pop", vec![]).is_err());
    }

    #[test]
    fn test_sort_mixed_types_fails() {
        let list = Value::list(vec![Value::Int(1), Value::Str("a".into())]);
        let Err(RunError::Exc(raise)) = call(&list, "sort", vec![]) else {
            panic!("expected TypeError");
        };
        assert!(raise.value.py_str().contains("not supported between instances of"));
    }

    #[test]
    fn test_dict_methods() {
        let dict = Value::dict(crate::types::Dict::new());
        call(&dict, "setdefault", vec![Value::Str("a".into()), Value::Int(1)]).unwrap();
        assert_eq!(call(&dict, "get", vec![Value::Str("b".into()), Value::Int(0)]).unwrap().py_repr(), "0");
        assert_eq!(call(&dict, "items", vec![]).unwrap().py_repr(), "[('a', 1)]");
        assert!(call(&dict, "pop", vec![Value::Str("b".into())]).is_err());
        assert_eq!(call(&dict, "pop", vec![Value::Str("a".into())]).unwrap().py_repr(), "1");
    }

    #[test]
    fn test_str_methods() {
        let s = Value::Str("  a b  c ".into());
        assert_eq!(call(&s, "split", vec![]).unwrap().py_repr(), "['a', 'b', 'c']");
        assert_eq!(
            call(&s, "split", vec![Value::None, Value::Int(1)]).unwrap().py_repr(),
            "['a', 'b  c ']"
        );
        let csv = Value::Str("x,y,,z".into());
        assert_eq!(call(&csv, "split", vec![Value::Str(",".into())]).unwrap().py_repr(), "['x', 'y', '', 'z']");
        let sep = Value::Str("-".into());
        let parts = Value::list(vec![Value::Str("a".into()), Value::Str("b".into())]);
        assert_eq!(call(&sep, "join", vec![parts]).unwrap().py_repr(), "'a-b'");
        assert!(call(&sep, "join", vec![Value::list(vec![Value::Int(1)])]).is_err());
        let template = Value::Str("{}+{}".into());
        assert_eq!(call(&template, "format", vec![Value::Int(1), Value::Int(2)]).unwrap().py_repr(), "'1+2'");
    }

    #[test]
    fn test_str_count() {
        let s = Value::Str("banana".into());
        assert_eq!(call(&s, "count", vec![Value::Str("an".into())]).unwrap().py_repr(), "2");
        assert_eq!(call(&s, "count", vec![Value::Str("".into())]).unwrap().py_repr(), "7");
        assert!(call(&s, "count", vec![Value::Int(1)]).is_err());
    }

    #[test]
    fn test_normalize_index() {
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-4, 3), None);
    }
}
