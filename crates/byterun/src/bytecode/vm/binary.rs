//! Unary and binary operators, including subscripts.
//!
//! Builtin semantics live in two operator tables indexed by the operator tag. Each entry
//! returns `Ok(None)` when it does not support the operand types, after which instances of
//! user classes get their dunder methods tried.

use std::rc::Rc;

use super::VM;
use crate::{
    bytecode::{BinaryOp, UnaryOp},
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    types::{str::percent_format, Set},
    value::Value,
};

type UnaryFn = fn(&Value) -> RunResult<Option<Value>>;
type BinaryFn = fn(&Value, &Value) -> RunResult<Option<Value>>;

/// Indexed by `UnaryOp as usize`.
const UNARY_OPS: [UnaryFn; 4] = [positive, negative, logical_not, invert];

/// Indexed by `BinaryOp as usize`.
const BINARY_OPS: [BinaryFn; 14] = [
    power,
    multiply,
    matrix_multiply,
    floor_divide,
    true_divide,
    modulo,
    add,
    subtract,
    subscr,
    lshift,
    rshift,
    bit_and,
    bit_xor,
    bit_or,
];

impl<P: PrintWriter> VM<'_, P> {
    pub(super) fn unary_operator(&mut self, op: UnaryOp) -> RunResult<()> {
        let value = self.pop()?;
        let result = if matches!(value, Value::Instance(_)) {
            match op {
                UnaryOp::Not => Some(Value::Bool(!self.py_truthy(&value)?)),
                _ => self.call_special(&value, unary_dunder(op), vec![])?,
            }
        } else {
            UNARY_OPS[op as usize](&value)?
        };
        let result = result.ok_or_else(|| ExcType::unary_type_error(unary_symbol(op), &value.type_name()))?;
        self.push(result)
    }

    /// Handles both the `BINARY_*` and the `INPLACE_*` families.
    pub(super) fn binary_operator(&mut self, op: BinaryOp, inplace: bool) -> RunResult<()> {
        let [lhs, rhs] = self.pop_array()?;
        let result = self.binary_value(op, &lhs, &rhs, inplace)?;
        self.push(result)
    }

    pub(crate) fn binary_value(&mut self, op: BinaryOp, lhs: &Value, rhs: &Value, inplace: bool) -> RunResult<Value> {
        if inplace {
            if let Some(result) = inplace_builtin(op, lhs, rhs)? {
                return Ok(result);
            }
        }
        if let Some(result) = BINARY_OPS[op as usize](lhs, rhs)? {
            return Ok(result);
        }

        let (normal, reflected, inplace_name) = op.dunders();
        if inplace {
            if let Some(result) = self.call_special(lhs, inplace_name, vec![rhs.clone()])? {
                return Ok(result);
            }
        }
        if let Some(result) = self.call_special(lhs, normal, vec![rhs.clone()])? {
            return Ok(result);
        }
        if op != BinaryOp::Subscr {
            if let Some(result) = self.call_special(rhs, reflected, vec![lhs.clone()])? {
                return Ok(result);
            }
        }

        if op == BinaryOp::Subscr {
            return Err(match lhs {
                Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Range(_) => {
                    ExcType::type_error_indices(sequence_name(lhs), &rhs.type_name())
                }
                _ => ExcType::type_error_not_sub(&lhs.type_name()),
            });
        }
        let symbol = if inplace {
            format!("{}=", op.symbol())
        } else {
            op.symbol().to_owned()
        };
        Err(ExcType::binary_type_error(&symbol, &lhs.type_name(), &rhs.type_name()))
    }

    /// `obj[key] = value`.
    pub(super) fn store_subscr(&mut self, obj: &Value, key: Value, value: Value) -> RunResult<()> {
        match obj {
            Value::List(list) => match &key {
                Value::Slice(slice) => {
                    let items = self.collect_iter(value)?;
                    let mut list = list.borrow_mut();
                    let positions = slice.positions(list.len())?;
                    if slice.step.unwrap_or(1) == 1 {
                        let start = positions.first().copied().unwrap_or_else(|| {
                            let len = i64::try_from(list.len()).unwrap_or(i64::MAX);
                            let start = slice.start.map_or(0, |s| if s < 0 { (s + len).max(0) } else { s.min(len) });
                            usize::try_from(start).unwrap_or(0)
                        });
                        list.splice(start..start + positions.len(), items);
                    } else {
                        if positions.len() != items.len() {
                            return Err(ExcType::value_error(format!(
                                "attempt to assign sequence of size {} to extended slice of size {}",
                                items.len(),
                                positions.len()
                            )));
                        }
                        for (position, item) in positions.into_iter().zip(items) {
                            list[position] = item;
                        }
                    }
                    Ok(())
                }
                _ => {
                    let mut list = list.borrow_mut();
                    let index = index_key(&key, list.len(), "list")?.ok_or_else(ExcType::list_assignment_index_error)?;
                    list[index] = value;
                    Ok(())
                }
            },
            Value::Dict(dict) => dict.borrow_mut().set(key, value),
            Value::Instance(_) => match self.call_special(obj, "__setitem__", vec![key, value])? {
                Some(_) => Ok(()),
                None => Err(ExcType::type_error_not_sub_assignment(&obj.type_name())),
            },
            _ => Err(ExcType::type_error_not_sub_assignment(&obj.type_name())),
        }
    }

    /// `del obj[key]`.
    pub(super) fn delete_subscr(&mut self, obj: &Value, key: &Value) -> RunResult<()> {
        match obj {
            Value::List(list) => {
                let mut list = list.borrow_mut();
                match key {
                    Value::Slice(slice) => {
                        let mut positions = slice.positions(list.len())?;
                        positions.sort_unstable();
                        for position in positions.into_iter().rev() {
                            list.remove(position);
                        }
                    }
                    _ => {
                        let index = index_key(key, list.len(), "list")?
                            .ok_or_else(|| ExcType::index_error("list assignment"))?;
                        list.remove(index);
                    }
                }
                Ok(())
            }
            Value::Dict(dict) => match dict.borrow_mut().remove(key)? {
                Some(_) => Ok(()),
                None => Err(ExcType::key_error(key)),
            },
            Value::Instance(_) => match self.call_special(obj, "__delitem__", vec![key.clone()])? {
                Some(_) => Ok(()),
                None => Err(ExcType::type_error_not_sub_deletion(&obj.type_name())),
            },
            _ => Err(ExcType::type_error_not_sub_deletion(&obj.type_name())),
        }
    }
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Positive => "+",
        UnaryOp::Negative => "-",
        UnaryOp::Not => "not",
        UnaryOp::Invert => "~",
    }
}

fn unary_dunder(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Positive => "__pos__",
        UnaryOp::Negative => "__neg__",
        UnaryOp::Not => "__bool__",
        UnaryOp::Invert => "__invert__",
    }
}

fn sequence_name(value: &Value) -> &'static str {
    match value {
        Value::Str(_) => "string",
        Value::Range(_) => "range",
        Value::Tuple(_) => "tuple",
        _ => "list",
    }
}

/// In-place forms that mutate the left operand instead of building a new value.
fn inplace_builtin(op: BinaryOp, lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::List(list), Value::List(other)) => {
            let items = other.borrow().clone();
            list.borrow_mut().extend(items);
        }
        (BinaryOp::Add, Value::List(list), Value::Tuple(other)) => list.borrow_mut().extend(other.iter().cloned()),
        (BinaryOp::Or, Value::Set(set), Value::Set(other)) if !Rc::ptr_eq(set, other) => {
            let merged = set.borrow().union(&other.borrow());
            *set.borrow_mut() = merged;
        }
        _ => return Ok(None),
    }
    Ok(Some(lhs.clone()))
}

/// Ints and bools as `i64`.
fn int_like(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Any number as `f64`.
fn float_like(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        other => int_like(other).map(|i| i as f64),
    }
}

fn int_result(result: Option<i64>) -> RunResult<Option<Value>> {
    result
        .map(|i| Some(Value::Int(i)))
        .ok_or_else(|| ExcType::overflow("integer overflow"))
}

/// Applies `int_op` to two ints, or `float_op` when either side is a float.
fn numeric(
    lhs: &Value,
    rhs: &Value,
    int_op: impl FnOnce(i64, i64) -> RunResult<Option<Value>>,
    float_op: impl FnOnce(f64, f64) -> RunResult<Option<Value>>,
) -> RunResult<Option<Value>> {
    if let (Some(a), Some(b)) = (int_like(lhs), int_like(rhs)) {
        return int_op(a, b);
    }
    match (float_like(lhs), float_like(rhs)) {
        (Some(a), Some(b)) => float_op(a, b),
        _ => Ok(None),
    }
}

fn positive(value: &Value) -> RunResult<Option<Value>> {
    Ok(match value {
        Value::Float(f) => Some(Value::Float(*f)),
        other => int_like(other).map(Value::Int),
    })
}

fn negative(value: &Value) -> RunResult<Option<Value>> {
    match value {
        Value::Float(f) => Ok(Some(Value::Float(-f))),
        other => match int_like(other) {
            Some(i) => int_result(i.checked_neg()),
            None => Ok(None),
        },
    }
}

fn logical_not(value: &Value) -> RunResult<Option<Value>> {
    Ok(Some(Value::Bool(!value.py_bool())))
}

fn invert(value: &Value) -> RunResult<Option<Value>> {
    Ok(int_like(value).map(|i| Value::Int(!i)))
}

fn power(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    numeric(
        lhs,
        rhs,
        |base, exp| {
            if exp < 0 {
                if base == 0 {
                    return Err(ExcType::zero_negative_power());
                }
                return Ok(Some(Value::Float((base as f64).powf(exp as f64))));
            }
            let exp = u32::try_from(exp).map_err(|_| ExcType::overflow("integer overflow"))?;
            int_result(base.checked_pow(exp))
        },
        |base, exp| {
            if base == 0.0 && exp < 0.0 {
                return Err(ExcType::zero_negative_power());
            }
            Ok(Some(Value::Float(base.powf(exp))))
        },
    )
}

fn multiply(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    if let Some(result) = repeat(lhs, rhs)? {
        return Ok(Some(result));
    }
    if let Some(result) = repeat(rhs, lhs)? {
        return Ok(Some(result));
    }
    numeric(lhs, rhs, |a, b| int_result(a.checked_mul(b)), |a, b| Ok(Some(Value::Float(a * b))))
}

/// Sequence repetition: `seq * n`.
///
/// The result is reserved up front so that an impossible size raises `MemoryError`.
fn repeat(seq: &Value, count: &Value) -> RunResult<Option<Value>> {
    let Some(count) = int_like(count) else {
        return Ok(None);
    };
    let count = usize::try_from(count).unwrap_or(0);
    let result = match seq {
        Value::Str(s) => {
            let mut out = String::new();
            reserve_repeat(s.len(), count, |total| out.try_reserve_exact(total).is_ok())?;
            for _ in 0..count {
                out.push_str(s);
            }
            Value::Str(out.into())
        }
        Value::List(items) => Value::list(repeat_items(&items.borrow(), count)?),
        Value::Tuple(items) => Value::tuple(repeat_items(items, count)?),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn repeat_items(items: &[Value], count: usize) -> RunResult<Vec<Value>> {
    let mut out = Vec::new();
    reserve_repeat(items.len(), count, |total| out.try_reserve_exact(total).is_ok())?;
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    Ok(out)
}

fn reserve_repeat(len: usize, count: usize, reserve: impl FnOnce(usize) -> bool) -> RunResult<()> {
    match len.checked_mul(count) {
        Some(total) if reserve(total) => Ok(()),
        _ => Err(ExcType::memory_error()),
    }
}

fn matrix_multiply(_lhs: &Value, _rhs: &Value) -> RunResult<Option<Value>> {
    // no builtin type implements `@`
    Ok(None)
}

fn floor_divide(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    numeric(
        lhs,
        rhs,
        |a, b| {
            if b == 0 {
                return Err(ExcType::zero_division("integer division or modulo by zero"));
            }
            int_result(floor_divmod(a, b).map(|(q, _)| q))
        },
        |a, b| {
            if b == 0.0 {
                return Err(ExcType::zero_division("float floor division by zero"));
            }
            Ok(Some(Value::Float((a / b).floor())))
        },
    )
}

fn true_divide(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    match (float_like(lhs), float_like(rhs)) {
        (Some(_), Some(b)) if b == 0.0 => Err(ExcType::zero_division("division by zero")),
        (Some(a), Some(b)) => Ok(Some(Value::Float(a / b))),
        _ => Ok(None),
    }
}

fn modulo(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    if let Value::Str(template) = lhs {
        return Ok(Some(Value::Str(percent_format(template, rhs)?.into())));
    }
    numeric(
        lhs,
        rhs,
        |a, b| {
            if b == 0 {
                return Err(ExcType::zero_division("integer division or modulo by zero"));
            }
            int_result(floor_divmod(a, b).map(|(_, r)| r))
        },
        |a, b| {
            if b == 0.0 {
                return Err(ExcType::zero_division("float modulo"));
            }
            let rem = a % b;
            let rem = if rem != 0.0 && (rem < 0.0) != (b < 0.0) { rem + b } else { rem };
            Ok(Some(Value::Float(rem)))
        },
    )
}

/// Floor division and modulo with the remainder taking the divisor's sign.
///
/// `None` on overflow (`i64::MIN // -1`).
pub(crate) fn floor_divmod(a: i64, b: i64) -> Option<(i64, i64)> {
    let quot = a.checked_div(b)?;
    let rem = a.checked_rem(b)?;
    if rem != 0 && (rem < 0) != (b < 0) {
        Some((quot - 1, rem + b))
    } else {
        Some((quot, rem))
    }
}

fn add(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    let result = match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}").into()),
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Value::list(items)
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.as_ref().clone();
            items.extend(b.iter().cloned());
            Value::tuple(items)
        }
        _ => return numeric(lhs, rhs, |a, b| int_result(a.checked_add(b)), |a, b| Ok(Some(Value::Float(a + b)))),
    };
    Ok(Some(result))
}

fn subtract(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    if let (Value::Set(a), Value::Set(b)) = (lhs, rhs) {
        return Ok(Some(Value::set(a.borrow().difference(&b.borrow()))));
    }
    numeric(lhs, rhs, |a, b| int_result(a.checked_sub(b)), |a, b| Ok(Some(Value::Float(a - b))))
}

/// Resolves an int subscript against a sequence of `len` items, `None` when out of range.
fn index_key(key: &Value, len: usize, type_name: &str) -> RunResult<Option<usize>> {
    let Some(index) = int_like(key) else {
        return Err(ExcType::type_error_indices(type_name, &key.type_name()));
    };
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let index = if index < 0 { index + len } else { index };
    Ok(if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    })
}

fn subscr(obj: &Value, key: &Value) -> RunResult<Option<Value>> {
    let result = match (obj, key) {
        (Value::List(items), Value::Slice(slice)) => {
            let items = items.borrow();
            Value::list(slice.positions(items.len())?.into_iter().map(|i| items[i].clone()).collect())
        }
        (Value::Tuple(items), Value::Slice(slice)) => {
            Value::tuple(slice.positions(items.len())?.into_iter().map(|i| items[i].clone()).collect())
        }
        (Value::Str(s), Value::Slice(slice)) => {
            let chars: Vec<char> = s.chars().collect();
            let picked: String = slice.positions(chars.len())?.into_iter().map(|i| chars[i]).collect();
            Value::Str(picked.into())
        }
        (Value::List(items), key) if int_like(key).is_some() => {
            let items = items.borrow();
            let index = index_key(key, items.len(), "list")?.ok_or_else(|| ExcType::index_error("list"))?;
            items[index].clone()
        }
        (Value::Tuple(items), key) if int_like(key).is_some() => {
            let index = index_key(key, items.len(), "tuple")?.ok_or_else(|| ExcType::index_error("tuple"))?;
            items[index].clone()
        }
        (Value::Str(s), key) if int_like(key).is_some() => {
            let len = s.chars().count();
            let index = index_key(key, len, "string")?.ok_or_else(|| ExcType::index_error("string"))?;
            s.chars().nth(index).map(|c| Value::Str(c.to_string().into())).unwrap_or(Value::None)
        }
        (Value::Range(range), key) if int_like(key).is_some() => {
            let index = index_key(key, range.len(), "range")?.ok_or_else(|| ExcType::index_error("range object"))?;
            range.get(index).map(Value::Int).unwrap_or(Value::None)
        }
        (Value::Dict(dict), key) => match dict.borrow().get(key)? {
            Some(value) => value,
            None => return Err(ExcType::key_error(key)),
        },
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn lshift(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    let (Some(a), Some(b)) = (int_like(lhs), int_like(rhs)) else {
        return Ok(None);
    };
    if b < 0 {
        return Err(ExcType::value_error_negative_shift_count());
    }
    if a == 0 {
        return Ok(Some(Value::Int(0)));
    }
    let shift = u32::try_from(b).ok().filter(|s| *s < 64);
    match shift.map(|s| (a << s, s)) {
        Some((shifted, s)) if shifted >> s == a => Ok(Some(Value::Int(shifted))),
        _ => Err(ExcType::overflow("integer overflow")),
    }
}

fn rshift(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    let (Some(a), Some(b)) = (int_like(lhs), int_like(rhs)) else {
        return Ok(None);
    };
    if b < 0 {
        return Err(ExcType::value_error_negative_shift_count());
    }
    let shift = u32::try_from(b.min(63)).unwrap_or(63);
    Ok(Some(Value::Int(a >> shift)))
}

/// Shared shape of `&`, `^` and `|`: bools stay bools, ints combine bitwise, sets combine.
fn bitwise(
    lhs: &Value,
    rhs: &Value,
    int_op: fn(i64, i64) -> i64,
    set_op: fn(&Set, &Set) -> Set,
) -> RunResult<Option<Value>> {
    let result = match (lhs, rhs) {
        (Value::Bool(a), Value::Bool(b)) => Value::Bool(int_op(i64::from(*a), i64::from(*b)) != 0),
        (Value::Set(a), Value::Set(b)) => Value::set(set_op(&a.borrow(), &b.borrow())),
        _ => match (int_like(lhs), int_like(rhs)) {
            (Some(a), Some(b)) => Value::Int(int_op(a, b)),
            _ => return Ok(None),
        },
    };
    Ok(Some(result))
}

fn bit_and(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    bitwise(lhs, rhs, |a, b| a & b, Set::intersection)
}

fn bit_xor(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    bitwise(lhs, rhs, |a, b| a ^ b, Set::symmetric_difference)
}

fn bit_or(lhs: &Value, rhs: &Value) -> RunResult<Option<Value>> {
    bitwise(lhs, rhs, |a, b| a | b, Set::union)
}
