//! Implementation of the divmod() builtin function.

use crate::{
    args::ArgValues,
    bytecode::vm::floor_divmod,
    exception_private::{ExcType, RunResult},
    value::Value,
};

/// Returns `(a // b, a % b)`, with the remainder taking the sign of the divisor.
pub(super) fn builtin_divmod(args: ArgValues) -> RunResult<Value> {
    let (a, b) = args.get_two_args("divmod")?;
    match (&a, &b) {
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
            let (x, y) = (a.as_int()?, b.as_int()?);
            if y == 0 {
                return Err(ExcType::zero_division("integer division or modulo by zero"));
            }
            let (quot, rem) = floor_divmod(x, y).ok_or_else(|| ExcType::overflow("integer overflow in divmod()"))?;
            Ok(Value::tuple(vec![Value::Int(quot), Value::Int(rem)]))
        }
        _ => match (float_of(&a), float_of(&b)) {
            (Some(x), Some(y)) => {
                if y == 0.0 {
                    return Err(ExcType::zero_division("float divmod()"));
                }
                let mut rem = x % y;
                if rem != 0.0 && (rem < 0.0) != (y < 0.0) {
                    rem += y;
                }
                let quot = ((x - rem) / y).round();
                Ok(Value::tuple(vec![Value::Float(quot), Value::Float(rem)]))
            }
            _ => Err(ExcType::binary_type_error("divmod()", &a.type_name(), &b.type_name())),
        },
    }
}

fn float_of(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Int(i) => Some(*i as f64),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn divmod(a: Value, b: Value) -> RunResult<Value> {
        builtin_divmod(ArgValues::positional(vec![a, b]))
    }

    #[test]
    fn test_divmod_signs() {
        assert_eq!(divmod(Value::Int(7), Value::Int(-2)).unwrap().py_repr(), "(-4, -1)");
        assert_eq!(divmod(Value::Int(-7), Value::Int(2)).unwrap().py_repr(), "(-4, 1)");
        assert_eq!(divmod(Value::Float(7.5), Value::Int(2)).unwrap().py_repr(), "(3.0, 1.5)");
        assert!(divmod(Value::Int(1), Value::Int(0)).is_err());
        assert!(divmod(Value::Str("a".into()), Value::Int(1)).is_err());
    }
}
