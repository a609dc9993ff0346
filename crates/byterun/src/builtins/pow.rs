//! Implementation of the pow() builtin function.

use crate::{
    args::ArgValues,
    bytecode::{BinaryOp, VM},
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    value::Value,
};

/// `pow(base, exp)` is `base ** exp`; `pow(base, exp, mod)` is modular exponentiation
/// over integers, with the result taking the sign of `mod`.
pub(super) fn builtin_pow<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    args.check_no_kwargs("pow")?;
    let count = args.count();
    let (base, exp, modulus) = match <[Value; 3]>::try_from(args.args) {
        Ok([base, exp, modulus]) => (base, exp, modulus),
        Err(args) => match <[Value; 2]>::try_from(args) {
            Ok([base, exp]) => (base, exp, Value::None),
            Err(_) if count < 2 => return Err(ExcType::type_error_at_least("pow", 2, count)),
            Err(_) => return Err(ExcType::type_error_at_most("pow", 3, count)),
        },
    };
    if matches!(modulus, Value::None) {
        return vm.binary_value(BinaryOp::Power, &base, &exp, false);
    }
    let integers = [&base, &exp, &modulus]
        .iter()
        .all(|v| matches!(v, Value::Int(_) | Value::Bool(_)));
    if !integers {
        return Err(ExcType::type_error(
            "pow() 3rd argument not allowed unless all arguments are integers",
        ));
    }
    mod_pow(base.as_int()?, exp.as_int()?, modulus.as_int()?).map(Value::Int)
}

fn mod_pow(base: i64, exp: i64, modulus: i64) -> RunResult<i64> {
    if modulus == 0 {
        return Err(ExcType::value_error("pow() 3rd argument cannot be 0"));
    }
    if exp < 0 {
        return Err(ExcType::value_error(
            "pow() 2nd argument cannot be negative when 3rd argument specified",
        ));
    }
    let m = i128::from(modulus).abs();
    let mut result: i128 = 1 % m;
    let mut base = i128::from(base).rem_euclid(m);
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % m;
        }
        base = base * base % m;
        exp >>= 1;
    }
    if modulus < 0 && result != 0 {
        result -= m;
    }
    i64::try_from(result).map_err(|_| ExcType::overflow("integer overflow in pow()"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_pow() {
        assert_eq!(mod_pow(2, 10, 1000).unwrap(), 24);
        assert_eq!(mod_pow(2, 3, -5).unwrap(), -2);
        assert_eq!(mod_pow(-2, 3, 5).unwrap(), 2);
        assert_eq!(mod_pow(5, 0, 1).unwrap(), 0);
        assert!(mod_pow(2, -1, 5).is_err());
        assert!(mod_pow(2, 1, 0).is_err());
    }
}
