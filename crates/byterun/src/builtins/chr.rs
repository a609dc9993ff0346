//! Implementation of the chr() and ord() builtin functions.

use crate::{
    args::ArgValues,
    exception_private::{ExcType, RunResult},
    value::Value,
};

pub(super) fn builtin_chr(args: ArgValues) -> RunResult<Value> {
    let code = args.get_one_arg("chr")?.as_int()?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::from(c.to_string()))
        .ok_or_else(|| ExcType::value_error("chr() arg not in range(0x110000)"))
}

pub(super) fn builtin_ord(args: ArgValues) -> RunResult<Value> {
    let value = args.get_one_arg("ord")?;
    let Value::Str(s) = &value else {
        return Err(ExcType::type_error(format!(
            "ord() expected string of length 1, but {} found",
            value.type_name()
        )));
    };
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Int(i64::from(u32::from(c)))),
        _ => Err(ExcType::type_error(format!(
            "ord() expected a character, but string of length {} found",
            s.chars().count()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chr_ord() {
        let c = builtin_chr(ArgValues::positional(vec![Value::Int(955)])).unwrap();
        assert_eq!(c.py_str(), "λ");
        assert!(matches!(builtin_ord(ArgValues::positional(vec![c])), Ok(Value::Int(955))));
        assert!(builtin_chr(ArgValues::positional(vec![Value::Int(-1)])).is_err());
        assert!(builtin_ord(ArgValues::positional(vec![Value::Str("ab".into())])).is_err());
    }
}
