//! Implementation of the hash() and id() builtin functions.

use crate::{
    args::ArgValues,
    bytecode::VM,
    exception_private::RunResult,
    io::PrintWriter,
    types::dict::HashKey,
    value::Value,
};

/// Hashes by the same key dicts and sets use, so `hash(1) == hash(1.0) == hash(True)`.
pub(super) fn builtin_hash<P: PrintWriter>(vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
    let value = args.get_one_arg("hash")?;
    if let Some(result) = vm.call_special(&value, "__hash__", Vec::new())? {
        return Ok(result);
    }
    Ok(Value::Int(HashKey::new(&value)?.py_hash()))
}

pub(super) fn builtin_id(args: ArgValues) -> RunResult<Value> {
    let value = args.get_one_arg("id")?;
    Ok(Value::from_len(value.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::NoPrint;

    #[test]
    fn test_hash_numeric_equivalence() {
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let mut hash = |value: Value| builtin_hash(&mut vm, ArgValues::positional(vec![value])).unwrap().py_repr();
        assert_eq!(hash(Value::Int(1)), hash(Value::Float(1.0)));
        assert_eq!(hash(Value::Bool(true)), "1");
        assert!(builtin_hash(&mut vm, ArgValues::positional(vec![Value::list(vec![])])).is_err());
    }
}
