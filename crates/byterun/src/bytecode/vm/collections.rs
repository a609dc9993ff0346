//! Container builders, sequence unpacking and the comprehension helpers.

use super::VM;
use crate::{
    exception_private::{ExcType, RunError, RunResult},
    io::PrintWriter,
    types::{Dict, Set, Slice},
    value::Value,
};

impl<P: PrintWriter> VM<'_, P> {
    pub(super) fn build_tuple(&mut self, count: usize) -> RunResult<()> {
        let items = self.pop_n(count)?;
        self.push(Value::tuple(items))
    }

    pub(super) fn build_list(&mut self, count: usize) -> RunResult<()> {
        let items = self.pop_n(count)?;
        self.push(Value::list(items))
    }

    pub(super) fn build_set(&mut self, count: usize) -> RunResult<()> {
        let items = self.pop_n(count)?;
        self.push(Value::set(Set::from_values(items)?))
    }

    /// `BUILD_MAP(n)`: pushes an empty dict; `n` is only a size hint and the entries
    /// arrive through `STORE_MAP`.
    pub(super) fn build_map(&mut self, size_hint: usize) -> RunResult<()> {
        self.push(Value::dict(Dict::with_capacity(size_hint)))
    }

    /// `STORE_MAP`: stack `dict, value, key`; stores the entry and leaves the dict on top.
    pub(super) fn store_map(&mut self) -> RunResult<()> {
        let [value, key] = self.pop_array()?;
        match self.top()? {
            Value::Dict(dict) => dict.borrow_mut().set(key, value),
            other => Err(RunError::internal(format!("STORE_MAP target is not a dict: {other:?}"))),
        }
    }

    pub(super) fn build_slice(&mut self, count: u32) -> RunResult<()> {
        let slice = match count {
            2 => {
                let [start, stop] = self.pop_array()?;
                Slice::from_values(&start, &stop, &Value::None)?
            }
            3 => {
                let [start, stop, step] = self.pop_array()?;
                Slice::from_values(&start, &stop, &step)?
            }
            other => return Err(RunError::internal(format!("strange BUILD_SLICE count: {other}"))),
        };
        self.push(Value::Slice(slice))
    }

    /// `UNPACK_SEQUENCE(n)`: pushes the items in reverse so the first ends up on top.
    pub(super) fn unpack_sequence(&mut self, count: usize) -> RunResult<()> {
        let seq = self.pop()?;
        let items = match &seq {
            Value::Tuple(items) => items.as_ref().clone(),
            Value::List(items) => items.borrow().clone(),
            _ => self.collect_iter(seq)?,
        };
        if items.len() != count {
            return Err(ExcType::value_error_unpack(count, items.len()));
        }
        for item in items.into_iter().rev() {
            self.push(item)?;
        }
        Ok(())
    }

    /// `LIST_APPEND(i)`: appends the popped value to the list `i` entries down.
    pub(super) fn list_append(&mut self, depth: usize) -> RunResult<()> {
        let value = self.pop()?;
        match self.peek(depth)? {
            Value::List(items) => {
                items.borrow_mut().push(value);
                Ok(())
            }
            other => Err(RunError::internal(format!("LIST_APPEND target is not a list: {other:?}"))),
        }
    }

    pub(super) fn set_add(&mut self, depth: usize) -> RunResult<()> {
        let value = self.pop()?;
        match self.peek(depth)? {
            Value::Set(set) => set.borrow_mut().add(value).map(|_| ()),
            other => Err(RunError::internal(format!("SET_ADD target is not a set: {other:?}"))),
        }
    }

    /// `MAP_ADD(i)`: stack `..., value, key`; stores into the dict `i` entries down.
    pub(super) fn map_add(&mut self, depth: usize) -> RunResult<()> {
        let [value, key] = self.pop_array()?;
        match self.peek(depth)? {
            Value::Dict(dict) => dict.borrow_mut().set(key, value),
            other => Err(RunError::internal(format!("MAP_ADD target is not a dict: {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bytecode::{CodeBuilder, Const, Opcode},
        io::NoPrint,
        namespace::Namespace,
        VM,
    };

    fn run(build: impl FnOnce(&mut CodeBuilder)) -> String {
        let mut b = CodeBuilder::new("<module>");
        build(&mut b);
        b.emit(Opcode::ReturnValue);
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let value = vm.run_code(b.build().unwrap(), Namespace::new_module("__main__")).unwrap();
        value.py_repr().into_owned()
    }

    #[test]
    fn test_store_map() {
        let repr = run(|b| {
            b.emit_arg(Opcode::BuildMap, 2)
                .load_const(Const::Int(1))
                .load_const(Const::Str("k".into()))
                .emit(Opcode::StoreMap)
                .load_const(Const::None)
                .load_const(Const::Int(2))
                .emit(Opcode::StoreMap);
        });
        assert_eq!(repr, "{'k': 1, 2: None}");
    }

    #[test]
    fn test_unpack_order() {
        let repr = run(|b| {
            b.load_const(Const::Tuple(vec![Const::Int(1), Const::Int(2)]))
                .emit_arg(Opcode::UnpackSequence, 2)
                .emit_arg(Opcode::BuildList, 2);
        });
        assert_eq!(repr, "[2, 1]");
    }

    #[test]
    fn test_list_append_peeks() {
        // the list sits below the comprehension's iterator
        let repr = run(|b| {
            b.emit_arg(Opcode::BuildList, 0)
                .load_const(Const::None)
                .load_const(Const::Int(7))
                .emit_arg(Opcode::ListAppend, 2)
                .emit(Opcode::PopTop);
        });
        assert_eq!(repr, "[7]");
    }
}
