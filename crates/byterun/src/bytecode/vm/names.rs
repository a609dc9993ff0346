//! Name resolution: locals, globals, builtins, closure cells and imports.

use std::rc::Rc;

use super::VM;
use crate::{
    exception_private::{ExcType, RunError, RunResult},
    function::Cell,
    io::PrintWriter,
    value::Value,
};

impl<P: PrintWriter> VM<'_, P> {
    /// `LOAD_NAME`: locals, then globals, then builtins.
    pub(super) fn load_name(&mut self, name: &str) -> RunResult<()> {
        let frame = self.frame()?;
        let value = frame
            .locals
            .get(name)
            .or_else(|| frame.globals.get(name))
            .or_else(|| frame.builtins.get(name))
            .ok_or_else(|| ExcType::name_error(name))?;
        self.push(value)
    }

    pub(super) fn store_name(&mut self, name: Rc<str>) -> RunResult<()> {
        let value = self.pop()?;
        self.frame()?.locals.set(name, value);
        Ok(())
    }

    pub(super) fn delete_name(&mut self, name: &str) -> RunResult<()> {
        match self.frame()?.locals.remove(name) {
            Some(_) => Ok(()),
            None => Err(ExcType::name_error(name)),
        }
    }

    pub(super) fn load_fast(&mut self, name: &str) -> RunResult<()> {
        let value = self
            .frame()?
            .locals
            .get(name)
            .ok_or_else(|| ExcType::unbound_local_error(name))?;
        self.push(value)
    }

    pub(super) fn store_fast(&mut self, name: Rc<str>) -> RunResult<()> {
        self.store_name(name)
    }

    pub(super) fn delete_fast(&mut self, name: &str) -> RunResult<()> {
        match self.frame()?.locals.remove(name) {
            Some(_) => Ok(()),
            None => Err(ExcType::unbound_local_error(name)),
        }
    }

    /// `LOAD_GLOBAL`: globals, then builtins.
    pub(super) fn load_global(&mut self, name: &str) -> RunResult<()> {
        let frame = self.frame()?;
        let value = frame
            .globals
            .get(name)
            .or_else(|| frame.builtins.get(name))
            .ok_or_else(|| ExcType::name_error(name))?;
        self.push(value)
    }

    pub(super) fn store_global(&mut self, name: Rc<str>) -> RunResult<()> {
        let value = self.pop()?;
        self.frame()?.globals.set(name, value);
        Ok(())
    }

    pub(super) fn delete_global(&mut self, name: &str) -> RunResult<()> {
        match self.frame()?.globals.remove(name) {
            Some(_) => Ok(()),
            None => Err(ExcType::name_error(name)),
        }
    }

    fn cell(&self, name: &str) -> RunResult<Rc<Cell>> {
        let frame = self.frame()?;
        frame.cells.get(name).cloned().ok_or_else(|| {
            RunError::internal(format!("no cell for '{name}' in '{}'", frame.code.name()))
        })
    }

    /// `LOAD_DEREF`: an empty cell is an unassigned local when the cell is this frame's own,
    /// and an unassigned free variable otherwise.
    pub(super) fn load_deref(&mut self, name: &str) -> RunResult<()> {
        let cell = self.cell(name)?;
        match cell.get() {
            Some(value) => self.push(value),
            None => {
                let own = self.frame()?.code.cellvars().iter().any(|n| n.as_ref() == name);
                Err(if own {
                    ExcType::unbound_local_error(name)
                } else {
                    ExcType::name_error_free_variable(name)
                })
            }
        }
    }

    pub(super) fn store_deref(&mut self, name: &str) -> RunResult<()> {
        let value = self.pop()?;
        self.cell(name)?.set(value);
        Ok(())
    }

    /// `LOAD_CLOSURE`: pushes the cell itself, to be collected into a closure tuple.
    pub(super) fn load_closure(&mut self, name: &str) -> RunResult<()> {
        let cell = self.cell(name)?;
        self.push(Value::Cell(cell))
    }

    /// `LOAD_LOCALS`: pushes a snapshot of the local bindings as a dict.
    pub(super) fn load_locals(&mut self) -> RunResult<()> {
        let locals = self.frame()?.locals.to_dict();
        self.push(Value::dict(locals))
    }

    /// `IMPORT_NAME`: stack `level, fromlist`.
    ///
    /// Without a fromlist, `import a.b` binds the top-level module `a`, so that is what is
    /// pushed; with one, the named module itself is.
    pub(super) fn import_name(&mut self, name: &str) -> RunResult<()> {
        let [_level, fromlist] = self.pop_array()?;
        let module = self
            .modules
            .get(name)
            .cloned()
            .ok_or_else(|| ExcType::module_not_found(name))?;
        let module = match (fromlist, name.split_once('.')) {
            (Value::None, Some((top, _))) => self
                .modules
                .get(top)
                .cloned()
                .ok_or_else(|| ExcType::module_not_found(top))?,
            _ => module,
        };
        self.push(Value::Module(module))
    }

    /// `IMPORT_FROM`: reads `name` from the module on top of the stack, leaving the module
    /// in place. Registered submodules are found too.
    pub(super) fn import_from(&mut self, name: &str) -> RunResult<()> {
        let Value::Module(module) = self.top()? else {
            return Err(RunError::internal("IMPORT_FROM without a module on the stack"));
        };
        let value = match module.namespace().get(name) {
            Some(value) => value,
            None => {
                let qualified = format!("{}.{name}", module.name());
                match self.modules.get(qualified.as_str()) {
                    Some(submodule) => Value::Module(submodule.clone()),
                    None => return Err(ExcType::cannot_import_name(name, module.name())),
                }
            }
        };
        self.push(value)
    }

    /// `IMPORT_STAR`: binds every public name of the popped module into the locals.
    pub(super) fn import_star(&mut self) -> RunResult<()> {
        let Value::Module(module) = self.pop()? else {
            return Err(RunError::internal("IMPORT_STAR without a module on the stack"));
        };
        let locals = self.frame()?.locals.clone();
        for (name, value) in module.namespace().entries() {
            if !name.starts_with('_') {
                locals.set(name, value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bytecode::{CodeBuilder, Const, Opcode},
        io::NoPrint,
        namespace::Namespace,
        Value, VM,
    };

    fn import_code(name: &str, fromlist: Const) -> CodeBuilder {
        let mut b = CodeBuilder::new("<module>");
        b.load_const(Const::Int(0)).load_const(fromlist).emit_name(Opcode::ImportName, name);
        b
    }

    #[test]
    fn test_import_dotted_binds_top_level() {
        let mut b = import_code("pkg.sub", Const::None);
        b.emit(Opcode::ReturnValue);
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        vm.register_module("pkg", Namespace::new());
        vm.register_module("pkg.sub", Namespace::new());
        let module = vm.run_code(b.build().unwrap(), Namespace::new_module("__main__")).unwrap();
        assert_eq!(module.py_repr(), "<module 'pkg'>");
    }

    #[test]
    fn test_import_from_and_star() {
        let library = Namespace::new();
        library.set("answer", Value::Int(42));
        library.set("_hidden", Value::Int(0));

        let mut b = import_code("lib", Const::Tuple(vec![Const::Str("answer".into())]));
        b.emit_name(Opcode::ImportFrom, "answer")
            .emit_name(Opcode::StoreName, "answer")
            .emit(Opcode::ImportStar)
            .load_const(Const::None)
            .emit(Opcode::ReturnValue);
        let globals = Namespace::new_module("__main__");
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        vm.register_module("lib", library);
        vm.run_code(b.build().unwrap(), globals.clone()).unwrap();
        assert!(matches!(globals.get("answer"), Some(Value::Int(42))));
        assert!(!globals.contains("_hidden"));
    }

    #[test]
    fn test_missing_module() {
        let mut b = import_code("nowhere", Const::None);
        b.emit(Opcode::ReturnValue);
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let err = vm.run_code(b.build().unwrap(), Namespace::new_module("__main__")).unwrap_err();
        assert_eq!(err.exception().unwrap().summary(), "ModuleNotFoundError: No module named 'nowhere'");
    }
}
