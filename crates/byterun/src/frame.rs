//! Activation records.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use ahash::AHashMap;
use strum::Display;

use crate::{
    bytecode::Code,
    exception_private::{RunError, RunResult},
    exception_public::StackFrame,
    function::Cell,
    generator::Generator,
    namespace::Namespace,
    value::Value,
};

/// Why the run loop stopped executing instructions one after another.
///
/// Every handler returns one of these; anything but `None` is processed by the frame's
/// block stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Why {
    None,
    Break,
    Continue,
    Return,
    Yield,
    Exception,
    /// An exception re-raised by `END_FINALLY` or a bare `raise`; treated as `Exception`
    /// after the reporter has been skipped.
    Reraise,
}

/// Kind of a control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum BlockType {
    Loop,
    SetupExcept,
    /// `SETUP_FINALLY` and `SETUP_WITH`.
    Finally,
    /// An exception is being handled; three extra stack entries above `level` hold the
    /// exception state saved when the handler was entered.
    ExceptHandler,
}

/// A control block pushed by `SETUP_*` and popped by `POP_BLOCK` or unwinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
    pub kind: BlockType,
    /// Where execution resumes when the block handles a reason.
    pub handler: usize,
    /// Operand stack depth when the block was pushed.
    pub level: usize,
}

/// One activation record: a code object being executed with its bindings and stacks.
#[derive(Debug)]
pub(crate) struct Frame {
    pub code: Rc<Code>,
    pub globals: Namespace,
    /// Function frames own a fresh namespace; module frames share the globals.
    pub locals: Namespace,
    pub builtins: Namespace,
    pub stack: Vec<Value>,
    /// Offset of the next instruction.
    pub ip: usize,
    /// Offset of the instruction being executed, used for line numbers.
    pub instr_start: usize,
    /// Cells of this frame's `cellvars` and `freevars`, by name.
    pub cells: AHashMap<Rc<str>, Rc<Cell>>,
    pub block_stack: Vec<Block>,
    /// Value being returned, or the target of a pending `continue`.
    pub return_value: Value,
    /// Back-reference to the generator owning this frame, for generator frames.
    pub generator: Option<Weak<RefCell<Generator>>>,
}

impl Frame {
    /// Builds the frame for `code`.
    ///
    /// Builtins are inherited from the caller when both share globals; otherwise they come
    /// from `globals["__builtins__"]` if present, falling back to `default_builtins`.
    ///
    /// Cells are created for `cellvars` (initialised from matching locals, such as captured
    /// parameters) and published into the caller's cell table. Free variables come from
    /// `closure` when the function carries one, otherwise from the caller's cell table; a
    /// free variable found in neither means the code is inconsistent with its lexical
    /// context, an engine defect.
    pub fn new(
        code: Rc<Code>,
        globals: Namespace,
        locals: Namespace,
        caller: Option<&mut Frame>,
        closure: Option<&[Value]>,
        default_builtins: &Namespace,
    ) -> RunResult<Self> {
        let builtins = match &caller {
            Some(caller) if caller.globals.ptr_eq(&globals) => caller.builtins.clone(),
            _ => match globals.get("__builtins__") {
                Some(Value::Dict(dict)) => Namespace::from_dict(&dict.borrow()),
                Some(Value::Module(module)) => module.namespace().clone(),
                _ => default_builtins.clone(),
            },
        };

        let mut cells = AHashMap::new();
        let mut caller = caller;
        for name in code.cellvars() {
            let cell = Rc::new(Cell::new(locals.get(name)));
            if let Some(caller) = caller.as_deref_mut() {
                caller.cells.insert(name.clone(), cell.clone());
            }
            cells.insert(name.clone(), cell);
        }
        for (i, name) in code.freevars().iter().enumerate() {
            let cell = match closure {
                Some(closure) => match closure.get(i) {
                    Some(Value::Cell(cell)) => cell.clone(),
                    _ => {
                        return Err(RunError::internal(format!(
                            "closure of '{}' has no cell for free variable '{name}'",
                            code.name()
                        )))
                    }
                },
                None => caller
                    .as_deref()
                    .and_then(|caller| caller.cells.get(name).cloned())
                    .ok_or_else(|| {
                        RunError::internal(format!(
                            "free variable '{name}' of '{}' not found in enclosing scope",
                            code.name()
                        ))
                    })?,
            };
            cells.insert(name.clone(), cell);
        }

        Ok(Self {
            code,
            globals,
            locals,
            builtins,
            stack: Vec::new(),
            ip: 0,
            instr_start: 0,
            cells,
            block_stack: Vec::new(),
            return_value: Value::None,
            generator: None,
        })
    }

    /// Source line of the instruction being executed.
    pub fn line(&self) -> u32 {
        self.code.line_for_offset(self.instr_start)
    }

    /// Traceback entry for the current position.
    pub fn stack_frame(&self) -> StackFrame {
        StackFrame {
            filename: self.code.filename().to_owned(),
            line: self.line(),
            name: self.code.name().to_owned(),
        }
    }

    pub fn push_block(&mut self, kind: BlockType, handler: usize, level: usize) {
        self.block_stack.push(Block { kind, handler, level });
    }

    pub fn pop_block(&mut self) -> RunResult<Block> {
        self.block_stack
            .pop()
            .ok_or_else(|| RunError::internal("POP_BLOCK with an empty block stack"))
    }
}
