//! Bytecode virtual machine for executing compiled units.
//!
//! The VM owns the frame stack. Each frame owns its own operand stack, instruction pointer
//! and block stack. The run loop decodes one instruction at a time, dispatches it to a
//! handler, and feeds the handler's [`Why`] through the frame's block stack.
//!
//! Calls recurse: a call instruction runs the callee's frame to completion (or to its first
//! suspension, for generators) inside the handler, so the Rust call stack mirrors the frame
//! stack.

mod attr;
mod binary;
mod blocks;
mod call;
mod collections;
mod compare;
mod dispatch;
mod exceptions;
mod format;
mod iter;
pub(crate) mod methods;
mod names;

pub(crate) use binary::floor_divmod;
pub(crate) use compare::{is_instance, is_subclass};

use std::{cell::RefCell, mem, rc::Rc};

use ahash::AHashMap;
use log::{debug, trace};

use crate::{
    args::ArgValues,
    builtins::default_builtins,
    bytecode::{Code, Instruction},
    exception_private::{ExcType, ExceptionRaise, RunError, RunResult},
    exception_public::ExecError,
    frame::{Frame, Why},
    generator::Generator,
    io::PrintWriter,
    namespace::{Module, Namespace},
    value::Value,
};

/// Host stack left when a frame starts before more is allocated.
const STACK_RED_ZONE: usize = 256 * 1024;
/// Size of each host stack segment allocated for nested frames.
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// Deepest frame stack allowed; pushing beyond it raises `RecursionError`.
    pub max_recursion_depth: usize,
    /// Write a diagnostic report to `stderr_write` whenever an exception is raised.
    pub report_exceptions: bool,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: 1000,
            report_exceptions: true,
        }
    }
}

/// Outcome of resuming a generator.
#[derive(Debug, Clone)]
pub enum GeneratorState {
    /// The generator suspended at a yield, producing this value.
    Yielded(Value),
    /// The generator is exhausted; carries its return value.
    Complete(Value),
}

/// How a frame stopped running.
#[derive(Debug)]
pub(crate) enum FrameExit {
    Return(Value),
    /// The frame suspended and can be resumed later.
    Yield(Value),
}

/// An exception as the `(type, value, traceback)` triple that except handlers receive on
/// the operand stack.
#[derive(Debug, Clone)]
pub(crate) struct ExcInfo {
    pub exc_type: Value,
    pub value: Value,
    pub traceback: Value,
}

impl ExcInfo {
    fn from_raise(raise: ExceptionRaise) -> Self {
        Self {
            exc_type: raise.value.type_value(),
            traceback: Value::Traceback(Rc::new(raise.traceback)),
            value: raise.value,
        }
    }

    /// Rebuilds the raise for propagation out of a frame, keeping the traceback collected so far.
    fn to_raise(&self) -> ExceptionRaise {
        let traceback = match &self.traceback {
            Value::Traceback(frames) => frames.as_ref().clone(),
            _ => Vec::new(),
        };
        ExceptionRaise {
            value: self.value.clone(),
            traceback,
        }
    }
}

/// The bytecode virtual machine.
///
/// Holds the frame stack, the default builtins, the modules available to `import`, the
/// exception being raised and the one being handled. Output goes through the borrowed [`PrintWriter`].
pub struct VM<'p, P: PrintWriter> {
    frames: Vec<Frame>,
    builtins: Namespace,
    modules: AHashMap<Rc<str>, Rc<Module>>,
    /// The exception travelling through the block stack.
    last_exception: Option<ExcInfo>,
    /// The exception an except handler is running for; what a bare `raise` re-raises.
    handled_exception: Option<ExcInfo>,
    print_writer: &'p mut P,
    options: VmOptions,
}

impl<'p, P: PrintWriter> VM<'p, P> {
    pub fn new(print_writer: &'p mut P) -> Self {
        Self::with_options(print_writer, VmOptions::default())
    }

    pub fn with_options(print_writer: &'p mut P, options: VmOptions) -> Self {
        Self {
            frames: Vec::with_capacity(16),
            builtins: default_builtins(),
            modules: AHashMap::new(),
            last_exception: None,
            handled_exception: None,
            print_writer,
            options,
        }
    }

    /// Builtins used by frames whose globals carry no `__builtins__` of their own.
    #[must_use]
    pub fn builtins(&self) -> &Namespace {
        &self.builtins
    }

    #[must_use]
    pub fn options(&self) -> VmOptions {
        self.options
    }

    pub(crate) fn print_writer(&mut self) -> &mut P {
        &mut *self.print_writer
    }

    /// Makes a module importable by `IMPORT_NAME`.
    pub fn register_module(&mut self, name: &str, namespace: Namespace) {
        let name: Rc<str> = name.into();
        if !namespace.contains("__name__") {
            namespace.set("__name__", Value::Str(name.clone()));
        }
        self.modules.insert(name.clone(), Rc::new(Module::new(&name, namespace)));
    }

    /// Runs a compiled module with `globals` as both its globals and locals.
    ///
    /// Returns the value the code returns. After a normal return the frame stack and the
    /// module frame's operand stack must both be empty; anything left over is an engine
    /// defect.
    pub fn run_code(&mut self, code: impl Into<Rc<Code>>, globals: Namespace) -> Result<Value, ExecError> {
        let frame = Frame::new(code.into(), globals.clone(), globals, None, None, &self.builtins)?;
        let (frame, exit) = self.run_frame(frame)?;
        if !self.frames.is_empty() {
            return Err(ExecError::Internal("Frames left over!".to_owned()));
        }
        if !frame.stack.is_empty() {
            return Err(ExecError::Internal("Data remains on stack!".to_owned()));
        }
        match exit {
            FrameExit::Return(value) => Ok(value),
            FrameExit::Yield(_) => Err(ExecError::Internal("module code yielded".to_owned())),
        }
    }

    /// Calls any callable value with the host calling convention.
    pub fn call(&mut self, callable: &Value, args: ArgValues) -> Result<Value, ExecError> {
        Ok(self.call_value(callable.clone(), args)?)
    }

    /// Sends `value` into a generator, running it to its next yield or to completion.
    pub fn resume_generator(&mut self, generator: &Value, value: Value) -> Result<GeneratorState, ExecError> {
        match generator {
            Value::Generator(generator) => Ok(self.resume(generator, value)?),
            other => Err(ExcType::type_error(format!("'{}' object is not a generator", other.type_name())).into()),
        }
    }

    /// Pushes `frame`, runs it until it returns, yields or raises, and pops it again.
    ///
    /// The frame is handed back on success so suspended generator frames can be stored.
    pub(crate) fn run_frame(&mut self, frame: Frame) -> RunResult<(Frame, FrameExit)> {
        if self.frames.len() >= self.options.max_recursion_depth {
            return Err(ExcType::recursion_error());
        }
        debug!("enter frame '{}' at depth {}", frame.code.name(), self.frames.len() + 1);
        self.frames.push(frame);
        // each interpreted call nests run_frame again, so deep recursion needs more host
        // stack than the thread started with
        let outcome = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.execute());
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| RunError::internal("frame stack emptied while a frame was running"))?;
        match &outcome {
            Ok(FrameExit::Return(_)) => debug!("exit frame '{}': return", frame.code.name()),
            Ok(FrameExit::Yield(_)) => debug!("suspend frame '{}'", frame.code.name()),
            Err(_) => debug!("exit frame '{}': exception", frame.code.name()),
        }
        outcome.map(|exit| (frame, exit))
    }

    /// The run loop of the innermost frame.
    fn execute(&mut self) -> RunResult<FrameExit> {
        loop {
            let instruction = self.fetch()?;
            let mut why = match self.dispatch(instruction) {
                Ok(why) => why,
                Err(RunError::Exc(raise)) => self.catch(raise)?,
                Err(internal) => return Err(internal),
            };
            if why == Why::Reraise {
                why = Why::Exception;
            }
            if why != Why::None && why != Why::Yield {
                why = self.unwind(why)?;
            }
            match why {
                Why::None => {}
                Why::Yield => {
                    let frame = self.frame_mut()?;
                    return Ok(FrameExit::Yield(mem::replace(&mut frame.return_value, Value::None)));
                }
                Why::Return => {
                    let frame = self.frame_mut()?;
                    return Ok(FrameExit::Return(mem::replace(&mut frame.return_value, Value::None)));
                }
                Why::Exception | Why::Reraise => {
                    return Err(match &self.last_exception {
                        Some(info) => RunError::Exc(info.to_raise()),
                        None => RunError::internal("exception reason without an active exception"),
                    })
                }
                Why::Break | Why::Continue => {
                    return Err(RunError::internal(format!("'{why}' outside of a loop")));
                }
            }
        }
    }

    /// Decodes the instruction at the current frame's instruction pointer and advances past it.
    fn fetch(&mut self) -> RunResult<Instruction> {
        let frame = self.frame_mut()?;
        let start = frame.ip;
        let (instruction, next) = frame.code.decode(start)?;
        frame.instr_start = start;
        frame.ip = next;
        trace!(
            "{}:{start} {} {:?} stack={} blocks={}",
            frame.code.name(),
            instruction.opcode,
            instruction.operand,
            frame.stack.len(),
            frame.block_stack.len()
        );
        Ok(instruction)
    }

    /// Records an exception raised by a handler as the one being handled.
    ///
    /// The current frame joins the traceback. An exception with an empty traceback was
    /// raised right here rather than propagated from a callee, so it is the one reported.
    fn catch(&mut self, mut raise: ExceptionRaise) -> RunResult<Why> {
        let fresh = raise.traceback.is_empty();
        let frame = self.frame()?;
        raise.traceback.push(frame.stack_frame());
        debug!("{} raised in '{}'", raise.value.type_name(), frame.code.name());
        if fresh && self.options.report_exceptions {
            self.report_exception(&raise);
        }
        self.last_exception = Some(ExcInfo::from_raise(raise));
        Ok(Why::Exception)
    }

    // === Operand stack primitives, all on the current frame ===

    pub(crate) fn frame(&self) -> RunResult<&Frame> {
        self.frames.last().ok_or_else(|| RunError::internal("no frame is executing"))
    }

    pub(crate) fn frame_mut(&mut self) -> RunResult<&mut Frame> {
        self.frames.last_mut().ok_or_else(|| RunError::internal("no frame is executing"))
    }

    pub(crate) fn push(&mut self, value: Value) -> RunResult<()> {
        self.frame_mut()?.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> RunResult<Value> {
        self.pop_at(0)
    }

    /// Removes and returns the entry `depth` places below the top; `pop_at(0)` is `pop`.
    pub(crate) fn pop_at(&mut self, depth: usize) -> RunResult<Value> {
        let stack = &mut self.frame_mut()?.stack;
        let index = stack
            .len()
            .checked_sub(depth + 1)
            .ok_or_else(|| RunError::internal("operand stack underflow"))?;
        Ok(stack.remove(index))
    }

    /// Returns the entry at 1-based `depth`: `peek(1)` is the top of the stack.
    pub(crate) fn peek(&self, depth: usize) -> RunResult<Value> {
        let stack = &self.frame()?.stack;
        stack
            .len()
            .checked_sub(depth)
            .and_then(|index| stack.get(index))
            .cloned()
            .ok_or_else(|| RunError::internal("operand stack underflow"))
    }

    pub(crate) fn top(&self) -> RunResult<Value> {
        self.peek(1)
    }

    /// Pops `n` entries, returned bottom to top.
    pub(crate) fn pop_n(&mut self, n: usize) -> RunResult<Vec<Value>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let stack = &mut self.frame_mut()?.stack;
        let start = stack
            .len()
            .checked_sub(n)
            .ok_or_else(|| RunError::internal("operand stack underflow"))?;
        Ok(stack.split_off(start))
    }

    pub(crate) fn jump(&mut self, target: usize) -> RunResult<()> {
        self.frame_mut()?.ip = target;
        Ok(())
    }

    /// Resumes a generator's suspended frame with `value` pushed onto its operand stack.
    pub(crate) fn resume(&mut self, generator: &Rc<RefCell<Generator>>, value: Value) -> RunResult<GeneratorState> {
        let frame = {
            let mut state = generator.borrow_mut();
            if state.finished {
                return Ok(GeneratorState::Complete(Value::None));
            }
            if !state.started && !matches!(value, Value::None) {
                return Err(ExcType::send_non_none_to_fresh_generator());
            }
            let Some(mut frame) = state.frame.take() else {
                return Err(ExcType::generator_already_executing());
            };
            frame.stack.push(value);
            state.started = true;
            debug!("resume generator '{}'", state.name());
            frame
        };
        match self.run_frame(frame) {
            Ok((frame, exit)) => {
                let mut state = generator.borrow_mut();
                let value = match exit {
                    FrameExit::Yield(value) | FrameExit::Return(value) => value,
                };
                if state.finished {
                    Ok(GeneratorState::Complete(value))
                } else {
                    state.frame = Some(frame);
                    Ok(GeneratorState::Yielded(value))
                }
            }
            Err(err) => {
                generator.borrow_mut().close();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytecode::{CodeBuilder, Const, Opcode},
        io::NoPrint,
    };

    #[test]
    fn test_stack_primitives() {
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let code = Rc::new(CodeBuilder::new("<module>").build().unwrap());
        let globals = Namespace::new_module("__main__");
        let frame = Frame::new(code, globals.clone(), globals, None, None, &vm.builtins).unwrap();
        vm.frames.push(frame);
        for i in 1..=4 {
            vm.push(Value::Int(i)).unwrap();
        }
        assert!(matches!(vm.peek(1).unwrap(), Value::Int(4)));
        assert!(matches!(vm.pop_at(1).unwrap(), Value::Int(3)));
        let popped: Vec<_> = vm.pop_n(2).unwrap().iter().map(|v| v.py_repr().into_owned()).collect();
        assert_eq!(popped, ["2", "4"]);
        assert!(vm.pop_n(0).unwrap().is_empty());
        assert!(matches!(vm.pop().unwrap(), Value::Int(1)));
        assert!(matches!(vm.pop(), Err(RunError::Internal(_))));
    }

    #[test]
    fn test_leftover_stack_is_a_defect() {
        let mut b = CodeBuilder::new("<module>");
        b.load_const(Const::Int(1)).load_const(Const::None).emit(Opcode::ReturnValue);
        let mut writer = NoPrint;
        let mut vm = VM::new(&mut writer);
        let err = vm.run_code(b.build().unwrap(), Namespace::new_module("__main__")).unwrap_err();
        assert_eq!(err.to_string(), "internal interpreter error: Data remains on stack!");
    }

    #[test]
    fn test_recursion_limit() {
        // def f(): return f()
        let mut body = CodeBuilder::new("f");
        body.emit_name(Opcode::LoadGlobal, "f")
            .call_function(0, 0)
            .emit(Opcode::ReturnValue);
        let body = body.build().unwrap();

        let mut module = CodeBuilder::new("<module>");
        module
            .load_const(Const::Code(Rc::new(body)))
            .load_const(Const::Str("f".into()))
            .emit_arg(Opcode::MakeFunction, 0)
            .emit_name(Opcode::StoreName, "f")
            .emit_name(Opcode::LoadName, "f")
            .call_function(0, 0)
            .emit(Opcode::ReturnValue);

        let mut writer = NoPrint;
        let options = VmOptions {
            max_recursion_depth: 20,
            report_exceptions: false,
        };
        let mut vm = VM::with_options(&mut writer, options);
        let err = vm
            .run_code(module.build().unwrap(), Namespace::new_module("__main__"))
            .unwrap_err();
        let exc = err.exception().unwrap();
        assert_eq!(exc.type_name(), "RecursionError");
        assert_eq!(exc.traceback().len(), 20);
        assert!(vm.frames.is_empty());
    }
}
