//! Routing of decoded instructions to their handlers.

use super::VM;
use crate::{
    builtins::Builtin,
    bytecode::{CompareOp, Instruction, Opcode, Operand},
    exception_private::{RunError, RunResult},
    frame::{BlockType, Why},
    io::PrintWriter,
    value::Value,
};

impl<P: PrintWriter> VM<'_, P> {
    /// Executes one instruction, returning why the run loop should stop, if it should.
    ///
    /// The unary, binary and in-place families share one handler each, parameterised by the
    /// operator. Everything else has its own handler.
    pub(super) fn dispatch(&mut self, instruction: Instruction) -> RunResult<Why> {
        let Instruction { opcode, operand } = instruction;
        if let Some(op) = opcode.unary_op() {
            self.unary_operator(op)?;
            return Ok(Why::None);
        }
        if let Some((op, inplace)) = opcode.binary_op() {
            self.binary_operator(op, inplace)?;
            return Ok(Why::None);
        }

        match opcode {
            // === Stack manipulation ===
            Opcode::Nop => {}
            Opcode::PopTop => {
                self.pop()?;
            }
            Opcode::RotTwo => self.rotate(2)?,
            Opcode::RotThree => self.rotate(3)?,
            Opcode::RotFour => self.rotate(4)?,
            Opcode::DupTop => {
                let top = self.top()?;
                self.push(top)?;
            }
            Opcode::DupTopTwo => self.dup_top_n(2)?,
            Opcode::DupTopx => self.dup_top_n(operand.count()? as usize)?,
            Opcode::GenStart => {
                self.pop()?;
            }

            // === Names ===
            Opcode::LoadConst => match operand {
                Operand::Const(value) => self.push(value)?,
                other => return Err(RunError::internal(format!("LOAD_CONST with operand {other:?}"))),
            },
            Opcode::LoadName => self.load_name(&operand.name()?)?,
            Opcode::StoreName => self.store_name(operand.name()?)?,
            Opcode::DeleteName => self.delete_name(&operand.name()?)?,
            Opcode::LoadFast => self.load_fast(&operand.name()?)?,
            Opcode::StoreFast => self.store_fast(operand.name()?)?,
            Opcode::DeleteFast => self.delete_fast(&operand.name()?)?,
            Opcode::LoadGlobal => self.load_global(&operand.name()?)?,
            Opcode::StoreGlobal => self.store_global(operand.name()?)?,
            Opcode::DeleteGlobal => self.delete_global(&operand.name()?)?,
            Opcode::LoadDeref => self.load_deref(&operand.name()?)?,
            Opcode::StoreDeref => self.store_deref(&operand.name()?)?,
            Opcode::LoadClosure => self.load_closure(&operand.name()?)?,
            Opcode::LoadLocals => self.load_locals()?,

            // === Attributes and subscripts ===
            Opcode::LoadAttr => {
                let obj = self.pop()?;
                let value = self.load_attr(&obj, &operand.name()?)?;
                self.push(value)?;
            }
            Opcode::StoreAttr => {
                let obj = self.pop()?;
                let value = self.pop()?;
                self.store_attr(&obj, &operand.name()?, value)?;
            }
            Opcode::DeleteAttr => {
                let obj = self.pop()?;
                self.delete_attr(&obj, &operand.name()?)?;
            }
            Opcode::StoreSubscr => {
                let [value, obj, key] = self.pop_array()?;
                self.store_subscr(&obj, key, value)?;
            }
            Opcode::DeleteSubscr => {
                let [obj, key] = self.pop_array()?;
                self.delete_subscr(&obj, &key)?;
            }

            // === Builders ===
            Opcode::BuildTuple => self.build_tuple(operand.count()? as usize)?,
            Opcode::BuildList => self.build_list(operand.count()? as usize)?,
            Opcode::BuildSet => self.build_set(operand.count()? as usize)?,
            Opcode::BuildMap => self.build_map(operand.count()? as usize)?,
            Opcode::StoreMap => self.store_map()?,
            Opcode::BuildSlice => self.build_slice(operand.count()?)?,
            Opcode::UnpackSequence => self.unpack_sequence(operand.count()? as usize)?,
            Opcode::ListAppend => self.list_append(operand.count()? as usize)?,
            Opcode::SetAdd => self.set_add(operand.count()? as usize)?,
            Opcode::MapAdd => self.map_add(operand.count()? as usize)?,

            // === Comparison ===
            Opcode::CompareOp => {
                let index = operand.count()?;
                let op = u8::try_from(index)
                    .ok()
                    .and_then(CompareOp::from_repr)
                    .ok_or_else(|| RunError::internal(format!("unknown comparison {index}")))?;
                let [lhs, rhs] = self.pop_array()?;
                let result = self.compare(op, &lhs, &rhs)?;
                self.push(result)?;
            }

            // === Jumps ===
            Opcode::JumpForward | Opcode::JumpAbsolute => self.jump(operand.jump()?)?,
            Opcode::PopJumpIfTrue => {
                let value = self.pop()?;
                if self.py_truthy(&value)? {
                    self.jump(operand.jump()?)?;
                }
            }
            Opcode::PopJumpIfFalse => {
                let value = self.pop()?;
                if !self.py_truthy(&value)? {
                    self.jump(operand.jump()?)?;
                }
            }
            Opcode::JumpIfTrueOrPop => {
                let value = self.top()?;
                if self.py_truthy(&value)? {
                    self.jump(operand.jump()?)?;
                } else {
                    self.pop()?;
                }
            }
            Opcode::JumpIfFalseOrPop => {
                let value = self.top()?;
                if self.py_truthy(&value)? {
                    self.pop()?;
                } else {
                    self.jump(operand.jump()?)?;
                }
            }
            Opcode::JumpIfTrue => {
                let value = self.top()?;
                if self.py_truthy(&value)? {
                    self.jump(operand.jump()?)?;
                }
            }
            Opcode::JumpIfFalse => {
                let value = self.top()?;
                if !self.py_truthy(&value)? {
                    self.jump(operand.jump()?)?;
                }
            }

            // === Blocks ===
            Opcode::SetupLoop => self.setup_block(BlockType::Loop, operand.jump()?)?,
            Opcode::SetupExcept => self.setup_block(BlockType::SetupExcept, operand.jump()?)?,
            Opcode::SetupFinally => self.setup_block(BlockType::Finally, operand.jump()?)?,
            Opcode::SetupWith => self.setup_with(operand.jump()?)?,
            Opcode::PopBlock => {
                self.frame_mut()?.pop_block()?;
            }
            Opcode::PopExcept => self.pop_except()?,
            Opcode::BreakLoop => return Ok(Why::Break),
            Opcode::ContinueLoop => {
                let target = operand.jump()?;
                self.frame_mut()?.return_value = Value::from_len(target);
                return Ok(Why::Continue);
            }
            Opcode::EndFinally => return self.end_finally(),
            Opcode::WithCleanup => self.with_cleanup()?,
            Opcode::RaiseVarargs => return self.raise_varargs(operand.count()?),

            // === Functions and calls ===
            Opcode::CallFunction => self.call_function(operand.count()?, None, None)?,
            Opcode::CallFunctionVar => {
                let args = self.pop()?;
                self.call_function(operand.count()?, Some(args), None)?;
            }
            Opcode::CallFunctionKw => {
                let kwargs = self.pop()?;
                self.call_function(operand.count()?, None, Some(kwargs))?;
            }
            Opcode::CallFunctionVarKw => {
                let kwargs = self.pop()?;
                let args = self.pop()?;
                self.call_function(operand.count()?, Some(args), Some(kwargs))?;
            }
            Opcode::CallFunctionEx => {
                let kwargs = if operand.count()? & 1 == 1 { Some(self.pop()?) } else { None };
                let args = self.pop()?;
                self.call_function(0, Some(args), kwargs)?;
            }
            Opcode::MakeFunction => self.make_function(operand.count()?, false)?,
            Opcode::MakeClosure => self.make_function(operand.count()?, true)?,
            Opcode::ReturnValue => return self.return_value(),
            Opcode::LoadBuildClass => self.push(Value::Builtin(Builtin::BuildClass))?,

            // === Iteration and generators ===
            Opcode::GetIter => {
                let iterable = self.pop()?;
                let iterator = self.get_iter(iterable)?;
                self.push(iterator)?;
            }
            Opcode::ForIter => self.for_iter(operand.jump()?)?,
            Opcode::YieldValue => {
                let value = self.pop()?;
                self.frame_mut()?.return_value = value;
                return Ok(Why::Yield);
            }
            Opcode::YieldFrom => return self.yield_from(),

            // === Output and imports ===
            Opcode::PrintExpr => {
                let value = self.pop()?;
                self.print_expr(&value)?;
            }
            Opcode::ImportName => self.import_name(&operand.name()?)?,
            Opcode::ImportFrom => self.import_from(&operand.name()?)?,
            Opcode::ImportStar => self.import_star()?,

            Opcode::Cache | Opcode::Resume | Opcode::ExtendedArg => {
                return Err(RunError::internal(format!("{opcode} reached dispatch")));
            }
            // operator families are routed above
            _ => return Err(RunError::internal(format!("unknown instruction {opcode}"))),
        }
        Ok(Why::None)
    }

    /// Pops a fixed number of entries, bottom to top.
    pub(super) fn pop_array<const N: usize>(&mut self) -> RunResult<[Value; N]> {
        let values = self.pop_n(N)?;
        <[Value; N]>::try_from(values).map_err(|_| RunError::internal("operand stack underflow"))
    }

    /// Moves the top of the stack below the next `n - 1` entries.
    fn rotate(&mut self, n: usize) -> RunResult<()> {
        let stack = &mut self.frame_mut()?.stack;
        let start = stack
            .len()
            .checked_sub(n)
            .ok_or_else(|| RunError::internal("operand stack underflow"))?;
        stack[start..].rotate_right(1);
        Ok(())
    }

    fn dup_top_n(&mut self, n: usize) -> RunResult<()> {
        let stack = &mut self.frame_mut()?.stack;
        let start = stack
            .len()
            .checked_sub(n)
            .ok_or_else(|| RunError::internal("operand stack underflow"))?;
        stack.extend_from_within(start..);
        Ok(())
    }

    /// `RETURN_VALUE`: generator frames also mark their generator finished.
    fn return_value(&mut self) -> RunResult<Why> {
        let value = self.pop()?;
        let frame = self.frame_mut()?;
        frame.return_value = value;
        if let Some(generator) = frame.generator.as_ref().and_then(std::rc::Weak::upgrade) {
            generator.borrow_mut().finished = true;
        }
        Ok(Why::Return)
    }
}
