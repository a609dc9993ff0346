//! Control blocks: setup, unwinding, and the finally/with cleanup instructions.
//!
//! Unwinding follows one transition per innermost block:
//!
//! | block               | reason            | action                                            |
//! |---------------------|-------------------|---------------------------------------------------|
//! | loop                | continue          | jump to the target held in `return_value`         |
//! | loop                | break             | pop, unwind, jump to the handler                  |
//! | except or finally   | exception         | pop, unwind, push an except-handler block, the    |
//! |                     |                   | previously handled exception and the raised one,  |
//! |                     |                   | jump to the handler                               |
//! | finally             | any other         | pop, unwind, push `return_value` for return and   |
//! |                     |                   | continue, push the reason, jump to the handler    |
//! | anything else       | any               | pop, unwind, keep the reason                      |

use log::debug;

use super::{ExcInfo, VM};
use crate::{
    args::ArgValues,
    exception_private::{RunError, RunResult},
    frame::{Block, BlockType, Why},
    io::PrintWriter,
    value::Value,
};

/// Stack entries an except-handler block keeps above its level: the saved exception triple.
const EXCEPT_HANDLER_SAVED: usize = 3;

impl<P: PrintWriter> VM<'_, P> {
    pub(super) fn setup_block(&mut self, kind: BlockType, handler: usize) -> RunResult<()> {
        let frame = self.frame_mut()?;
        let level = frame.stack.len();
        frame.push_block(kind, handler, level);
        Ok(())
    }

    /// Lets blocks handle `why` from the innermost outwards until one absorbs it or the
    /// block stack is empty.
    pub(super) fn unwind(&mut self, mut why: Why) -> RunResult<Why> {
        while why != Why::None {
            let Some(block) = self.frame()?.block_stack.last().copied() else {
                break;
            };
            why = self.manage_block(block, why)?;
        }
        Ok(why)
    }

    fn manage_block(&mut self, block: Block, why: Why) -> RunResult<Why> {
        debug!("unwinding {} block for {why}", block.kind);
        if block.kind == BlockType::Loop && why == Why::Continue {
            let target = self.frame()?.return_value.as_int().ok().and_then(|t| usize::try_from(t).ok());
            let target = target.ok_or_else(|| RunError::internal("continue without a target"))?;
            self.jump(target)?;
            return Ok(Why::None);
        }

        self.frame_mut()?.pop_block()?;
        self.unwind_stack(block)?;
        match (block.kind, why) {
            (BlockType::Loop, Why::Break) => {
                self.jump(block.handler)?;
                Ok(Why::None)
            }
            (BlockType::SetupExcept | BlockType::Finally, Why::Exception) => {
                self.setup_block(BlockType::ExceptHandler, 0)?;
                // the saved triple comes back as the handled exception when the
                // except-handler block is unwound; the raised one is what the handler inspects
                let saved = self.handled_exception.take();
                self.push_exception_triple(saved.as_ref())?;
                self.handled_exception = self.last_exception.clone();
                let raised = self.last_exception.clone();
                self.push_exception_triple(raised.as_ref())?;
                self.jump(block.handler)?;
                Ok(Why::None)
            }
            (BlockType::Finally, _) => {
                if matches!(why, Why::Return | Why::Continue) {
                    let value = self.frame()?.return_value.clone();
                    self.push(value)?;
                }
                self.push(Value::Why(why))?;
                self.jump(block.handler)?;
                Ok(Why::None)
            }
            _ => Ok(why),
        }
    }

    /// Pops operand stack entries down to the block's level.
    ///
    /// An except-handler block keeps three more entries, the saved exception triple, which
    /// are popped last and become the handled exception again.
    pub(super) fn unwind_stack(&mut self, block: Block) -> RunResult<()> {
        let is_handler = block.kind == BlockType::ExceptHandler;
        let floor = block.level + if is_handler { EXCEPT_HANDLER_SAVED } else { 0 };
        let stack = &mut self.frame_mut()?.stack;
        if stack.len() < floor {
            return Err(RunError::internal(format!(
                "operand stack below {} block level {}",
                block.kind, block.level
            )));
        }
        stack.truncate(floor);
        if is_handler {
            let [traceback, value, exc_type] = self.pop_array()?;
            self.handled_exception = exc_info(exc_type, value, traceback);
        }
        Ok(())
    }

    /// Pushes an exception as `traceback, value, type` (type on top); three Nones when
    /// there is none.
    fn push_exception_triple(&mut self, info: Option<&ExcInfo>) -> RunResult<()> {
        let (exc_type, value, traceback) = match info {
            Some(info) => (info.exc_type.clone(), info.value.clone(), info.traceback.clone()),
            None => (Value::None, Value::None, Value::None),
        };
        self.push(traceback)?;
        self.push(value)?;
        self.push(exc_type)
    }

    pub(super) fn set_exception(&mut self, exc_type: Value, value: Value, traceback: Value) {
        self.last_exception = exc_info(exc_type, value, traceback);
    }

    pub(super) fn pop_except(&mut self) -> RunResult<()> {
        let block = self.frame_mut()?.pop_block()?;
        if block.kind != BlockType::ExceptHandler {
            return Err(RunError::internal(format!(
                "popped block is not an except handler but {}",
                block.kind
            )));
        }
        self.unwind_stack(block)
    }

    /// `END_FINALLY`: resumes whatever the finally block interrupted.
    pub(super) fn end_finally(&mut self) -> RunResult<Why> {
        match self.pop()? {
            Value::Why(why) => {
                if matches!(why, Why::Return | Why::Continue) {
                    let value = self.pop()?;
                    self.frame_mut()?.return_value = value;
                }
                Ok(why)
            }
            Value::Silenced => {
                self.pop_except()?;
                Ok(Why::None)
            }
            Value::None => Ok(Why::None),
            exc_type if is_exception_class(&exc_type) => {
                let value = self.pop()?;
                let traceback = self.pop()?;
                self.set_exception(exc_type, value, traceback);
                Ok(Why::Reraise)
            }
            other => Err(RunError::internal(format!("confused END_FINALLY: {other:?}"))),
        }
    }

    /// `SETUP_WITH`: pushes the bound `__exit__`, enters the context and pushes a finally
    /// block covering the body, then the value of `__enter__()`.
    pub(super) fn setup_with(&mut self, handler: usize) -> RunResult<()> {
        let manager = self.pop()?;
        let exit = self.load_attr(&manager, "__exit__")?;
        let enter = self.load_attr(&manager, "__enter__")?;
        self.push(exit)?;
        let entered = self.call_value(enter, ArgValues::default())?;
        self.setup_block(BlockType::Finally, handler)?;
        self.push(entered)
    }

    /// `WITH_CLEANUP`: calls `__exit__` for whatever reason the body finished with.
    ///
    /// When the body raised and `__exit__` returns a true value, pushes the silenced marker
    /// so the following `END_FINALLY` discards the exception.
    pub(super) fn with_cleanup(&mut self) -> RunResult<()> {
        let (exit, exc) = match self.top()? {
            Value::None => (self.pop_at(1)?, None),
            Value::Why(why) => {
                let depth = if matches!(why, Why::Return | Why::Continue) { 2 } else { 1 };
                (self.pop_at(depth)?, None)
            }
            top if is_exception_class(&top) => {
                let current: [Value; 3] = self.pop_array()?;
                let saved = self.pop_n(3)?;
                let exit = self.pop()?;
                for value in saved {
                    self.push(value)?;
                }
                self.push(Value::None)?;
                for value in current.iter().cloned() {
                    self.push(value)?;
                }
                // `__exit__` is gone from below the handler's saved triple
                let block = self.frame_mut()?.pop_block()?;
                if block.kind != BlockType::ExceptHandler {
                    return Err(RunError::internal("WITH_CLEANUP outside an except handler"));
                }
                let level = block
                    .level
                    .checked_sub(1)
                    .ok_or_else(|| RunError::internal("except handler level underflow"))?;
                self.frame_mut()?.push_block(BlockType::ExceptHandler, block.handler, level);
                (exit, Some(current))
            }
            other => return Err(RunError::internal(format!("confused WITH_CLEANUP: {other:?}"))),
        };

        let args = match &exc {
            Some([traceback, value, exc_type]) => vec![exc_type.clone(), value.clone(), traceback.clone()],
            None => vec![Value::None, Value::None, Value::None],
        };
        let result = self.call_value(exit, ArgValues::positional(args))?;
        if exc.is_some() && self.py_truthy(&result)? {
            self.push(Value::Silenced)?;
        }
        Ok(())
    }
}

/// True for builtin exception classes and user classes deriving from one.
pub(super) fn is_exception_class(value: &Value) -> bool {
    match value {
        Value::ExcType(_) => true,
        Value::Class(class) => class.exc_base().is_some(),
        _ => false,
    }
}

/// `None` stands for "no exception" in a stacked triple.
fn exc_info(exc_type: Value, value: Value, traceback: Value) -> Option<ExcInfo> {
    match exc_type {
        Value::None => None,
        exc_type => Some(ExcInfo {
            exc_type,
            value,
            traceback,
        }),
    }
}
