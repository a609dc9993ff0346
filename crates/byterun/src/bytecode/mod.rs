//! Bytecode representation and virtual machine.
//!
//! # Module Structure
//!
//! - `op` - Opcode enum and the operator tables' keys
//! - `code` - Code object containing bytecode and metadata, plus the instruction decoder
//! - `builder` - CodeBuilder for assembling code objects
//! - `vm` - Virtual machine for bytecode execution

mod builder;
mod code;
mod op;
pub(crate) mod vm;

pub use builder::{BuildError, CodeBuilder, Label};
pub use code::{Code, CodeFlags, Const, Instruction, Operand};
pub use op::{BinaryOp, CompareOp, InvalidOpcodeError, Opcode, UnaryOp, HAVE_ARGUMENT};
pub(crate) use vm::methods::MethodName;
pub use vm::{GeneratorState, VmOptions, VM};
