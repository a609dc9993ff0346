#![doc = include_str!("../../../README.md")]
mod args;
mod builtins;
mod bytecode;
mod exception_private;
mod exception_public;
mod for_iterator;
mod frame;
mod function;
mod generator;
mod io;
mod namespace;
mod signature;
mod types;
mod value;

pub use crate::{
    args::ArgValues,
    builtins::Builtin,
    bytecode::{
        BinaryOp, BuildError, Code, CodeBuilder, CodeFlags, CompareOp, Const, GeneratorState, Instruction,
        InvalidOpcodeError, Label, Opcode, Operand, UnaryOp, VmOptions, HAVE_ARGUMENT, VM,
    },
    exception_private::ExcType,
    exception_public::{ByterunException, ExecError, StackFrame},
    function::{Cell, Function, NativeFunction},
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    namespace::{Module, Namespace},
    types::{Dict, Set, Type},
    value::Value,
};
