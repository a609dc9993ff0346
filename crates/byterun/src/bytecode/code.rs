//! Compiled units: bytecode plus the tables its operands index into.

use std::{ops::BitOr, rc::Rc};

use serde::{Deserialize, Serialize};

use super::op::Opcode;
use crate::{
    exception_private::{RunError, RunResult},
    value::Value,
};

/// Flags of a code object, as in `co_flags`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFlags(u32);

impl CodeFlags {
    pub const OPTIMIZED: Self = Self(0x01);
    pub const NEWLOCALS: Self = Self(0x02);
    /// The function collects excess positional arguments (`*args`).
    pub const VARARGS: Self = Self(0x04);
    /// The function collects excess keyword arguments (`**kwargs`).
    pub const VARKEYWORDS: Self = Self(0x08);
    pub const NESTED: Self = Self(0x10);
    /// Calling the function creates a generator instead of running the body.
    pub const GENERATOR: Self = Self(0x20);

    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn has_varargs(self) -> bool {
        self.contains(Self::VARARGS)
    }

    #[must_use]
    pub fn has_varkeywords(self) -> bool {
        self.contains(Self::VARKEYWORDS)
    }

    #[must_use]
    pub fn is_generator(self) -> bool {
        self.contains(Self::GENERATOR)
    }
}

impl BitOr for CodeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// An entry of the constant pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Const {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Tuple(Vec<Const>),
    /// A nested code object, e.g. a function body.
    Code(Rc<Code>),
    Ellipsis,
}

impl Const {
    /// The runtime value `LOAD_CONST` pushes for this constant.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::None => Value::None,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Float(f) => Value::Float(*f),
            Self::Str(s) => Value::Str(s.clone()),
            Self::Tuple(items) => Value::tuple(items.iter().map(Self::to_value).collect()),
            Self::Code(code) => Value::Code(code.clone()),
            Self::Ellipsis => Value::Ellipsis,
        }
    }
}

/// The decoded operand of an instruction, resolved against the code object's tables.
#[derive(Debug, Clone)]
pub enum Operand {
    None,
    /// `LOAD_CONST`: the constant itself.
    Const(Value),
    /// A name from `names`, `varnames` or `cellvars ++ freevars`, depending on the opcode.
    Name(Rc<str>),
    /// An absolute bytecode offset.
    Jump(usize),
    /// Any other integer operand: counts, flags, comparison index.
    Count(u32),
}

impl Operand {
    pub(crate) fn name(&self) -> RunResult<Rc<str>> {
        match self {
            Self::Name(name) => Ok(name.clone()),
            other => Err(RunError::internal(format!("expected a name operand, got {other:?}"))),
        }
    }

    pub(crate) fn jump(&self) -> RunResult<usize> {
        match self {
            Self::Jump(target) => Ok(*target),
            other => Err(RunError::internal(format!("expected a jump operand, got {other:?}"))),
        }
    }

    pub(crate) fn count(&self) -> RunResult<u32> {
        match self {
            Self::Count(count) => Ok(*count),
            other => Err(RunError::internal(format!("expected a count operand, got {other:?}"))),
        }
    }
}

/// One decoded instruction. Immutable once decoded.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Operand,
}

/// A compiled unit: bytecode, constant pool, name tables and metadata.
///
/// Immutable and shared by reference across every frame executing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub(crate) name: Rc<str>,
    pub(crate) filename: Rc<str>,
    pub(crate) first_line: u32,
    pub(crate) bytecode: Vec<u8>,
    pub(crate) constants: Vec<Const>,
    /// Global and attribute names.
    pub(crate) names: Vec<Rc<str>>,
    /// Local variable names; parameters come first.
    pub(crate) varnames: Vec<Rc<str>>,
    /// Locals captured by nested functions.
    pub(crate) cellvars: Vec<Rc<str>>,
    /// Variables captured from enclosing functions.
    pub(crate) freevars: Vec<Rc<str>>,
    pub(crate) arg_count: u16,
    pub(crate) kwonly_arg_count: u16,
    pub(crate) flags: CodeFlags,
    /// `(byte offset delta, line delta)` pairs.
    pub(crate) line_table: Vec<(u8, i8)>,
}

impl Code {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn first_line(&self) -> u32 {
        self.first_line
    }

    #[must_use]
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    #[must_use]
    pub fn constants(&self) -> &[Const] {
        &self.constants
    }

    #[must_use]
    pub fn names(&self) -> &[Rc<str>] {
        &self.names
    }

    #[must_use]
    pub fn varnames(&self) -> &[Rc<str>] {
        &self.varnames
    }

    #[must_use]
    pub fn cellvars(&self) -> &[Rc<str>] {
        &self.cellvars
    }

    #[must_use]
    pub fn freevars(&self) -> &[Rc<str>] {
        &self.freevars
    }

    #[must_use]
    pub fn arg_count(&self) -> u16 {
        self.arg_count
    }

    #[must_use]
    pub fn kwonly_arg_count(&self) -> u16 {
        self.kwonly_arg_count
    }

    #[must_use]
    pub fn flags(&self) -> CodeFlags {
        self.flags
    }

    /// Decodes the instruction at `ip`, returning it with the offset of the next instruction.
    ///
    /// `EXTENDED_ARG` prefixes are folded into the operand, and the no-op `CACHE` and
    /// `RESUME` markers are skipped here so they never reach dispatch.
    pub(crate) fn decode(&self, mut ip: usize) -> RunResult<(Instruction, usize)> {
        let mut extended: u32 = 0;
        loop {
            let byte = *self
                .bytecode
                .get(ip)
                .ok_or_else(|| RunError::internal(format!("instruction pointer {ip} past end of '{}'", self.name)))?;
            let opcode = Opcode::try_from(byte)
                .map_err(|err| RunError::internal(format!("unknown instruction: {err} at offset {ip}")))?;
            ip += 1;
            let arg = if opcode.has_arg() {
                let bytes = self
                    .bytecode
                    .get(ip..ip + 2)
                    .ok_or_else(|| RunError::internal(format!("truncated operand at offset {ip}")))?;
                ip += 2;
                (extended << 16) | u32::from(u16::from_le_bytes([bytes[0], bytes[1]]))
            } else {
                0
            };
            match opcode {
                Opcode::ExtendedArg => {
                    extended = arg;
                    continue;
                }
                Opcode::Cache | Opcode::Resume => {
                    extended = 0;
                    continue;
                }
                _ => {}
            }
            let operand = self.resolve_operand(opcode, arg, ip)?;
            return Ok((Instruction { opcode, operand }, ip));
        }
    }

    fn resolve_operand(&self, opcode: Opcode, arg: u32, next_ip: usize) -> RunResult<Operand> {
        if !opcode.has_arg() {
            return Ok(Operand::None);
        }
        let index = arg as usize;
        let out_of_range = || RunError::internal(format!("{opcode} operand {arg} out of range in '{}'", self.name));
        let operand = match opcode {
            Opcode::LoadConst => Operand::Const(self.constants.get(index).ok_or_else(out_of_range)?.to_value()),
            Opcode::StoreName
            | Opcode::DeleteName
            | Opcode::LoadName
            | Opcode::StoreAttr
            | Opcode::DeleteAttr
            | Opcode::LoadAttr
            | Opcode::StoreGlobal
            | Opcode::DeleteGlobal
            | Opcode::LoadGlobal
            | Opcode::ImportName
            | Opcode::ImportFrom => Operand::Name(self.names.get(index).ok_or_else(out_of_range)?.clone()),
            Opcode::LoadFast | Opcode::StoreFast | Opcode::DeleteFast => {
                Operand::Name(self.varnames.get(index).ok_or_else(out_of_range)?.clone())
            }
            Opcode::LoadClosure | Opcode::LoadDeref | Opcode::StoreDeref => {
                Operand::Name(self.cell_or_free_name(index).ok_or_else(out_of_range)?.clone())
            }
            op if op.is_relative_jump() => Operand::Jump(next_ip + index),
            op if op.is_absolute_jump() => Operand::Jump(index),
            _ => Operand::Count(arg),
        };
        Ok(operand)
    }

    /// Indexes the concatenation `cellvars ++ freevars`.
    fn cell_or_free_name(&self, index: usize) -> Option<&Rc<str>> {
        match index.checked_sub(self.cellvars.len()) {
            None => self.cellvars.get(index),
            Some(free_index) => self.freevars.get(free_index),
        }
    }

    /// Source line of the instruction starting at byte offset `lasti`.
    ///
    /// Accumulates the line table's deltas until the accumulated byte offset exceeds `lasti`.
    #[must_use]
    pub fn line_for_offset(&self, lasti: usize) -> u32 {
        let mut line = i64::from(self.first_line);
        let mut addr = 0usize;
        for &(byte_delta, line_delta) in &self.line_table {
            addr += usize::from(byte_delta);
            if addr > lasti {
                break;
            }
            line += i64::from(line_delta);
        }
        u32::try_from(line).unwrap_or(0)
    }

    /// Serializes the code object to a binary format.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes a code object produced by [`Code::dump`].
    ///
    /// # Errors
    /// Returns an error if the bytes are not a valid serialized code object.
    pub fn load(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::CodeBuilder;

    fn code_with(bytecode: Vec<u8>, line_table: Vec<(u8, i8)>) -> Code {
        let mut code = CodeBuilder::new("t").build().unwrap();
        code.bytecode = bytecode;
        code.line_table = line_table;
        code.names = vec!["x".into()];
        code.cellvars = vec!["c".into()];
        code.freevars = vec!["f".into()];
        code
    }

    #[test]
    fn test_decode_operands() {
        let code = code_with(
            vec![
                Opcode::LoadName as u8, 0, 0,
                Opcode::JumpForward as u8, 2, 0,
                Opcode::LoadDeref as u8, 1, 0,
                Opcode::PopTop as u8,
            ],
            vec![],
        );
        let (instr, next) = code.decode(0).unwrap();
        assert_eq!(instr.opcode, Opcode::LoadName);
        assert!(matches!(instr.operand, Operand::Name(ref n) if n.as_ref() == "x"));
        assert_eq!(next, 3);

        let (instr, next) = code.decode(next).unwrap();
        assert!(matches!(instr.operand, Operand::Jump(8)));

        let (instr, next) = code.decode(next).unwrap();
        assert!(matches!(instr.operand, Operand::Name(ref n) if n.as_ref() == "f"));

        let (instr, next) = code.decode(next).unwrap();
        assert_eq!(instr.opcode, Opcode::PopTop);
        assert_eq!(next, 10);
    }

    #[test]
    fn test_decode_extended_arg_and_markers() {
        let code = code_with(
            vec![
                Opcode::Nop as u8,
                Opcode::Resume as u8, 0, 0,
                Opcode::ExtendedArg as u8, 1, 0,
                Opcode::JumpAbsolute as u8, 2, 0,
            ],
            vec![],
        );
        let (instr, next) = code.decode(1).unwrap();
        assert_eq!(instr.opcode, Opcode::JumpAbsolute);
        assert!(matches!(instr.operand, Operand::Jump(0x1_0002)));
        assert_eq!(next, 10);
    }

    #[test]
    fn test_decode_defects() {
        let code = code_with(vec![13, Opcode::LoadConst as u8, 9, 0], vec![]);
        assert!(matches!(code.decode(0), Err(RunError::Internal(_))));
        assert!(matches!(code.decode(1), Err(RunError::Internal(_))));
        assert!(matches!(code.decode(4), Err(RunError::Internal(_))));
    }

    #[test]
    fn test_line_for_offset() {
        let mut code = code_with(vec![], vec![(0, 1), (6, 2), (4, -1)]);
        code.first_line = 10;
        assert_eq!(code.line_for_offset(0), 11);
        assert_eq!(code.line_for_offset(5), 11);
        assert_eq!(code.line_for_offset(6), 13);
        assert_eq!(code.line_for_offset(10), 12);
    }

    #[test]
    fn test_dump_load() {
        let mut builder = CodeBuilder::new("<module>");
        builder.load_const(Const::Tuple(vec![Const::Int(1), Const::Str("a".into())]));
        builder.emit(Opcode::ReturnValue);
        let code = builder.build().unwrap();
        let bytes = code.dump().unwrap();
        assert_eq!(Code::load(&bytes).unwrap(), code);
    }
}
