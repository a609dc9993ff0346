//! Assembler for code objects.
//!
//! Front ends (and the tests) emit instructions through `CodeBuilder`, which interns
//! constants and names into the code object's tables, patches forward jumps once their
//! labels are placed, and records the line table.

use std::{fmt, rc::Rc};

use super::{
    code::{Code, CodeFlags, Const},
    op::{CompareOp, Opcode},
};

/// A jump target, placed with [`CodeBuilder::place`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Errors detected while assembling a code object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A jump refers to a label that was never placed.
    UnplacedLabel(usize),
    /// A jump target does not fit in a 16-bit operand.
    JumpTooFar(usize),
    /// A closure instruction names a variable that is neither a cell nor a free variable.
    UnknownDeref(String),
    /// An opcode was emitted through a helper that cannot encode it.
    BadOpcode(Opcode),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnplacedLabel(label) => write!(f, "label {label} was never placed"),
            Self::JumpTooFar(target) => write!(f, "jump target {target} does not fit in an operand"),
            Self::UnknownDeref(name) => write!(f, "'{name}' is not a cell or free variable"),
            Self::BadOpcode(op) => write!(f, "{op} cannot be emitted with a name operand"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Builds a [`Code`] instruction by instruction.
///
/// Parameters must be declared (`set_params`, then `set_kwonly_params`, `set_varargs` and
/// `set_varkeywords`) before any `*_FAST` instruction interns another local name, so that
/// parameters take the first `varnames` slots.
#[derive(Debug)]
pub struct CodeBuilder {
    code: Code,
    labels: Vec<Option<usize>>,
    /// `(operand offset, label, relative)` for every jump awaiting its target.
    patches: Vec<(usize, Label, bool)>,
    line_offset: usize,
    line: i64,
    error: Option<BuildError>,
}

impl CodeBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            code: Code {
                name: name.into(),
                filename: "<string>".into(),
                first_line: 1,
                bytecode: Vec::new(),
                constants: Vec::new(),
                names: Vec::new(),
                varnames: Vec::new(),
                cellvars: Vec::new(),
                freevars: Vec::new(),
                arg_count: 0,
                kwonly_arg_count: 0,
                flags: CodeFlags::default(),
                line_table: Vec::new(),
            },
            labels: Vec::new(),
            patches: Vec::new(),
            line_offset: 0,
            line: 1,
            error: None,
        }
    }

    pub fn set_filename(&mut self, filename: &str) -> &mut Self {
        self.code.filename = filename.into();
        self
    }

    pub fn set_first_line(&mut self, line: u32) -> &mut Self {
        self.code.first_line = line;
        self.line = i64::from(line);
        self
    }

    /// Declares the positional-or-keyword parameters.
    pub fn set_params(&mut self, params: &[&str]) -> &mut Self {
        self.code.arg_count = u16::try_from(params.len()).unwrap_or(u16::MAX);
        self.code.varnames.extend(params.iter().map(|p| Rc::from(*p)));
        self.code.flags = self.code.flags | CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS;
        self
    }

    pub fn set_kwonly_params(&mut self, params: &[&str]) -> &mut Self {
        self.code.kwonly_arg_count = u16::try_from(params.len()).unwrap_or(u16::MAX);
        self.code.varnames.extend(params.iter().map(|p| Rc::from(*p)));
        self
    }

    /// Declares a `*name` parameter.
    pub fn set_varargs(&mut self, name: &str) -> &mut Self {
        self.code.varnames.push(name.into());
        self.add_flags(CodeFlags::VARARGS)
    }

    /// Declares a `**name` parameter.
    pub fn set_varkeywords(&mut self, name: &str) -> &mut Self {
        self.code.varnames.push(name.into());
        self.add_flags(CodeFlags::VARKEYWORDS)
    }

    pub fn add_flags(&mut self, flags: CodeFlags) -> &mut Self {
        self.code.flags = self.code.flags | flags;
        self
    }

    /// Declares locals of this code that nested functions capture.
    pub fn set_cellvars(&mut self, names: &[&str]) -> &mut Self {
        self.code.cellvars = names.iter().map(|n| Rc::from(*n)).collect();
        self
    }

    /// Declares variables this code captures from an enclosing function.
    pub fn set_freevars(&mut self, names: &[&str]) -> &mut Self {
        self.code.freevars = names.iter().map(|n| Rc::from(*n)).collect();
        self.add_flags(CodeFlags::NESTED)
    }

    /// Current bytecode offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.code.bytecode.len()
    }

    /// Marks the following instructions as coming from source line `line`.
    pub fn set_line(&mut self, line: u32) -> &mut Self {
        let line = i64::from(line);
        let mut byte_delta = self.offset() - self.line_offset;
        let mut line_delta = line - self.line;
        if line_delta == 0 {
            return self;
        }
        while byte_delta > usize::from(u8::MAX) {
            self.code.line_table.push((u8::MAX, 0));
            byte_delta -= usize::from(u8::MAX);
        }
        while line_delta > i64::from(i8::MAX) || line_delta < i64::from(i8::MIN) {
            let step = line_delta.clamp(i64::from(i8::MIN), i64::from(i8::MAX));
            self.code.line_table.push((byte_delta as u8, step as i8));
            byte_delta = 0;
            line_delta -= step;
        }
        self.code.line_table.push((byte_delta as u8, line_delta as i8));
        self.line_offset = self.offset();
        self.line = line;
        self
    }

    /// Emits an instruction without an operand.
    pub fn emit(&mut self, opcode: Opcode) -> &mut Self {
        if opcode.has_arg() {
            self.emit_arg(opcode, 0)
        } else {
            self.code.bytecode.push(opcode as u8);
            self
        }
    }

    /// Emits an instruction with an integer operand, prefixed by `EXTENDED_ARG` when the
    /// operand needs more than 16 bits.
    pub fn emit_arg(&mut self, opcode: Opcode, arg: u32) -> &mut Self {
        if arg > u32::from(u16::MAX) {
            self.push_instr(Opcode::ExtendedArg, (arg >> 16) as u16);
        }
        self.push_instr(opcode, (arg & 0xffff) as u16);
        self
    }

    fn push_instr(&mut self, opcode: Opcode, arg: u16) {
        self.code.bytecode.push(opcode as u8);
        if opcode.has_arg() {
            self.code.bytecode.extend_from_slice(&arg.to_le_bytes());
        }
    }

    #[must_use]
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Places `label` at the current offset.
    pub fn place(&mut self, label: Label) -> &mut Self {
        self.labels[label.0] = Some(self.offset());
        self
    }

    /// Emits a jump (or block setup) to `label`, patched when the code is built.
    pub fn emit_jump(&mut self, opcode: Opcode, label: Label) -> &mut Self {
        if !opcode.is_relative_jump() && !opcode.is_absolute_jump() {
            self.error.get_or_insert(BuildError::BadOpcode(opcode));
            return self;
        }
        self.push_instr(opcode, 0);
        self.patches.push((self.offset() - 2, label, opcode.is_relative_jump()));
        self
    }

    /// Adds a constant to the pool and emits `LOAD_CONST` for it.
    pub fn load_const(&mut self, constant: Const) -> &mut Self {
        let index = self.add_const(constant);
        self.emit_arg(Opcode::LoadConst, index)
    }

    /// Adds a constant to the pool, returning its index.
    pub fn add_const(&mut self, constant: Const) -> u32 {
        self.code.constants.push(constant);
        u32::try_from(self.code.constants.len() - 1).unwrap_or(u32::MAX)
    }

    /// Emits an instruction whose operand is a name, interning the name in the table the
    /// opcode indexes: `varnames` for `*_FAST`, `cellvars ++ freevars` for closures, and
    /// `names` otherwise.
    pub fn emit_name(&mut self, opcode: Opcode, name: &str) -> &mut Self {
        let index = match opcode {
            Opcode::LoadFast | Opcode::StoreFast | Opcode::DeleteFast => intern(&mut self.code.varnames, name),
            Opcode::LoadClosure | Opcode::LoadDeref | Opcode::StoreDeref => {
                let code = &self.code;
                let position = code
                    .cellvars
                    .iter()
                    .chain(&code.freevars)
                    .position(|n| n.as_ref() == name);
                match position {
                    Some(index) => index,
                    None => {
                        self.error.get_or_insert(BuildError::UnknownDeref(name.to_owned()));
                        return self;
                    }
                }
            }
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
            | Opcode::ImportFrom => intern(&mut self.code.names, name),
            other => {
                self.error.get_or_insert(BuildError::BadOpcode(other));
                return self;
            }
        };
        self.emit_arg(opcode, u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Emits `CALL_FUNCTION` with the packed positional and keyword counts.
    pub fn call_function(&mut self, positional: u8, keyword: u8) -> &mut Self {
        self.emit_arg(Opcode::CallFunction, u32::from(keyword) << 8 | u32::from(positional))
    }

    pub fn compare_op(&mut self, op: CompareOp) -> &mut Self {
        self.emit_arg(Opcode::CompareOp, op as u32)
    }

    /// Resolves jumps and returns the finished code object.
    pub fn build(mut self) -> Result<Code, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        for (operand_at, label, relative) in std::mem::take(&mut self.patches) {
            let target = self.labels[label.0].ok_or(BuildError::UnplacedLabel(label.0))?;
            let value = if relative {
                target
                    .checked_sub(operand_at + 2)
                    .ok_or(BuildError::JumpTooFar(target))?
            } else {
                target
            };
            let value = u16::try_from(value).map_err(|_| BuildError::JumpTooFar(target))?;
            self.code.bytecode[operand_at..operand_at + 2].copy_from_slice(&value.to_le_bytes());
        }
        Ok(self.code)
    }
}

fn intern(table: &mut Vec<Rc<str>>, name: &str) -> usize {
    match table.iter().position(|n| n.as_ref() == name) {
        Some(index) => index,
        None => {
            table.push(name.into());
            table.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Operand;

    #[test]
    fn test_forward_jump_patching() {
        let mut b = CodeBuilder::new("t");
        let end = b.new_label();
        b.emit_jump(Opcode::JumpForward, end);
        b.emit(Opcode::Nop);
        b.place(end);
        b.emit_jump(Opcode::JumpAbsolute, end);
        let code = b.build().unwrap();
        let (instr, next) = code.decode(0).unwrap();
        assert!(matches!(instr.operand, Operand::Jump(4)));
        assert_eq!(next, 3);
        let (instr, _) = code.decode(4).unwrap();
        assert!(matches!(instr.operand, Operand::Jump(4)));
    }

    #[test]
    fn test_unplaced_label() {
        let mut b = CodeBuilder::new("t");
        let label = b.new_label();
        b.emit_jump(Opcode::JumpAbsolute, label);
        assert_eq!(b.build().unwrap_err(), BuildError::UnplacedLabel(0));
    }

    #[test]
    fn test_name_tables() {
        let mut b = CodeBuilder::new("f");
        b.set_params(&["a"]).set_cellvars(&["c"]).set_freevars(&["free"]);
        b.emit_name(Opcode::LoadFast, "a");
        b.emit_name(Opcode::StoreFast, "tmp");
        b.emit_name(Opcode::LoadGlobal, "len");
        b.emit_name(Opcode::LoadDeref, "free");
        let code = b.build().unwrap();
        assert_eq!(code.varnames().len(), 2);
        assert_eq!(code.names()[0].as_ref(), "len");
        let (instr, _) = code.decode(9).unwrap();
        assert!(matches!(instr.operand, Operand::Name(ref n) if n.as_ref() == "free"));

        let mut b = CodeBuilder::new("f");
        b.emit_name(Opcode::LoadDeref, "missing");
        assert!(matches!(b.build(), Err(BuildError::UnknownDeref(_))));
    }

    #[test]
    fn test_line_markers() {
        let mut b = CodeBuilder::new("t");
        b.set_first_line(5);
        b.set_line(6).emit(Opcode::Nop).emit(Opcode::Nop);
        b.set_line(8).emit(Opcode::Nop);
        let code = b.build().unwrap();
        assert_eq!(code.line_for_offset(0), 6);
        assert_eq!(code.line_for_offset(1), 6);
        assert_eq!(code.line_for_offset(2), 8);
    }

    #[test]
    fn test_extended_arg() {
        let mut b = CodeBuilder::new("t");
        b.emit_arg(Opcode::BuildTuple, 0x2_0001);
        let code = b.build().unwrap();
        let (instr, next) = code.decode(0).unwrap();
        assert_eq!(instr.opcode, Opcode::BuildTuple);
        assert!(matches!(instr.operand, Operand::Count(0x2_0001)));
        assert_eq!(next, 6);
    }
}
