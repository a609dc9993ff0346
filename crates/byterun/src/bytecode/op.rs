//! Opcode definitions for the bytecode VM.
//!
//! Bytecode is stored as raw `Vec<u8>`. The `Opcode` enum is a pure discriminant with no
//! data; operands are fetched separately from the byte stream.
//!
//! # Operand Encoding
//!
//! Opcodes numbered below [`HAVE_ARGUMENT`] take no operand and occupy one byte.
//! The rest are followed by a 16-bit little-endian operand. `ExtendedArg` supplies the
//! high 16 bits of the following instruction's operand.

use strum::{Display, FromRepr, IntoStaticStr};

/// First opcode that carries an operand.
pub const HAVE_ARGUMENT: u8 = 90;

/// Opcode discriminant - just identifies the instruction type.
///
/// With `#[repr(u8)]`, each opcode is exactly 1 byte. Uses `strum::FromRepr` for
/// byte-to-opcode conversion.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    /// Inline cache slot, skipped by the decoder.
    Cache = 0,
    PopTop = 1,
    RotTwo = 2,
    RotThree = 3,
    DupTop = 4,
    DupTopTwo = 5,
    RotFour = 6,
    /// First instruction of a generator body: discards the value sent by the first resumption.
    GenStart = 7,
    LoadLocals = 8,
    Nop = 9,

    UnaryPositive = 10,
    UnaryNegative = 11,
    UnaryNot = 12,
    UnaryInvert = 15,

    BinaryMatrixMultiply = 16,
    InplaceMatrixMultiply = 17,
    BinaryPower = 19,
    BinaryMultiply = 20,
    BinaryModulo = 22,
    BinaryAdd = 23,
    BinarySubtract = 24,
    BinarySubscr = 25,
    BinaryFloorDivide = 26,
    BinaryTrueDivide = 27,
    InplaceFloorDivide = 28,
    InplaceTrueDivide = 29,

    /// Stack: `dict, value, key` -> `dict` with `dict[key] = value`.
    StoreMap = 54,
    InplaceAdd = 55,
    InplaceSubtract = 56,
    InplaceMultiply = 57,
    InplaceModulo = 59,
    /// Stack: `value, obj, key` -> `` with `obj[key] = value`.
    StoreSubscr = 60,
    DeleteSubscr = 61,
    BinaryLshift = 62,
    BinaryRshift = 63,
    BinaryAnd = 64,
    BinaryXor = 65,
    BinaryOr = 66,
    InplacePower = 67,
    GetIter = 68,
    PrintExpr = 70,
    LoadBuildClass = 71,
    YieldFrom = 72,
    InplaceLshift = 75,
    InplaceRshift = 76,
    InplaceAnd = 77,
    InplaceXor = 78,
    InplaceOr = 79,
    BreakLoop = 80,
    WithCleanup = 81,
    ReturnValue = 83,
    ImportStar = 84,
    YieldValue = 86,
    PopBlock = 87,
    EndFinally = 88,
    PopExcept = 89,

    // === Opcodes with an operand ===
    StoreName = 90,
    DeleteName = 91,
    UnpackSequence = 92,
    /// Relative jump to the loop exit on exhaustion.
    ForIter = 93,
    StoreAttr = 95,
    DeleteAttr = 96,
    StoreGlobal = 97,
    DeleteGlobal = 98,
    /// Duplicate the top `n` stack entries.
    DupTopx = 99,
    LoadConst = 100,
    LoadName = 101,
    BuildTuple = 102,
    BuildList = 103,
    BuildSet = 104,
    /// Pops `n` key/value pairs (key pushed first).
    BuildMap = 105,
    LoadAttr = 106,
    CompareOp = 107,
    ImportName = 108,
    ImportFrom = 109,
    JumpForward = 110,
    JumpIfFalseOrPop = 111,
    JumpIfTrueOrPop = 112,
    JumpAbsolute = 113,
    PopJumpIfFalse = 114,
    PopJumpIfTrue = 115,
    LoadGlobal = 116,
    ContinueLoop = 119,
    SetupLoop = 120,
    SetupExcept = 121,
    SetupFinally = 122,
    LoadFast = 124,
    StoreFast = 125,
    DeleteFast = 126,
    RaiseVarargs = 130,
    CallFunction = 131,
    MakeFunction = 132,
    BuildSlice = 133,
    MakeClosure = 134,
    LoadClosure = 135,
    LoadDeref = 136,
    StoreDeref = 137,
    CallFunctionVar = 140,
    CallFunctionKw = 141,
    CallFunctionVarKw = 142,
    SetupWith = 143,
    ExtendedArg = 144,
    ListAppend = 145,
    SetAdd = 146,
    MapAdd = 147,
    CallFunctionEx = 149,
    /// Resume marker, skipped by the decoder.
    Resume = 151,
    /// Jump without popping the tested value.
    JumpIfFalse = 152,
    JumpIfTrue = 153,
}

impl Opcode {
    /// True if the opcode is followed by a 16-bit operand.
    #[must_use]
    pub fn has_arg(self) -> bool {
        self as u8 >= HAVE_ARGUMENT
    }

    /// Jump operands are relative to the offset after the instruction.
    #[must_use]
    pub fn is_relative_jump(self) -> bool {
        matches!(
            self,
            Self::JumpForward | Self::ForIter | Self::SetupLoop | Self::SetupExcept | Self::SetupFinally | Self::SetupWith
        )
    }

    /// Jump operands that are absolute byte offsets.
    #[must_use]
    pub fn is_absolute_jump(self) -> bool {
        matches!(
            self,
            Self::JumpAbsolute
                | Self::PopJumpIfFalse
                | Self::PopJumpIfTrue
                | Self::JumpIfFalseOrPop
                | Self::JumpIfTrueOrPop
                | Self::JumpIfFalse
                | Self::JumpIfTrue
                | Self::ContinueLoop
        )
    }

    /// The operator of a `UNARY_*` opcode.
    #[must_use]
    pub fn unary_op(self) -> Option<UnaryOp> {
        let op = match self {
            Self::UnaryPositive => UnaryOp::Positive,
            Self::UnaryNegative => UnaryOp::Negative,
            Self::UnaryNot => UnaryOp::Not,
            Self::UnaryInvert => UnaryOp::Invert,
            _ => return None,
        };
        Some(op)
    }

    /// The operator of a `BINARY_*` or `INPLACE_*` opcode, and whether it is the in-place form.
    #[must_use]
    pub fn binary_op(self) -> Option<(BinaryOp, bool)> {
        let op = match self {
            Self::BinaryPower => (BinaryOp::Power, false),
            Self::BinaryMultiply => (BinaryOp::Multiply, false),
            Self::BinaryMatrixMultiply => (BinaryOp::MatrixMultiply, false),
            Self::BinaryFloorDivide => (BinaryOp::FloorDivide, false),
            Self::BinaryTrueDivide => (BinaryOp::TrueDivide, false),
            Self::BinaryModulo => (BinaryOp::Modulo, false),
            Self::BinaryAdd => (BinaryOp::Add, false),
            Self::BinarySubtract => (BinaryOp::Subtract, false),
            Self::BinarySubscr => (BinaryOp::Subscr, false),
            Self::BinaryLshift => (BinaryOp::Lshift, false),
            Self::BinaryRshift => (BinaryOp::Rshift, false),
            Self::BinaryAnd => (BinaryOp::And, false),
            Self::BinaryXor => (BinaryOp::Xor, false),
            Self::BinaryOr => (BinaryOp::Or, false),
            Self::InplacePower => (BinaryOp::Power, true),
            Self::InplaceMultiply => (BinaryOp::Multiply, true),
            Self::InplaceMatrixMultiply => (BinaryOp::MatrixMultiply, true),
            Self::InplaceFloorDivide => (BinaryOp::FloorDivide, true),
            Self::InplaceTrueDivide => (BinaryOp::TrueDivide, true),
            Self::InplaceModulo => (BinaryOp::Modulo, true),
            Self::InplaceAdd => (BinaryOp::Add, true),
            Self::InplaceSubtract => (BinaryOp::Subtract, true),
            Self::InplaceLshift => (BinaryOp::Lshift, true),
            Self::InplaceRshift => (BinaryOp::Rshift, true),
            Self::InplaceAnd => (BinaryOp::And, true),
            Self::InplaceXor => (BinaryOp::Xor, true),
            Self::InplaceOr => (BinaryOp::Or, true),
            _ => return None,
        };
        Some(op)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = InvalidOpcodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_repr(byte).ok_or(InvalidOpcodeError(byte))
    }
}

/// Error returned when attempting to convert an invalid byte to an Opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidOpcodeError(pub u8);

impl std::fmt::Display for InvalidOpcodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid opcode byte: {}", self.0)
    }
}

impl std::error::Error for InvalidOpcodeError {}

/// Operators of the `UNARY_*` family, an index into the unary operator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
    Invert,
}

/// Operators of the `BINARY_*`/`INPLACE_*` families, an index into the binary operator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Power,
    Multiply,
    MatrixMultiply,
    FloorDivide,
    TrueDivide,
    Modulo,
    Add,
    Subtract,
    Subscr,
    Lshift,
    Rshift,
    And,
    Xor,
    Or,
}

impl BinaryOp {
    /// Operator symbol for error messages, e.g. `+` in "unsupported operand type(s) for +".
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Power => "** or pow()",
            Self::Multiply => "*",
            Self::MatrixMultiply => "@",
            Self::FloorDivide => "//",
            Self::TrueDivide => "/",
            Self::Modulo => "%",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Subscr => "[]",
            Self::Lshift => "<<",
            Self::Rshift => ">>",
            Self::And => "&",
            Self::Xor => "^",
            Self::Or => "|",
        }
    }

    /// Names of the dunder methods implementing the operator on user classes:
    /// `(normal, reflected, in-place)`.
    #[must_use]
    pub fn dunders(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Power => ("__pow__", "__rpow__", "__ipow__"),
            Self::Multiply => ("__mul__", "__rmul__", "__imul__"),
            Self::MatrixMultiply => ("__matmul__", "__rmatmul__", "__imatmul__"),
            Self::FloorDivide => ("__floordiv__", "__rfloordiv__", "__ifloordiv__"),
            Self::TrueDivide => ("__truediv__", "__rtruediv__", "__itruediv__"),
            Self::Modulo => ("__mod__", "__rmod__", "__imod__"),
            Self::Add => ("__add__", "__radd__", "__iadd__"),
            Self::Subtract => ("__sub__", "__rsub__", "__isub__"),
            Self::Subscr => ("__getitem__", "__getitem__", "__getitem__"),
            Self::Lshift => ("__lshift__", "__rlshift__", "__ilshift__"),
            Self::Rshift => ("__rshift__", "__rrshift__", "__irshift__"),
            Self::And => ("__and__", "__rand__", "__iand__"),
            Self::Xor => ("__xor__", "__rxor__", "__ixor__"),
            Self::Or => ("__or__", "__ror__", "__ior__"),
        }
    }
}

/// The twelve `COMPARE_OP` predicates, selected by the operand.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum CompareOp {
    Lt = 0,
    Le = 1,
    Eq = 2,
    Ne = 3,
    Gt = 4,
    Ge = 5,
    In = 6,
    NotIn = 7,
    Is = 8,
    IsNot = 9,
    /// Exception matching in `except` clauses; a type check for non-class operands.
    ExceptionMatch = 10,
    NotExceptionMatch = 11,
}

impl CompareOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::ExceptionMatch => "exception match",
            Self::NotExceptionMatch => "not exception match",
        }
    }

    /// Dunder method for rich comparisons on user classes.
    #[must_use]
    pub fn dunder(self) -> Option<&'static str> {
        match self {
            Self::Lt => Some("__lt__"),
            Self::Le => Some("__le__"),
            Self::Eq => Some("__eq__"),
            Self::Ne => Some("__ne__"),
            Self::Gt => Some("__gt__"),
            Self::Ge => Some("__ge__"),
            _ => None,
        }
    }
}
