//! Public error types returned across the engine boundary.
//!
//! Program exceptions and engine defects are deliberately different variants of
//! [`ExecError`]: a defect means the interpreter (or the compiled unit it was handed) is
//! broken, and no program-level handler ever observes one.

use std::fmt;

use crate::{
    exception_private::{ExcType, ExceptionRaise, RunError},
    value::Value,
};

/// One entry of a traceback: where a frame was executing when the exception passed through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub filename: String,
    pub line: u32,
    /// Name of the code object, e.g. `<module>` or a function name.
    pub name: String,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  File \"{}\", line {}, in {}", self.filename, self.line, self.name)
    }
}

/// An exception that escaped the top-level frame.
#[derive(Debug, Clone)]
pub struct ByterunException {
    type_name: String,
    exc_type: Option<ExcType>,
    message: String,
    /// Outermost frame first, matching "most recent call last".
    traceback: Vec<StackFrame>,
    value: Value,
}

impl ByterunException {
    /// Creates an exception of a builtin class, for host-native functions that need to raise.
    #[must_use]
    pub fn new(exc_type: ExcType, message: impl Into<String>) -> Self {
        let message = message.into();
        let value = crate::types::ExceptionValue::new(exc_type, vec![Value::Str(message.as_str().into())]);
        Self {
            type_name: exc_type.to_string(),
            exc_type: Some(exc_type),
            message,
            traceback: Vec::new(),
            value: Value::Exception(std::rc::Rc::new(value)),
        }
    }

    pub(crate) fn from_raise(raise: ExceptionRaise) -> Self {
        let (type_name, exc_type, message) = match &raise.value {
            Value::Exception(exc) => (exc.type_name().into_owned(), Some(exc.builtin_kind()), exc.message()),
            other => (other.type_name().into_owned(), None, other.py_str().into_owned()),
        };
        let mut traceback = raise.traceback;
        traceback.reverse();
        Self {
            type_name,
            exc_type,
            message,
            traceback,
            value: raise.value,
        }
    }

    /// Name of the exception class, e.g. `ZeroDivisionError` or a user class name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The builtin class of the exception, or the builtin base of a user-defined class.
    #[must_use]
    pub fn exc_type(&self) -> Option<ExcType> {
        self.exc_type
    }

    /// `str(exc)` of the raised exception.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn traceback(&self) -> &[StackFrame] {
        &self.traceback
    }

    /// The raised exception object itself.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Renders the final `Type: message` line of a traceback.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.message.is_empty() {
            self.type_name.clone()
        } else {
            format!("{}: {}", self.type_name, self.message)
        }
    }
}

impl fmt::Display for ByterunException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.traceback.is_empty() {
            writeln!(f, "Traceback (most recent call last):")?;
            for frame in &self.traceback {
                writeln!(f, "{frame}")?;
            }
        }
        write!(f, "{}", self.summary())
    }
}

impl std::error::Error for ByterunException {}

/// Why a call into the engine failed.
#[derive(Debug, Clone)]
pub enum ExecError {
    /// A program-level exception escaped the outermost frame.
    Exception(ByterunException),
    /// The engine detected a violated invariant: unknown instruction, confused block state,
    /// leftover frames or stack entries, or an inconsistent compiled unit.
    Internal(String),
}

impl ExecError {
    /// Returns the program exception, if this is one.
    #[must_use]
    pub fn exception(&self) -> Option<&ByterunException> {
        match self {
            Self::Exception(exc) => Some(exc),
            Self::Internal(_) => None,
        }
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exception(exc) => write!(f, "{exc}"),
            Self::Internal(msg) => write!(f, "internal interpreter error: {msg}"),
        }
    }
}

impl std::error::Error for ExecError {}

impl From<RunError> for ExecError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Exc(raise) => Self::Exception(ByterunException::from_raise(raise)),
            RunError::Internal(msg) => Self::Internal(msg.into_owned()),
        }
    }
}

impl From<ByterunException> for RunError {
    fn from(exc: ByterunException) -> Self {
        Self::Exc(ExceptionRaise::new(exc.value))
    }
}
