//! Exception objects: instances of builtin or user-defined exception classes.

use std::{
    borrow::Cow,
    cell::RefCell,
    fmt::{self, Write},
    rc::Rc,
};

use crate::{
    exception_private::{ExcType, SimpleException},
    namespace::Namespace,
    types::Class,
    value::Value,
};

/// The class of an exception object.
#[derive(Debug, Clone)]
pub enum ExcClass {
    Builtin(ExcType),
    User(Rc<Class>),
}

/// A raised (or raisable) exception object.
#[derive(Debug)]
pub struct ExceptionValue {
    class: ExcClass,
    args: Vec<Value>,
    cause: RefCell<Option<Value>>,
    attrs: Namespace,
}

impl ExceptionValue {
    #[must_use]
    pub fn new(exc_type: ExcType, args: Vec<Value>) -> Self {
        Self::with_class(ExcClass::Builtin(exc_type), args)
    }

    #[must_use]
    pub fn with_class(class: ExcClass, args: Vec<Value>) -> Self {
        Self {
            class,
            args,
            cause: RefCell::new(None),
            attrs: Namespace::new(),
        }
    }

    #[must_use]
    pub fn class(&self) -> &ExcClass {
        &self.class
    }

    /// The class as a first-class value, as returned by `type(exc)`.
    #[must_use]
    pub fn class_value(&self) -> Value {
        match &self.class {
            ExcClass::Builtin(exc_type) => Value::ExcType(*exc_type),
            ExcClass::User(class) => Value::Class(class.clone()),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> Cow<'_, str> {
        match &self.class {
            ExcClass::Builtin(exc_type) => Cow::Borrowed((*exc_type).into()),
            ExcClass::User(class) => Cow::Borrowed(class.name()),
        }
    }

    /// The nearest builtin exception class, used for hierarchy checks.
    #[must_use]
    pub fn builtin_kind(&self) -> ExcType {
        match &self.class {
            ExcClass::Builtin(exc_type) => *exc_type,
            ExcClass::User(class) => class.exc_base().unwrap_or(ExcType::Exception),
        }
    }

    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    #[must_use]
    pub fn attrs(&self) -> &Namespace {
        &self.attrs
    }

    #[must_use]
    pub fn cause(&self) -> Option<Value> {
        self.cause.borrow().clone()
    }

    pub fn set_cause(&self, cause: Option<Value>) {
        *self.cause.borrow_mut() = cause;
    }

    /// `str(exc)`: empty for no arguments, the argument itself for one, the args tuple otherwise.
    ///
    /// KeyError renders its single argument with repr, like CPython.
    #[must_use]
    pub fn message(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [arg] if self.builtin_kind() == ExcType::KeyError && matches!(self.class, ExcClass::Builtin(_)) => {
                arg.py_repr().into_owned()
            }
            [arg] => arg.py_str().into_owned(),
            args => Value::Tuple(Rc::new(args.to_vec())).py_repr().into_owned(),
        }
    }

    /// True if this exception would be caught by `except handler:`.
    #[must_use]
    pub fn matches(&self, handler: &Value) -> bool {
        match handler {
            Value::ExcType(handler_type) => self.builtin_kind().is_subclass_of(*handler_type),
            Value::Class(handler_class) => match &self.class {
                ExcClass::User(class) => class.is_subclass_of(handler_class),
                ExcClass::Builtin(_) => false,
            },
            Value::Tuple(handlers) => handlers.iter().any(|h| self.matches(h)),
            _ => false,
        }
    }

    pub(crate) fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        write!(f, "{}(", self.type_name())?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&arg.py_repr())?;
        }
        f.write_char(')')
    }
}

impl From<SimpleException> for ExceptionValue {
    fn from(exc: SimpleException) -> Self {
        let args = exc.arg().map(|arg| vec![Value::Str(arg.into())]).unwrap_or_default();
        Self::new(exc.exc_type(), args)
    }
}
