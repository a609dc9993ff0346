//! Callable values: interpreted functions, methods, closure cells and host functions.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    args::ArgValues,
    bytecode::{Code, MethodName},
    exception_private::RunResult,
    exception_public::ByterunException,
    namespace::Namespace,
    signature::Signature,
    types::Class,
    value::Value,
};

/// A single mutable slot shared between the frame that owns a variable and every nested
/// frame that captures it.
///
/// An empty cell is a variable that has not been assigned yet (or was deleted).
#[derive(Debug, Default)]
pub struct Cell(RefCell<Option<Value>>);

impl Cell {
    #[must_use]
    pub fn new(value: Option<Value>) -> Self {
        Self(RefCell::new(value))
    }

    #[must_use]
    pub fn get(&self) -> Option<Value> {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = Some(value);
    }

    pub fn clear(&self) {
        *self.0.borrow_mut() = None;
    }
}

/// A function defined by interpreted code.
///
/// Built by `MAKE_FUNCTION`/`MAKE_CLOSURE`. The globals are the defining module's globals
/// (shared, not copied), and `closure` holds the cells captured from the defining scope in
/// `freevars` order.
#[derive(Debug)]
pub struct Function {
    name: Rc<str>,
    code: Rc<Code>,
    globals: Namespace,
    signature: Signature,
    closure: Option<Rc<Vec<Value>>>,
}

impl Function {
    pub(crate) fn new(
        name: Rc<str>,
        code: Rc<Code>,
        globals: Namespace,
        defaults: Vec<Value>,
        kw_defaults: Vec<(Rc<str>, Value)>,
        closure: Option<Rc<Vec<Value>>>,
    ) -> RunResult<Self> {
        let signature = Signature::from_code(name.clone(), &code, defaults, kw_defaults)?;
        Ok(Self {
            name,
            code,
            globals,
            signature,
            closure,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn code(&self) -> &Rc<Code> {
        &self.code
    }

    #[must_use]
    pub fn globals(&self) -> &Namespace {
        &self.globals
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[must_use]
    pub fn closure(&self) -> Option<&Rc<Vec<Value>>> {
        self.closure.as_ref()
    }

    /// The docstring: the first constant of the code object when it is a string.
    #[must_use]
    pub fn doc(&self) -> Value {
        match self.code.constants().first() {
            Some(crate::bytecode::Const::Str(doc)) => Value::Str(doc.clone()),
            _ => Value::None,
        }
    }

    /// Attributes readable through `LOAD_ATTR` on a function object.
    pub(crate) fn attr(&self, name: &str) -> Option<Value> {
        let value = match name {
            "__name__" | "__qualname__" => Value::Str(self.name.clone()),
            "__doc__" => self.doc(),
            "__code__" => Value::Code(self.code.clone()),
            "__defaults__" => {
                let defaults = self.signature.defaults();
                if defaults.is_empty() {
                    Value::None
                } else {
                    Value::tuple(defaults.to_vec())
                }
            }
            "__closure__" => self.closure.as_ref().map_or(Value::None, |cells| Value::Tuple(cells.clone())),
            "__globals__" => Value::dict(self.globals.to_dict()),
            _ => return None,
        };
        Some(value)
    }
}

/// A function looked up through a class or an instance.
///
/// Looked up through an instance, the method is bound and `receiver` is that instance.
/// Looked up through the class, it is unbound, and calling it checks that the first argument
/// is an instance of `class`.
#[derive(Debug)]
pub struct Method {
    func: Value,
    receiver: Option<Value>,
    class: Rc<Class>,
}

impl Method {
    #[must_use]
    pub fn new(func: Value, receiver: Option<Value>, class: Rc<Class>) -> Self {
        Self { func, receiver, class }
    }

    #[must_use]
    pub fn func(&self) -> &Value {
        &self.func
    }

    #[must_use]
    pub fn receiver(&self) -> Option<&Value> {
        self.receiver.as_ref()
    }

    /// The class the method was looked up on.
    #[must_use]
    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match &self.func {
            Value::Function(func) => func.name(),
            Value::Native(native) => native.name(),
            _ => "?",
        }
    }
}

/// A method of a builtin type bound to its receiver, e.g. `[].append`.
#[derive(Debug)]
pub struct BuiltinMethod {
    receiver: Value,
    method: MethodName,
}

impl BuiltinMethod {
    #[must_use]
    pub(crate) fn new(receiver: Value, method: MethodName) -> Self {
        Self { receiver, method }
    }

    #[must_use]
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    #[must_use]
    pub(crate) fn method(&self) -> MethodName {
        self.method
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.method.into()
    }
}

/// Signature of a host function callable from interpreted code.
pub type NativeFn = dyn Fn(ArgValues) -> Result<Value, ByterunException>;

/// A function supplied by the host.
///
/// Native functions receive the same [`ArgValues`] an interpreted function would, so they
/// can be passed around and called interchangeably with interpreted ones.
pub struct NativeFunction {
    name: Rc<str>,
    func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new(name: &str, func: impl Fn(ArgValues) -> Result<Value, ByterunException> + 'static) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, args: ArgValues) -> RunResult<Value> {
        (self.func)(args).map_err(Into::into)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish_non_exhaustive()
    }
}

impl From<NativeFunction> for Value {
    fn from(native: NativeFunction) -> Self {
        Self::Native(Rc::new(native))
    }
}
