use std::{
    borrow::Cow,
    fmt::{self, Write},
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    exception_public::StackFrame,
    types::{str::string_repr_fmt, ExceptionValue},
    value::Value,
};

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Builtin exception classes known to the interpreter.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `ValueError` -> "ValueError").
/// `EnumIter` lets the builtins namespace register every class by name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter, Serialize, Deserialize,
)]
pub enum ExcType {
    /// Root of the hierarchy.
    BaseException,
    /// Base class for everything a program normally catches.
    Exception,
    SystemExit,
    KeyboardInterrupt,
    GeneratorExit,

    StopIteration,

    // --- ArithmeticError hierarchy ---
    ArithmeticError,
    OverflowError,
    ZeroDivisionError,

    // --- LookupError hierarchy ---
    LookupError,
    IndexError,
    KeyError,

    // --- RuntimeError hierarchy ---
    RuntimeError,
    NotImplementedError,
    RecursionError,

    AttributeError,

    // --- NameError hierarchy ---
    NameError,
    /// Subclass of NameError - for accessing local variable before assignment.
    UnboundLocalError,

    ValueError,

    // --- ImportError hierarchy ---
    ImportError,
    ModuleNotFoundError,

    AssertionError,
    MemoryError,
    TypeError,
}

impl ExcType {
    /// Checks if this exception type is a subclass of another exception type.
    ///
    /// Returns true if `self` would be caught by `except handler_type:`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            Self::BaseException => true,
            // Exception catches everything except the direct BaseException subclasses
            Self::Exception => !matches!(
                self,
                Self::BaseException | Self::KeyboardInterrupt | Self::SystemExit | Self::GeneratorExit
            ),
            Self::LookupError => matches!(self, Self::KeyError | Self::IndexError),
            Self::ArithmeticError => matches!(self, Self::ZeroDivisionError | Self::OverflowError),
            Self::RuntimeError => matches!(self, Self::RecursionError | Self::NotImplementedError),
            Self::NameError => matches!(self, Self::UnboundLocalError),
            Self::ImportError => matches!(self, Self::ModuleNotFoundError),
            _ => false,
        }
    }

    /// Creates an AttributeError for when an attribute is not found.
    ///
    /// Matches CPython's format: `AttributeError: 'ClassName' object has no attribute 'attr_name'`
    #[must_use]
    pub(crate) fn attribute_error(type_name: &str, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
        .into()
    }

    /// Creates an AttributeError for a missing class attribute.
    #[must_use]
    pub(crate) fn attribute_error_class(class_name: &str, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("type object '{class_name}' has no attribute '{attr}'"),
        )
        .into()
    }

    /// Creates an AttributeError for a missing module attribute.
    #[must_use]
    pub(crate) fn attribute_error_module(module_name: &str, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("module '{module_name}' has no attribute '{attr}'"),
        )
        .into()
    }

    /// Creates an AttributeError for attribute assignment on types that don't support it.
    #[must_use]
    pub(crate) fn attribute_error_no_setattr(type_name: &str, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}' and no __dict__ for setting new attributes"),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn type_error_not_sub(type_name: &str) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("'{type_name}' object is not subscriptable")).into()
    }

    /// Matches CPython's format: `TypeError: '{type}' object does not support item assignment`
    #[must_use]
    pub(crate) fn type_error_not_sub_assignment(type_name: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("'{type_name}' object does not support item assignment"),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn type_error_not_sub_deletion(type_name: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("'{type_name}' object does not support item deletion"),
        )
        .into()
    }

    /// Creates a TypeError for unhashable types used as dict keys or set members.
    ///
    /// Matches CPython's format: `TypeError: unhashable type: 'list'`
    #[must_use]
    pub(crate) fn type_error_unhashable(type_name: &str) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("unhashable type: '{type_name}'")).into()
    }

    /// Creates a KeyError for a missing dict key.
    ///
    /// The key itself becomes the exception argument so that `str(exc)` shows its repr,
    /// the way CPython renders `KeyError: 'name'`.
    #[must_use]
    pub(crate) fn key_error(key: &Value) -> RunError {
        ExceptionValue::new(Self::KeyError, vec![key.clone()]).into()
    }

    #[must_use]
    pub(crate) fn key_error_pop_empty_set() -> RunError {
        SimpleException::new_msg(Self::KeyError, "pop from an empty set").into()
    }

    /// Creates a TypeError for when a builtin receives the wrong number of arguments.
    ///
    /// - For 1 expected arg: `{name}() takes exactly one argument ({actual} given)`
    /// - For N expected args: `{name} expected {expected} arguments, got {actual}`
    #[must_use]
    pub(crate) fn type_error_arg_count(name: &str, expected: usize, actual: usize) -> RunError {
        if expected == 1 {
            SimpleException::new_msg(
                Self::TypeError,
                format!("{name}() takes exactly one argument ({actual} given)"),
            )
            .into()
        } else {
            SimpleException::new_msg(
                Self::TypeError,
                format!("{name} expected {expected} arguments, got {actual}"),
            )
            .into()
        }
    }

    /// Matches CPython's format: `{name}() takes no arguments ({actual} given)`
    #[must_use]
    pub(crate) fn type_error_no_args(name: &str, actual: usize) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("{name}() takes no arguments ({actual} given)")).into()
    }

    /// Matches CPython's format: `{name} expected at least {min} argument, got {actual}`
    #[must_use]
    pub(crate) fn type_error_at_least(name: &str, min: usize, actual: usize) -> RunError {
        let word = if min == 1 { "argument" } else { "arguments" };
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name} expected at least {min} {word}, got {actual}"),
        )
        .into()
    }

    /// Matches CPython's format: `{name} expected at most {max} arguments, got {actual}`
    #[must_use]
    pub(crate) fn type_error_at_most(name: &str, max: usize, actual: usize) -> RunError {
        let word = if max == 1 { "argument" } else { "arguments" };
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name} expected at most {max} {word}, got {actual}"),
        )
        .into()
    }

    /// Creates a TypeError for missing positional arguments.
    ///
    /// Matches CPython's format: `{name}() missing {count} required positional argument(s): 'a' and 'b'`
    #[must_use]
    pub(crate) fn type_error_missing_positional_with_names(name: &str, missing_names: &[&str]) -> RunError {
        let count = missing_names.len();
        let names_str = format_param_names(missing_names);
        let word = if count == 1 { "argument" } else { "arguments" };
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name}() missing {count} required positional {word}: {names_str}"),
        )
        .into()
    }

    /// Creates a TypeError for missing keyword-only arguments.
    #[must_use]
    pub(crate) fn type_error_missing_kwonly_with_names(name: &str, missing_names: &[&str]) -> RunError {
        let count = missing_names.len();
        let names_str = format_param_names(missing_names);
        let word = if count == 1 { "argument" } else { "arguments" };
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name}() missing {count} required keyword-only {word}: {names_str}"),
        )
        .into()
    }

    /// Creates a TypeError for too many positional arguments.
    ///
    /// Matches CPython's format: `{name}() takes {max} positional argument(s) but {actual} were given`
    #[must_use]
    pub(crate) fn type_error_too_many_positional(name: &str, max: usize, actual: usize) -> RunError {
        let takes_word = if max == 1 { "argument" } else { "arguments" };
        let given_word = if actual == 1 { "was" } else { "were" };
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name}() takes {max} positional {takes_word} but {actual} {given_word} given"),
        )
        .into()
    }

    /// Matches CPython's format: `{name}() got multiple values for argument '{param}'`
    #[must_use]
    pub(crate) fn type_error_duplicate_arg(name: &str, param: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name}() got multiple values for argument '{param}'"),
        )
        .into()
    }

    /// Matches CPython's format: `{name}() got an unexpected keyword argument '{key}'`
    #[must_use]
    pub(crate) fn type_error_unexpected_keyword(name: &str, key: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name}() got an unexpected keyword argument '{key}'"),
        )
        .into()
    }

    /// Matches CPython's format: `{name}() argument after ** must be a mapping, not {type_name}`
    #[must_use]
    pub(crate) fn type_error_kwargs_not_mapping(name: &str, type_name: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name}() argument after ** must be a mapping, not {type_name}"),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn type_error_kwargs_nonstring_key() -> RunError {
        SimpleException::new_msg(Self::TypeError, "keywords must be strings").into()
    }

    /// Matches CPython's format: `{name}() argument after * must be an iterable, not {type_name}`
    #[must_use]
    pub(crate) fn type_error_star_args_not_iterable(name: &str, type_name: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name}() argument after * must be an iterable, not {type_name}"),
        )
        .into()
    }

    /// Creates a simple TypeError with a custom message.
    #[must_use]
    pub(crate) fn type_error(msg: impl Into<String>) -> RunError {
        SimpleException::new_msg(Self::TypeError, msg).into()
    }

    /// Creates a simple ValueError with a custom message.
    #[must_use]
    pub(crate) fn value_error(msg: impl Into<String>) -> RunError {
        SimpleException::new_msg(Self::ValueError, msg).into()
    }

    /// Matches CPython's format: `'{type}' object is not callable`
    #[must_use]
    pub(crate) fn type_error_not_callable(type_name: &str) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("'{type_name}' object is not callable")).into()
    }

    /// Matches CPython's format: `'{type}' object is not iterable`
    #[must_use]
    pub(crate) fn type_error_not_iterable(type_name: &str) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("'{type_name}' object is not iterable")).into()
    }

    /// Matches CPython's format: `'{type}' object is not an iterator`
    #[must_use]
    pub(crate) fn type_error_not_iterator(type_name: &str) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("'{type_name}' object is not an iterator")).into()
    }

    /// Creates the error for calling an unbound method with the wrong receiver.
    #[must_use]
    pub(crate) fn type_error_unbound_method(method: &str, class_name: &str, got: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!(
                "unbound method {method}() must be called with {class_name} instance as first argument (got {got} instance instead)"
            ),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn isinstance_arg2_error() -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            "isinstance() arg 2 must be a type, a tuple of types, or a union",
        )
        .into()
    }

    #[must_use]
    pub(crate) fn except_invalid_type_error() -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            "catching classes that do not inherit from BaseException is not allowed",
        )
        .into()
    }

    #[must_use]
    pub(crate) fn type_error_not_exception() -> RunError {
        SimpleException::new_msg(Self::TypeError, "exceptions must derive from BaseException").into()
    }

    #[must_use]
    pub(crate) fn runtime_error_no_active_exception() -> RunError {
        SimpleException::new_msg(Self::RuntimeError, "No active exception to reraise").into()
    }

    #[must_use]
    pub(crate) fn value_error_range_step_zero() -> RunError {
        SimpleException::new_msg(Self::ValueError, "range() arg 3 must not be zero").into()
    }

    #[must_use]
    pub(crate) fn value_error_slice_step_zero() -> RunError {
        SimpleException::new_msg(Self::ValueError, "slice step cannot be zero").into()
    }

    #[must_use]
    pub(crate) fn type_error_slice_indices() -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            "slice indices must be integers or None or have an __index__ method",
        )
        .into()
    }

    #[must_use]
    pub(crate) fn runtime_error_dict_changed_size() -> RunError {
        SimpleException::new_msg(Self::RuntimeError, "dictionary changed size during iteration").into()
    }

    #[must_use]
    pub(crate) fn runtime_error_set_changed_size() -> RunError {
        SimpleException::new_msg(Self::RuntimeError, "Set changed size during iteration").into()
    }

    #[must_use]
    pub(crate) fn type_error_no_kwargs(name: &str) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("{name}() takes no keyword arguments")).into()
    }

    /// Creates an IndexError such as `list index out of range`.
    #[must_use]
    pub(crate) fn index_error(type_name: &str) -> RunError {
        SimpleException::new_msg(Self::IndexError, format!("{type_name} index out of range")).into()
    }

    #[must_use]
    pub(crate) fn list_assignment_index_error() -> RunError {
        SimpleException::new_msg(Self::IndexError, "list assignment index out of range").into()
    }

    /// Matches CPython's format: `{type} indices must be integers or slices, not {index_type}`
    #[must_use]
    pub(crate) fn type_error_indices(type_name: &str, index_type: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("{type_name} indices must be integers or slices, not {index_type}"),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn name_error_free_variable(name: &str) -> RunError {
        SimpleException::new_msg(
            Self::NameError,
            format!("free variable '{name}' referenced before assignment in enclosing scope"),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn name_error(name: &str) -> RunError {
        SimpleException::new_msg(Self::NameError, format!("name '{name}' is not defined")).into()
    }

    #[must_use]
    pub(crate) fn unbound_local_error(name: &str) -> RunError {
        SimpleException::new_msg(
            Self::UnboundLocalError,
            format!("local variable '{name}' referenced before assignment"),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn zero_division(msg: &'static str) -> RunError {
        SimpleException::new_msg(Self::ZeroDivisionError, msg).into()
    }

    #[must_use]
    pub(crate) fn overflow(msg: &'static str) -> RunError {
        SimpleException::new_msg(Self::OverflowError, msg).into()
    }

    /// An allocation the program asked for cannot be made, e.g. `[0] * (1 << 62)`.
    #[must_use]
    pub(crate) fn memory_error() -> RunError {
        SimpleException::new_none(Self::MemoryError).into()
    }

    #[must_use]
    pub(crate) fn module_not_found(name: &str) -> RunError {
        SimpleException::new_msg(Self::ModuleNotFoundError, format!("No module named '{name}'")).into()
    }

    /// Matches CPython's format: `cannot import name 'x' from 'module'`
    #[must_use]
    pub(crate) fn cannot_import_name(name: &str, module_name: &str) -> RunError {
        SimpleException::new_msg(
            Self::ImportError,
            format!("cannot import name '{name}' from '{module_name}'"),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn value_error_negative_shift_count() -> RunError {
        SimpleException::new_msg(Self::ValueError, "negative shift count").into()
    }

    /// Creates a TypeError for an operator applied to unsupported operand types.
    ///
    /// Matches CPython's format: `unsupported operand type(s) for +: 'int' and 'str'`
    #[must_use]
    pub(crate) fn binary_type_error(op: &str, lhs_type: &str, rhs_type: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("unsupported operand type(s) for {op}: '{lhs_type}' and '{rhs_type}'"),
        )
        .into()
    }

    /// Matches CPython's format: `bad operand type for unary -: 'str'`
    #[must_use]
    pub(crate) fn unary_type_error(op: &str, value_type: &str) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("bad operand type for unary {op}: '{value_type}'")).into()
    }

    /// Matches CPython's format: `'<' not supported between instances of 'int' and 'str'`
    #[must_use]
    pub(crate) fn compare_type_error(op: &str, lhs_type: &str, rhs_type: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("'{op}' not supported between instances of '{lhs_type}' and '{rhs_type}'"),
        )
        .into()
    }

    #[must_use]
    pub(crate) fn zero_negative_power() -> RunError {
        SimpleException::new_msg(
            Self::ZeroDivisionError,
            "0.0 cannot be raised to a negative power",
        )
        .into()
    }

    #[must_use]
    pub(crate) fn value_error_not_in_list() -> RunError {
        SimpleException::new_msg(Self::ValueError, "list.index(x): x not in list").into()
    }

    #[must_use]
    pub(crate) fn value_error_remove_not_in_list() -> RunError {
        SimpleException::new_msg(Self::ValueError, "list.remove(x): x not in list").into()
    }

    #[must_use]
    pub(crate) fn index_error_pop_empty_list() -> RunError {
        SimpleException::new_msg(Self::IndexError, "pop from empty list").into()
    }

    #[must_use]
    pub(crate) fn index_error_pop_out_of_range() -> RunError {
        SimpleException::new_msg(Self::IndexError, "pop index out of range").into()
    }

    /// Matches CPython's format: `not enough values to unpack (expected 3, got 2)`
    #[must_use]
    pub(crate) fn value_error_unpack(expected: usize, got: usize) -> RunError {
        let msg = if got < expected {
            format!("not enough values to unpack (expected {expected}, got {got})")
        } else {
            format!("too many values to unpack (expected {expected})")
        };
        SimpleException::new_msg(Self::ValueError, msg).into()
    }

    #[must_use]
    pub(crate) fn value_error_empty_separator() -> RunError {
        SimpleException::new_msg(Self::ValueError, "empty separator").into()
    }

    #[must_use]
    pub(crate) fn recursion_error() -> RunError {
        SimpleException::new_msg(Self::RecursionError, "maximum recursion depth exceeded").into()
    }

    #[must_use]
    pub(crate) fn generator_already_executing() -> RunError {
        SimpleException::new_msg(Self::ValueError, "generator already executing").into()
    }

    #[must_use]
    pub(crate) fn send_non_none_to_fresh_generator() -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            "can't send non-None value to a just-started generator",
        )
        .into()
    }

    /// Creates a StopIteration carrying a generator's return value.
    #[must_use]
    pub(crate) fn stop_iteration(value: Value) -> RunError {
        let args = if matches!(value, Value::None) { vec![] } else { vec![value] };
        ExceptionValue::new(Self::StopIteration, args).into()
    }
}

/// Simple lightweight representation of an exception.
///
/// Used for the common case of a builtin exception with an optional string message.
/// Converted into a full [`ExceptionValue`] when raised.
#[derive(Debug, Clone, PartialEq, Hash, Serialize, Deserialize)]
pub(crate) struct SimpleException {
    exc_type: ExcType,
    arg: Option<String>,
}

impl fmt::Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.py_repr_fmt(f)
    }
}

impl SimpleException {
    /// Creates a new exception with the given type and argument message.
    #[must_use]
    pub fn new_msg(exc_type: ExcType, arg: impl Into<String>) -> Self {
        Self {
            exc_type,
            arg: Some(arg.into()),
        }
    }

    /// Creates a new exception with the given type and no argument message.
    #[must_use]
    pub fn new_none(exc_type: ExcType) -> Self {
        Self { exc_type, arg: None }
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }

    /// Returns the exception formatted as Python would repr it.
    pub fn py_repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        let type_str: &'static str = self.exc_type.into();
        write!(f, "{type_str}(")?;
        if let Some(arg) = &self.arg {
            string_repr_fmt(arg, f)?;
        }
        f.write_char(')')
    }
}

/// A raised exception together with the traceback collected so far.
///
/// `traceback` is ordered innermost first: each frame the exception passes through while
/// propagating outward appends itself.
#[derive(Debug, Clone)]
pub(crate) struct ExceptionRaise {
    pub value: Value,
    pub traceback: Vec<StackFrame>,
}

impl ExceptionRaise {
    pub(crate) fn new(value: Value) -> Self {
        Self {
            value,
            traceback: Vec::new(),
        }
    }
}

/// Runtime error types that can occur during execution.
///
/// - `Internal`: the interpreter violated one of its own invariants. Never catchable.
/// - `Exc`: a program-level exception that try/except/finally blocks may intercept.
#[derive(Debug)]
pub(crate) enum RunError {
    /// Internal interpreter error - indicates a bug in the engine or a malformed compiled unit.
    Internal(Cow<'static, str>),
    /// Catchable exception (e.g., ValueError, TypeError).
    Exc(ExceptionRaise),
}

impl From<ExceptionRaise> for RunError {
    fn from(exc: ExceptionRaise) -> Self {
        Self::Exc(exc)
    }
}

impl From<SimpleException> for RunError {
    fn from(exc: SimpleException) -> Self {
        ExceptionValue::from(exc).into()
    }
}

impl From<ExceptionValue> for RunError {
    fn from(exc: ExceptionValue) -> Self {
        Self::Exc(ExceptionRaise::new(Value::Exception(std::rc::Rc::new(exc))))
    }
}

impl RunError {
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Formats a list of parameter names for error messages.
///
/// Examples:
/// - `["a"]` -> `'a'`
/// - `["a", "b"]` -> `'a' and 'b'`
/// - `["a", "b", "c"]` -> `'a', 'b' and 'c'`
fn format_param_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => format!("'{only}'"),
        [rest @ .., last] => {
            let rest: Vec<_> = rest.iter().map(|n| format!("'{n}'")).collect();
            format!("{} and '{last}'", rest.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy() {
        assert!(ExcType::KeyError.is_subclass_of(ExcType::LookupError));
        assert!(ExcType::ZeroDivisionError.is_subclass_of(ExcType::Exception));
        assert!(ExcType::GeneratorExit.is_subclass_of(ExcType::BaseException));
        assert!(!ExcType::GeneratorExit.is_subclass_of(ExcType::Exception));
        assert!(!ExcType::ValueError.is_subclass_of(ExcType::TypeError));
    }

    #[test]
    fn test_format_param_names() {
        assert_eq!(format_param_names(&["a"]), "'a'");
        assert_eq!(format_param_names(&["a", "b"]), "'a' and 'b'");
        assert_eq!(format_param_names(&["a", "b", "c"]), "'a', 'b' and 'c'");
    }

    #[test]
    fn test_simple_exception_repr() {
        let exc = SimpleException::new_msg(ExcType::ValueError, "bad value");
        assert_eq!(exc.to_string(), "ValueError('bad value')");
        assert_eq!(SimpleException::new_none(ExcType::TypeError).to_string(), "TypeError()");
    }
}
