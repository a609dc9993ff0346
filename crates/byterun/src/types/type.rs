use strum::{Display, EnumString, IntoStaticStr};

/// Represents the builtin type of a value.
///
/// This enum is used both for type checking and as a callable constructor: the names that
/// parse from a string (e.g., "list", "dict") are registered as builtins and create new
/// instances of that type when called.
#[derive(Debug, Clone, Copy, Display, EnumString, IntoStaticStr, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Type {
    #[strum(serialize = "NoneType")]
    NoneType,
    Ellipsis,
    Bool,
    Int,
    Float,
    Str,
    Tuple,
    List,
    Dict,
    Set,
    Range,
    Slice,
    Object,
    Type,
    Code,
    Cell,
    Function,
    Method,
    #[strum(serialize = "builtin_function_or_method")]
    BuiltinFunction,
    Generator,
    Iterator,
    Module,
    Traceback,
    /// An exception object of a builtin class; the concrete class name comes from the value.
    #[strum(serialize = "BaseException")]
    Exception,
}

impl Type {
    /// Types that the builtins namespace exposes as constructors.
    pub(crate) const CONSTRUCTORS: [Self; 11] = [
        Self::Bool,
        Self::Int,
        Self::Float,
        Self::Str,
        Self::Tuple,
        Self::List,
        Self::Dict,
        Self::Set,
        Self::Range,
        Self::Object,
        Self::Type,
    ];

    /// Checks if a value of type `self` is an instance of `other`.
    ///
    /// `bool` is a subtype of `int`, and everything is an `object`.
    #[must_use]
    pub fn is_instance_of(self, other: Self) -> bool {
        self == other || other == Self::Object || (self == Self::Bool && other == Self::Int)
    }
}
