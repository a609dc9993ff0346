//! Built-in functions and the default builtins namespace.
//!
//! The `Builtin` enum names every builtin function. Type constructors (`int`, `list`, ...)
//! and exception classes live in the same namespace as [`Value::Type`] and
//! [`Value::ExcType`] values; calling those goes through the VM's call protocol directly.

mod abs;
mod attr;
mod chr;
mod divmod;
mod enumerate;
mod hash;
mod isinstance;
mod iter;
mod min_max;
mod pow;
mod print;
mod sorted;
mod sum;

use strum::{Display, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    args::ArgValues,
    bytecode::VM,
    exception_private::{ExcType, RunResult},
    io::PrintWriter,
    namespace::Namespace,
    types::Type,
    value::Value,
};

/// Enumerates every interpreter-native builtin function.
///
/// Uses strum derives for `Display` and `FromStr`. Variants serialize to snake case
/// (e.g. `Isinstance` -> "isinstance").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Builtin {
    Print,
    Len,
    Repr,
    Isinstance,
    Issubclass,
    Iter,
    Next,
    Abs,
    Min,
    Max,
    Sum,
    Sorted,
    Reversed,
    Enumerate,
    Zip,
    Divmod,
    Pow,
    Callable,
    Hash,
    Id,
    Chr,
    Ord,
    Getattr,
    Setattr,
    Hasattr,
    Any,
    All,
    /// Pushed by `LOAD_BUILD_CLASS`; called with the class body function and the class name.
    #[strum(serialize = "__build_class__")]
    BuildClass,
}

impl Builtin {
    /// Calls this builtin with the given arguments.
    pub(crate) fn call<P: PrintWriter>(self, vm: &mut VM<'_, P>, args: ArgValues) -> RunResult<Value> {
        match self {
            Self::Print => print::builtin_print(vm, args),
            Self::Len => {
                let value = args.get_one_arg("len")?;
                if let Some(len) = value.py_len() {
                    return Ok(Value::from_len(len));
                }
                match vm.call_special(&value, "__len__", Vec::new())? {
                    Some(len) => Ok(len),
                    None => Err(ExcType::type_error(format!(
                        "object of type '{}' has no len()",
                        value.type_name()
                    ))),
                }
            }
            Self::Repr => {
                let value = args.get_one_arg("repr")?;
                Ok(Value::from(vm.repr_value(&value)?))
            }
            Self::Isinstance => isinstance::builtin_isinstance(args),
            Self::Issubclass => isinstance::builtin_issubclass(args),
            Self::Callable => isinstance::builtin_callable(vm, args),
            Self::Iter => iter::builtin_iter(vm, args),
            Self::Next => iter::builtin_next(vm, args),
            Self::Any => iter::builtin_any(vm, args),
            Self::All => iter::builtin_all(vm, args),
            Self::Abs => abs::builtin_abs(vm, args),
            Self::Min => min_max::builtin_min(vm, args),
            Self::Max => min_max::builtin_max(vm, args),
            Self::Sum => sum::builtin_sum(vm, args),
            Self::Sorted => sorted::builtin_sorted(vm, args),
            Self::Reversed => enumerate::builtin_reversed(vm, args),
            Self::Enumerate => enumerate::builtin_enumerate(vm, args),
            Self::Zip => enumerate::builtin_zip(vm, args),
            Self::Divmod => divmod::builtin_divmod(args),
            Self::Pow => pow::builtin_pow(vm, args),
            Self::Hash => hash::builtin_hash(vm, args),
            Self::Id => hash::builtin_id(args),
            Self::Chr => chr::builtin_chr(args),
            Self::Ord => chr::builtin_ord(args),
            Self::Getattr => attr::builtin_getattr(vm, args),
            Self::Setattr => attr::builtin_setattr(vm, args),
            Self::Hasattr => attr::builtin_hasattr(vm, args),
            Self::BuildClass => vm.build_class(args),
        }
    }
}

/// The namespace frames fall back to when their globals carry no `__builtins__`.
///
/// Holds every [`Builtin`], the type constructors and the builtin exception classes.
pub(crate) fn default_builtins() -> Namespace {
    let namespace = Namespace::new();
    for builtin in Builtin::iter() {
        namespace.set(builtin.to_string(), Value::Builtin(builtin));
    }
    for t in Type::CONSTRUCTORS {
        namespace.set(t.to_string(), Value::Type(t));
    }
    for exc_type in ExcType::iter() {
        namespace.set(exc_type.to_string(), Value::ExcType(exc_type));
    }
    namespace.set("Ellipsis", Value::Ellipsis);
    namespace
}
