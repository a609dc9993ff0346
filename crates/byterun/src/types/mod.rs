/// Runtime types backing the container, class and exception values.
///
/// Each type owns its Python-level semantics (ordering, hashing, element positions) so that
/// the interpreter's handlers only deal with stack traffic and dispatch.
pub mod class;
pub mod dict;
pub mod exception;
pub mod range;
pub mod set;
pub mod slice;
pub mod str;
pub mod r#type;

pub use class::{Class, Instance};
pub use dict::Dict;
pub use exception::{ExcClass, ExceptionValue};
pub use r#type::Type;
pub use range::Range;
pub use set::Set;
pub use slice::Slice;
