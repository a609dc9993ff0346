//! The call protocol: argument collection, dispatch on the callable, and frame creation
//! for interpreted functions.

use std::rc::Rc;

use super::{FrameExit, VM};
use crate::{
    args::ArgValues,
    exception_private::{ExcType, RunError, RunResult},
    frame::Frame,
    function::{Function, Method},
    generator::Generator,
    io::PrintWriter,
    namespace::Namespace,
    types::{Class, ExcClass, ExceptionValue, Instance},
    value::Value,
};

impl<P: PrintWriter> VM<'_, P> {
    /// `CALL_FUNCTION` and its variants.
    ///
    /// The operand packs the keyword pair count in its high byte and the positional count in
    /// its low byte. Keyword pairs sit above the positional values, which sit above the
    /// callable. `splat` and `extra_kwargs` have already been popped by the caller.
    pub(super) fn call_function(&mut self, arg: u32, splat: Option<Value>, extra_kwargs: Option<Value>) -> RunResult<()> {
        let kw_count = ((arg >> 8) & 0xff) as usize;
        let pos_count = (arg & 0xff) as usize;

        let pairs = self.pop_n(2 * kw_count)?;
        let mut kwargs = Vec::with_capacity(kw_count + 4);
        let mut pairs = pairs.into_iter();
        while let (Some(key), Some(value)) = (pairs.next(), pairs.next()) {
            match key {
                Value::Str(key) => kwargs.push((key, value)),
                other => return Err(RunError::internal(format!("keyword name is not a string: {other:?}"))),
            }
        }
        let mut args = self.pop_n(pos_count)?;
        let callable = self.pop()?;

        if let Some(splat) = splat {
            if !is_iterable(&splat) {
                return Err(ExcType::type_error_star_args_not_iterable(
                    &callable_name(&callable),
                    &splat.type_name(),
                ));
            }
            args.extend(self.collect_iter(splat)?);
        }
        if let Some(mapping) = extra_kwargs {
            let Value::Dict(dict) = &mapping else {
                return Err(ExcType::type_error_kwargs_not_mapping(
                    &callable_name(&callable),
                    &mapping.type_name(),
                ));
            };
            for (key, value) in dict.borrow().items() {
                let Value::Str(key) = key else {
                    return Err(ExcType::type_error_kwargs_nonstring_key());
                };
                if kwargs.iter().any(|(existing, _)| *existing == key) {
                    return Err(ExcType::type_error_duplicate_arg(&callable_name(&callable), &key));
                }
                kwargs.push((key, value));
            }
        }

        let result = self.call_value(callable, ArgValues::new(args, kwargs))?;
        self.push(result)
    }

    /// Invokes any callable value.
    pub(crate) fn call_value(&mut self, callable: Value, mut args: ArgValues) -> RunResult<Value> {
        match callable {
            Value::Function(func) => self.call_interpreted(&func, args),
            Value::Method(method) => {
                match method.receiver() {
                    Some(receiver) => args.prepend(receiver.clone()),
                    None => check_unbound_receiver(&method, &args)?,
                }
                self.call_value(method.func().clone(), args)
            }
            Value::Builtin(builtin) => builtin.call(self, args),
            Value::BuiltinMethod(method) => self.call_method(method.receiver().clone(), method.method(), args),
            Value::Native(native) => native.call(args),
            Value::Type(t) => self.construct(t, args),
            Value::ExcType(exc_type) => {
                args.check_no_kwargs(exc_type.into())?;
                Ok(Value::Exception(Rc::new(ExceptionValue::new(exc_type, args.args))))
            }
            Value::Class(class) => self.instantiate(&class, args),
            instance @ Value::Instance(_) => match self.user_method(&instance, "__call__") {
                Some(method) => {
                    args.prepend(instance);
                    self.call_value(method, args)
                }
                None => Err(ExcType::type_error_not_callable(&instance.type_name())),
            },
            other => Err(ExcType::type_error_not_callable(&other.type_name())),
        }
    }

    /// Binds the arguments and builds the callee's frame; generator functions return a
    /// generator wrapping that frame, everything else runs it to completion.
    fn call_interpreted(&mut self, func: &Function, args: ArgValues) -> RunResult<Value> {
        let locals = Namespace::new();
        for (name, value) in func.signature().bind(args)? {
            locals.set(name, value);
        }
        let code = func.code().clone();
        let closure = func.closure().map(|cells| cells.as_slice());
        let frame = Frame::new(
            code.clone(),
            func.globals().clone(),
            locals,
            self.frames.last_mut(),
            closure,
            &self.builtins,
        )?;
        if code.flags().is_generator() {
            return Ok(Value::Generator(Generator::new(func.name().into(), frame)));
        }
        match self.run_frame(frame)? {
            (_, FrameExit::Return(value)) => Ok(value),
            (_, FrameExit::Yield(_)) => Err(RunError::internal(format!(
                "'{}' yielded without the generator flag",
                func.name()
            ))),
        }
    }

    /// Looks `name` up on the user class of `obj`, for instances and user exception objects.
    pub(crate) fn user_method(&self, obj: &Value, name: &str) -> Option<Value> {
        user_class(obj)?.lookup(name)
    }

    /// Calls the special method `name` of a user-class object with `obj` as the receiver.
    ///
    /// Returns `None` when `obj` is not an instance of a user class or the class doesn't
    /// define the method, so callers can fall back to builtin behaviour.
    pub(crate) fn call_special(&mut self, obj: &Value, name: &str, args: Vec<Value>) -> RunResult<Option<Value>> {
        let Some(method) = self.user_method(obj, name) else {
            return Ok(None);
        };
        let mut args = ArgValues::positional(args);
        args.prepend(obj.clone());
        self.call_value(method, args).map(Some)
    }

    /// Calling a user class: creates the instance and runs `__init__` on it.
    ///
    /// Classes deriving from an exception class produce exception objects whose `args` are
    /// the constructor arguments.
    pub(crate) fn instantiate(&mut self, class: &Rc<Class>, args: ArgValues) -> RunResult<Value> {
        let instance = if class.exc_base().is_some() {
            Value::Exception(Rc::new(ExceptionValue::with_class(
                ExcClass::User(class.clone()),
                args.args.clone(),
            )))
        } else {
            Value::Instance(Rc::new(Instance::new(class.clone())))
        };

        match class.lookup("__init__") {
            Some(init) => {
                let mut init_args = args;
                init_args.prepend(instance.clone());
                let result = self.call_value(init, init_args)?;
                if !matches!(result, Value::None) {
                    return Err(ExcType::type_error(format!(
                        "__init__() should return None, not '{}'",
                        result.type_name()
                    )));
                }
            }
            None if matches!(instance, Value::Instance(_)) && (args.count() > 0 || !args.kwargs.is_empty()) => {
                return Err(ExcType::type_error(format!("{}() takes no arguments", class.name())));
            }
            None => {}
        }
        Ok(instance)
    }

    /// `__build_class__(func, name, *bases)`: runs the class body with a fresh namespace as
    /// its locals and creates the class from what the body bound.
    pub(crate) fn build_class(&mut self, args: ArgValues) -> RunResult<Value> {
        let mut positional = args.args.into_iter();
        let (Some(Value::Function(body)), Some(Value::Str(name))) = (positional.next(), positional.next()) else {
            return Err(ExcType::type_error("__build_class__: func and name are required"));
        };
        let bases: Vec<Value> = positional.collect();
        for base in &bases {
            if !matches!(base, Value::Class(_) | Value::ExcType(_) | Value::Type(crate::types::Type::Object)) {
                return Err(ExcType::type_error(format!(
                    "cannot inherit from '{}'",
                    base.py_repr()
                )));
            }
        }

        let namespace = Namespace::new();
        let frame = Frame::new(
            body.code().clone(),
            body.globals().clone(),
            namespace.clone(),
            self.frames.last_mut(),
            body.closure().map(|cells| cells.as_slice()),
            &self.builtins,
        )?;
        self.run_frame(frame)?;
        if !namespace.contains("__module__") {
            if let Some(module) = body.globals().get("__name__") {
                namespace.set("__module__", module);
            }
        }
        Ok(Value::Class(Rc::new(Class::new(name, bases, namespace))))
    }

    /// `MAKE_FUNCTION` / `MAKE_CLOSURE`.
    ///
    /// Pops, from the top: the qualified name, the code, the closure cells (closures only),
    /// the annotations (discarded), the keyword-only default pairs and the positional
    /// defaults.
    pub(super) fn make_function(&mut self, argc: u32, has_closure: bool) -> RunResult<()> {
        self.pop()?;
        let code = match self.pop()? {
            Value::Code(code) => code,
            other => return Err(RunError::internal(format!("MAKE_FUNCTION without a code object: {other:?}"))),
        };
        let closure = if has_closure {
            match self.pop()? {
                Value::Tuple(cells) => Some(cells),
                other => return Err(RunError::internal(format!("MAKE_CLOSURE without a cell tuple: {other:?}"))),
            }
        } else {
            None
        };

        let annotation_count = ((argc >> 16) & 0x7fff) as usize;
        self.pop_n(annotation_count)?;
        let kw_count = ((argc >> 8) & 0xff) as usize;
        let mut kw_defaults = Vec::with_capacity(kw_count);
        let mut pairs = self.pop_n(2 * kw_count)?.into_iter();
        while let (Some(name), Some(value)) = (pairs.next(), pairs.next()) {
            match name {
                Value::Str(name) => kw_defaults.push((name, value)),
                other => return Err(RunError::internal(format!("keyword default name is not a string: {other:?}"))),
            }
        }
        let defaults = self.pop_n((argc & 0xff) as usize)?;

        let globals = self.frame()?.globals.clone();
        let name: Rc<str> = code.name().into();
        let func = Function::new(name, code, globals, defaults, kw_defaults, closure)?;
        self.push(Value::Function(Rc::new(func)))
    }
}

fn user_class(obj: &Value) -> Option<&Rc<Class>> {
    match obj {
        Value::Instance(instance) => Some(instance.class()),
        Value::Exception(exc) => match exc.class() {
            ExcClass::User(class) => Some(class),
            ExcClass::Builtin(_) => None,
        },
        _ => None,
    }
}

/// An unbound method called through its class must receive an instance of that class first.
fn check_unbound_receiver(method: &Method, args: &ArgValues) -> RunResult<()> {
    let first = args.args.first();
    let ok = first
        .and_then(user_class)
        .is_some_and(|class| class.is_subclass_of(method.class()));
    if ok {
        return Ok(());
    }
    let got = first.map_or_else(|| "nothing".into(), |value| value.type_name());
    Err(ExcType::type_error_unbound_method(method.name(), method.class().name(), &got))
}

fn is_iterable(value: &Value) -> bool {
    matches!(
        value,
        Value::List(_)
            | Value::Tuple(_)
            | Value::Str(_)
            | Value::Dict(_)
            | Value::Set(_)
            | Value::Range(_)
            | Value::Iterator(_)
            | Value::Generator(_)
            | Value::Instance(_)
    )
}

/// Name of a callable as used in argument errors.
pub(crate) fn callable_name(callable: &Value) -> String {
    match callable {
        Value::Function(func) => func.name().to_owned(),
        Value::Method(method) => method.name().to_owned(),
        Value::Builtin(builtin) => builtin.to_string(),
        Value::BuiltinMethod(method) => method.name().to_owned(),
        Value::Native(native) => native.name().to_owned(),
        Value::Type(t) => t.to_string(),
        Value::ExcType(e) => e.to_string(),
        Value::Class(class) => class.name().to_owned(),
        other => other.type_name().into_owned(),
    }
}
