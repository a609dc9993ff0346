//! Function parameter descriptors and argument binding.
//!
//! A [`Signature`] is built once when a function value is created (`MAKE_FUNCTION`), from the
//! code object's parameter layout plus the evaluated default values. Binding a call's
//! arguments is then a pure algorithm over that struct.

use std::{cell::RefCell, rc::Rc};

use crate::{
    args::ArgValues,
    bytecode::Code,
    exception_private::{ExcType, RunResult},
    types::Dict,
    value::Value,
};

/// The parameter layout of an interpreted function.
///
/// Parameters appear in the frame's locals in this order:
/// ```text
/// [args][kwonly][*var_args?][**var_kwargs?]
/// ```
/// which matches the order of `varnames` in the code object.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    /// Function name for error messages.
    name: Rc<str>,
    /// Positional-or-keyword parameters, e.g. `a, b` in `def f(a, b): ...`
    args: Vec<Rc<str>>,
    /// Keyword-only parameters, e.g. `c` in `def f(*, c): ...`
    kwonly: Vec<Rc<str>>,
    /// Collects excess positional arguments into a tuple.
    var_args: Option<Rc<str>>,
    /// Collects excess keyword arguments into a dict.
    var_kwargs: Option<Rc<str>>,
    /// Defaults for the last `defaults.len()` entries of `args`.
    defaults: Vec<Value>,
    /// Defaults for keyword-only parameters, by name.
    kw_defaults: Vec<(Rc<str>, Value)>,
}

impl Signature {
    /// Derives the parameter layout from a code object.
    ///
    /// # Arguments
    /// * `name` - Function name used in binding errors
    /// * `code` - Code object whose `varnames` start with the parameters
    /// * `defaults` - Evaluated positional defaults, applying to the trailing parameters
    /// * `kw_defaults` - Evaluated keyword-only defaults
    pub(crate) fn from_code(
        name: Rc<str>,
        code: &Code,
        defaults: Vec<Value>,
        kw_defaults: Vec<(Rc<str>, Value)>,
    ) -> RunResult<Self> {
        let varnames = code.varnames();
        let arg_count = usize::from(code.arg_count());
        let kwonly_count = usize::from(code.kwonly_arg_count());
        let mut next = arg_count + kwonly_count;
        if varnames.len() < next {
            return Err(crate::exception_private::RunError::internal(
                "code object declares more parameters than varnames",
            ));
        }
        let mut take_slot = |present: bool| -> RunResult<Option<Rc<str>>> {
            if !present {
                return Ok(None);
            }
            let slot = varnames
                .get(next)
                .cloned()
                .ok_or_else(|| crate::exception_private::RunError::internal("missing varargs slot in varnames"))?;
            next += 1;
            Ok(Some(slot))
        };
        let var_args = take_slot(code.flags().has_varargs())?;
        let var_kwargs = take_slot(code.flags().has_varkeywords())?;
        if defaults.len() > arg_count {
            return Err(ExcType::type_error(format!(
                "{name}() has more defaults than positional parameters"
            )));
        }
        Ok(Self {
            name,
            args: varnames[..arg_count].to_vec(),
            kwonly: varnames[arg_count..arg_count + kwonly_count].to_vec(),
            var_args,
            var_kwargs,
            defaults,
            kw_defaults,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn defaults(&self) -> &[Value] {
        &self.defaults
    }

    /// Number of positional parameters that must be supplied.
    #[must_use]
    pub fn required_positional_count(&self) -> usize {
        self.args.len() - self.defaults.len()
    }

    /// Binds call arguments to parameters according to Python's calling conventions.
    ///
    /// 1. Bind positional args to `args` in order.
    /// 2. Collect excess positional args into the `*args` tuple.
    /// 3. Bind keyword args to `args` and `kwonly`, or collect them into `**kwargs`.
    /// 4. Apply defaults for missing parameters.
    ///
    /// Returns `(name, value)` bindings in the locals layout order.
    pub(crate) fn bind(&self, call: ArgValues) -> RunResult<Vec<(Rc<str>, Value)>> {
        let ArgValues { args, kwargs } = call;
        let name = self.name.as_ref();

        if self.var_args.is_none() && args.len() > self.args.len() {
            return Err(ExcType::type_error_too_many_positional(
                name,
                self.args.len(),
                args.len(),
            ));
        }

        let named_count = self.args.len() + self.kwonly.len();
        let mut slots: Vec<Option<Value>> = vec![None; named_count];

        let mut positional = args.into_iter();
        for slot in slots.iter_mut().take(self.args.len()) {
            match positional.next() {
                Some(value) => *slot = Some(value),
                None => break,
            }
        }
        let excess: Vec<Value> = positional.collect();

        let mut extra_kwargs = Dict::new();
        for (key, value) in kwargs {
            let index = self
                .args
                .iter()
                .chain(&self.kwonly)
                .position(|param| *param == key);
            match index {
                Some(index) => {
                    if slots[index].is_some() {
                        return Err(ExcType::type_error_duplicate_arg(name, &key));
                    }
                    slots[index] = Some(value);
                }
                None if self.var_kwargs.is_some() => {
                    if extra_kwargs.get_str(&key).is_some() {
                        return Err(ExcType::type_error_duplicate_arg(name, &key));
                    }
                    extra_kwargs.set_str(&key, value);
                }
                None => return Err(ExcType::type_error_unexpected_keyword(name, &key)),
            }
        }

        let first_default = self.required_positional_count();
        let mut missing = Vec::new();
        for (i, param) in self.args.iter().enumerate() {
            if slots[i].is_none() {
                if i >= first_default {
                    slots[i] = Some(self.defaults[i - first_default].clone());
                } else {
                    missing.push(param.as_ref());
                }
            }
        }
        if !missing.is_empty() {
            return Err(ExcType::type_error_missing_positional_with_names(name, &missing));
        }

        for (i, param) in self.kwonly.iter().enumerate() {
            let slot = &mut slots[self.args.len() + i];
            if slot.is_none() {
                match self.kw_defaults.iter().find(|(key, _)| key == param) {
                    Some((_, default)) => *slot = Some(default.clone()),
                    None => missing.push(param.as_ref()),
                }
            }
        }
        if !missing.is_empty() {
            return Err(ExcType::type_error_missing_kwonly_with_names(name, &missing));
        }

        let mut bindings: Vec<(Rc<str>, Value)> = self
            .args
            .iter()
            .chain(&self.kwonly)
            .cloned()
            .zip(slots.into_iter().flatten())
            .collect();
        if let Some(var_args) = &self.var_args {
            bindings.push((var_args.clone(), Value::Tuple(Rc::new(excess))));
        }
        if let Some(var_kwargs) = &self.var_kwargs {
            bindings.push((var_kwargs.clone(), Value::Dict(Rc::new(RefCell::new(extra_kwargs)))));
        }
        Ok(bindings)
    }
}
