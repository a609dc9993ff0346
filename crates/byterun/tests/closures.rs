use std::rc::Rc;

use byterun::{Code, CodeBuilder, CollectStringPrint, Const, ExecError, Namespace, Opcode, Value, VM};

fn run(b: CodeBuilder) -> (Result<Value, ExecError>, String) {
    let mut writer = CollectStringPrint::new();
    let result = VM::new(&mut writer).run_code(b.build().unwrap(), Namespace::new_module("__main__"));
    (result, writer.into_output())
}

/// Pushes `code` and its qualified name, then `MAKE_CLOSURE` over the cell tuple below them.
fn make_closure(b: &mut CodeBuilder, code: Code, qualname: &str) {
    b.load_const(Const::Code(Rc::new(code)))
        .load_const(Const::Str(qualname.into()))
        .emit_arg(Opcode::MakeClosure, 0);
}

fn make_function(b: &mut CodeBuilder, code: Code) {
    let name = code.name().to_owned();
    b.load_const(Const::Code(Rc::new(code)))
        .load_const(Const::Str(name.as_str().into()))
        .emit_arg(Opcode::MakeFunction, 0);
}

/// ```python
/// def outer(x):
///     def inner(y):
///         return x + y
///     return inner
/// print(outer(10)(5))
/// ```
#[test]
fn inner_function_reads_enclosing_parameter() {
    let mut inner = CodeBuilder::new("inner");
    inner
        .set_params(&["y"])
        .set_freevars(&["x"])
        .emit_name(Opcode::LoadDeref, "x")
        .emit_name(Opcode::LoadFast, "y")
        .emit(Opcode::BinaryAdd)
        .emit(Opcode::ReturnValue);

    let mut outer = CodeBuilder::new("outer");
    outer
        .set_params(&["x"])
        .set_cellvars(&["x"])
        .emit_name(Opcode::LoadClosure, "x")
        .emit_arg(Opcode::BuildTuple, 1);
    make_closure(&mut outer, inner.build().unwrap(), "outer.<locals>.inner");
    outer
        .emit_name(Opcode::StoreFast, "inner")
        .emit_name(Opcode::LoadFast, "inner")
        .emit(Opcode::ReturnValue);

    let mut b = CodeBuilder::new("<module>");
    make_function(&mut b, outer.build().unwrap());
    b.emit_name(Opcode::StoreName, "outer")
        .emit_name(Opcode::LoadName, "print")
        .emit_name(Opcode::LoadName, "outer")
        .load_const(Const::Int(10))
        .call_function(1, 0)
        .load_const(Const::Int(5))
        .call_function(1, 0)
        .call_function(1, 0)
        .emit(Opcode::PopTop)
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);

    let (result, output) = run(b);
    assert!(result.is_ok());
    assert_eq!(output, "15\n");
}

/// ```python
/// def make():
///     n = 0
///     def inc():
///         nonlocal n
///         n += 1
///         return n
///     return inc
/// c = make()
/// c(); c()
/// d = make()
/// return c(), d()
/// ```
#[test]
fn nonlocal_counter_keeps_state_per_closure() {
    let mut inc = CodeBuilder::new("inc");
    inc.set_params(&[])
        .set_freevars(&["n"])
        .emit_name(Opcode::LoadDeref, "n")
        .load_const(Const::Int(1))
        .emit(Opcode::InplaceAdd)
        .emit_name(Opcode::StoreDeref, "n")
        .emit_name(Opcode::LoadDeref, "n")
        .emit(Opcode::ReturnValue);

    let mut make = CodeBuilder::new("make");
    make.set_params(&[])
        .set_cellvars(&["n"])
        .load_const(Const::Int(0))
        .emit_name(Opcode::StoreDeref, "n")
        .emit_name(Opcode::LoadClosure, "n")
        .emit_arg(Opcode::BuildTuple, 1);
    make_closure(&mut make, inc.build().unwrap(), "make.<locals>.inc");
    make.emit(Opcode::ReturnValue);

    let mut b = CodeBuilder::new("<module>");
    make_function(&mut b, make.build().unwrap());
    b.emit_name(Opcode::StoreName, "make")
        .emit_name(Opcode::LoadName, "make")
        .call_function(0, 0)
        .emit_name(Opcode::StoreName, "c")
        .emit_name(Opcode::LoadName, "c")
        .call_function(0, 0)
        .emit(Opcode::PopTop)
        .emit_name(Opcode::LoadName, "c")
        .call_function(0, 0)
        .emit(Opcode::PopTop)
        .emit_name(Opcode::LoadName, "make")
        .call_function(0, 0)
        .emit_name(Opcode::StoreName, "d")
        .emit_name(Opcode::LoadName, "c")
        .call_function(0, 0)
        .emit_name(Opcode::LoadName, "d")
        .call_function(0, 0)
        .emit_arg(Opcode::BuildTuple, 2)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "(3, 1)");
}

/// ```python
/// def outer():
///     def inner():
///         return x
///     r = inner()
///     x = 1
/// outer()
/// ```
#[test]
fn free_variable_read_before_assignment() {
    let mut inner = CodeBuilder::new("inner");
    inner
        .set_params(&[])
        .set_freevars(&["x"])
        .emit_name(Opcode::LoadDeref, "x")
        .emit(Opcode::ReturnValue);

    let mut outer = CodeBuilder::new("outer");
    outer
        .set_params(&[])
        .set_cellvars(&["x"])
        .emit_name(Opcode::LoadClosure, "x")
        .emit_arg(Opcode::BuildTuple, 1);
    make_closure(&mut outer, inner.build().unwrap(), "outer.<locals>.inner");
    outer
        .call_function(0, 0)
        .emit_name(Opcode::StoreFast, "r")
        .load_const(Const::Int(1))
        .emit_name(Opcode::StoreDeref, "x")
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);

    let mut b = CodeBuilder::new("<module>");
    make_function(&mut b, outer.build().unwrap());
    b.call_function(0, 0).emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    let err = result.unwrap_err();
    let exc = err.exception().unwrap();
    assert_eq!(
        exc.summary(),
        "NameError: free variable 'x' referenced before assignment in enclosing scope"
    );
    let names: Vec<_> = exc.traceback().iter().map(|frame| frame.name.as_str()).collect();
    assert_eq!(names, ["<module>", "outer", "inner"]);
}

/// ```python
/// def f():
///     y = 2
///     del y
///     return y
/// ```
#[test]
fn deleted_local_is_unbound() {
    let mut f = CodeBuilder::new("f");
    f.set_params(&[])
        .load_const(Const::Int(2))
        .emit_name(Opcode::StoreFast, "y")
        .emit_name(Opcode::DeleteFast, "y")
        .emit_name(Opcode::LoadFast, "y")
        .emit(Opcode::ReturnValue);

    let mut b = CodeBuilder::new("<module>");
    make_function(&mut b, f.build().unwrap());
    b.call_function(0, 0).emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(
        result.unwrap_err().exception().unwrap().summary(),
        "UnboundLocalError: local variable 'y' referenced before assignment"
    );
}

/// ```python
/// x = 'global'
/// def f():
///     global x
///     x = 'changed'
/// f()
/// return x
/// ```
#[test]
fn store_global_from_a_function() {
    let mut f = CodeBuilder::new("f");
    f.set_params(&[])
        .load_const(Const::Str("changed".into()))
        .emit_name(Opcode::StoreGlobal, "x")
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);

    let mut b = CodeBuilder::new("<module>");
    b.load_const(Const::Str("global".into())).emit_name(Opcode::StoreName, "x");
    make_function(&mut b, f.build().unwrap());
    b.call_function(0, 0)
        .emit(Opcode::PopTop)
        .emit_name(Opcode::LoadName, "x")
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_str(), "changed");
}

/// ```python
/// def make():
///     counter = 0
///     def bump():
///         nonlocal counter
///         counter += 1
///         return counter
///     bump()
///     bump()
///     return bump
/// return make()()
/// ```
#[test]
fn returned_closure_sees_writes_made_before_its_frame_returned() {
    let mut bump = CodeBuilder::new("bump");
    bump.set_params(&[])
        .set_freevars(&["counter"])
        .emit_name(Opcode::LoadDeref, "counter")
        .load_const(Const::Int(1))
        .emit(Opcode::InplaceAdd)
        .emit_name(Opcode::StoreDeref, "counter")
        .emit_name(Opcode::LoadDeref, "counter")
        .emit(Opcode::ReturnValue);

    let mut make = CodeBuilder::new("make");
    make.set_params(&[])
        .set_cellvars(&["counter"])
        .load_const(Const::Int(0))
        .emit_name(Opcode::StoreDeref, "counter")
        .emit_name(Opcode::LoadClosure, "counter")
        .emit_arg(Opcode::BuildTuple, 1);
    make_closure(&mut make, bump.build().unwrap(), "make.<locals>.bump");
    make.emit_name(Opcode::StoreFast, "bump");
    for _ in 0..2 {
        make.emit_name(Opcode::LoadFast, "bump").call_function(0, 0).emit(Opcode::PopTop);
    }
    make.emit_name(Opcode::LoadFast, "bump").emit(Opcode::ReturnValue);

    let mut b = CodeBuilder::new("<module>");
    make_function(&mut b, make.build().unwrap());
    b.call_function(0, 0).call_function(0, 0).emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "3");
}
