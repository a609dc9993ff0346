use std::rc::Rc;

use byterun::{
    ArgValues, Code, CodeBuilder, CodeFlags, CollectStringPrint, CompareOp, Const, ExecError, GeneratorState, Namespace,
    NoPrint, Opcode, Value, VM,
};

fn run(b: CodeBuilder) -> (Result<Value, ExecError>, String) {
    let mut writer = CollectStringPrint::new();
    let result = VM::new(&mut writer).run_code(b.build().unwrap(), Namespace::new_module("__main__"));
    (result, writer.into_output())
}

fn define(b: &mut CodeBuilder, code: Code) {
    let name = code.name().to_owned();
    b.load_const(Const::Code(Rc::new(code)))
        .load_const(Const::Str(name.as_str().into()))
        .emit_arg(Opcode::MakeFunction, 0)
        .emit_name(Opcode::StoreName, &name);
}

/// ```python
/// def count(n):
///     i = 0
///     while i < n:
///         yield i
///         i += 1
///     return 'done'
/// ```
fn count_code() -> Code {
    let mut g = CodeBuilder::new("count");
    let end = g.new_label();
    let top = g.new_label();
    let exit = g.new_label();
    g.set_params(&["n"])
        .add_flags(CodeFlags::GENERATOR)
        .emit(Opcode::GenStart)
        .load_const(Const::Int(0))
        .emit_name(Opcode::StoreFast, "i")
        .emit_jump(Opcode::SetupLoop, end)
        .place(top)
        .emit_name(Opcode::LoadFast, "i")
        .emit_name(Opcode::LoadFast, "n")
        .compare_op(CompareOp::Lt)
        .emit_jump(Opcode::PopJumpIfFalse, exit)
        .emit_name(Opcode::LoadFast, "i")
        .emit(Opcode::YieldValue)
        .emit(Opcode::PopTop)
        .emit_name(Opcode::LoadFast, "i")
        .load_const(Const::Int(1))
        .emit(Opcode::InplaceAdd)
        .emit_name(Opcode::StoreFast, "i")
        .emit_jump(Opcode::JumpAbsolute, top)
        .place(exit)
        .emit(Opcode::PopBlock)
        .place(end)
        .load_const(Const::Str("done".into()))
        .emit(Opcode::ReturnValue);
    g.build().unwrap()
}

#[test]
fn list_drains_a_generator() {
    let mut b = CodeBuilder::new("<module>");
    define(&mut b, count_code());
    b.emit_name(Opcode::LoadName, "list")
        .emit_name(Opcode::LoadName, "count")
        .load_const(Const::Int(3))
        .call_function(1, 0)
        .call_function(1, 0)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "[0, 1, 2]");
}

#[test]
fn for_loop_over_a_generator() {
    // for x in count(2): print(x)
    let mut b = CodeBuilder::new("<module>");
    define(&mut b, count_code());
    let end = b.new_label();
    let top = b.new_label();
    let exhausted = b.new_label();
    b.emit_jump(Opcode::SetupLoop, end)
        .emit_name(Opcode::LoadName, "count")
        .load_const(Const::Int(2))
        .call_function(1, 0)
        .emit(Opcode::GetIter)
        .place(top)
        .emit_jump(Opcode::ForIter, exhausted)
        .emit_name(Opcode::StoreName, "x")
        .emit_name(Opcode::LoadName, "print")
        .emit_name(Opcode::LoadName, "x")
        .call_function(1, 0)
        .emit(Opcode::PopTop)
        .emit_jump(Opcode::JumpAbsolute, top)
        .place(exhausted)
        .emit(Opcode::PopBlock)
        .place(end)
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);

    let (result, output) = run(b);
    assert!(result.is_ok());
    assert_eq!(output, "0\n1\n");
}

#[test]
fn host_resumes_a_generator_to_completion() {
    let globals = Namespace::new_module("__main__");
    let mut b = CodeBuilder::new("<module>");
    define(&mut b, count_code());
    b.load_const(Const::None).emit(Opcode::ReturnValue);

    let mut writer = NoPrint;
    let mut vm = VM::new(&mut writer);
    vm.run_code(b.build().unwrap(), globals.clone()).unwrap();
    let generator = vm
        .call(&globals.get("count").unwrap(), ArgValues::positional(vec![Value::Int(2)]))
        .unwrap();
    assert!(matches!(generator, Value::Generator(_)));

    let mut states = Vec::new();
    for _ in 0..4 {
        states.push(match vm.resume_generator(&generator, Value::None).unwrap() {
            GeneratorState::Yielded(value) => format!("yield {}", value.py_repr()),
            GeneratorState::Complete(value) => format!("return {}", value.py_repr()),
        });
    }
    assert_eq!(states, ["yield 0", "yield 1", "return 'done'", "return None"]);
}

/// ```python
/// def running_total():
///     total = 0
///     while True:
///         x = yield total
///         total += x
/// ```
fn running_total_code() -> Code {
    let mut g = CodeBuilder::new("running_total");
    let top = g.new_label();
    let end = g.new_label();
    g.set_params(&[])
        .add_flags(CodeFlags::GENERATOR)
        .emit(Opcode::GenStart)
        .load_const(Const::Int(0))
        .emit_name(Opcode::StoreFast, "total")
        .emit_jump(Opcode::SetupLoop, end)
        .place(top)
        .emit_name(Opcode::LoadFast, "total")
        .emit(Opcode::YieldValue)
        .emit_name(Opcode::StoreFast, "x")
        .emit_name(Opcode::LoadFast, "total")
        .emit_name(Opcode::LoadFast, "x")
        .emit(Opcode::InplaceAdd)
        .emit_name(Opcode::StoreFast, "total")
        .emit_jump(Opcode::JumpAbsolute, top)
        .emit(Opcode::PopBlock)
        .place(end)
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);
    g.build().unwrap()
}

#[test]
fn send_delivers_values_into_the_generator() {
    // g = running_total(); return next(g), g.send(5), g.send(10)
    let mut b = CodeBuilder::new("<module>");
    define(&mut b, running_total_code());
    b.emit_name(Opcode::LoadName, "running_total")
        .call_function(0, 0)
        .emit_name(Opcode::StoreName, "g")
        .emit_name(Opcode::LoadName, "next")
        .emit_name(Opcode::LoadName, "g")
        .call_function(1, 0)
        .emit_name(Opcode::LoadName, "g")
        .emit_name(Opcode::LoadAttr, "send")
        .load_const(Const::Int(5))
        .call_function(1, 0)
        .emit_name(Opcode::LoadName, "g")
        .emit_name(Opcode::LoadAttr, "send")
        .load_const(Const::Int(10))
        .call_function(1, 0)
        .emit_arg(Opcode::BuildTuple, 3)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "(0, 5, 15)");
}

#[test]
fn sending_to_a_fresh_generator_is_an_error() {
    let mut b = CodeBuilder::new("<module>");
    define(&mut b, running_total_code());
    b.emit_name(Opcode::LoadName, "running_total")
        .call_function(0, 0)
        .emit_name(Opcode::LoadAttr, "send")
        .load_const(Const::Int(1))
        .call_function(1, 0)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(
        result.unwrap_err().exception().unwrap().summary(),
        "TypeError: can't send non-None value to a just-started generator"
    );
}

/// ```python
/// def inner():
///     yield 1
///     yield 2
///     return 3
/// def outer():
///     r = yield from inner()
///     yield r
/// list(outer())
/// ```
#[test]
fn yield_from_delegates_and_captures_the_return_value() {
    let mut inner = CodeBuilder::new("inner");
    inner
        .set_params(&[])
        .add_flags(CodeFlags::GENERATOR)
        .emit(Opcode::GenStart)
        .load_const(Const::Int(1))
        .emit(Opcode::YieldValue)
        .emit(Opcode::PopTop)
        .load_const(Const::Int(2))
        .emit(Opcode::YieldValue)
        .emit(Opcode::PopTop)
        .load_const(Const::Int(3))
        .emit(Opcode::ReturnValue);

    let mut outer = CodeBuilder::new("outer");
    outer
        .set_params(&[])
        .add_flags(CodeFlags::GENERATOR)
        .emit(Opcode::GenStart)
        .emit_name(Opcode::LoadGlobal, "inner")
        .call_function(0, 0)
        .emit(Opcode::GetIter)
        .load_const(Const::None)
        .emit(Opcode::YieldFrom)
        .emit_name(Opcode::StoreFast, "r")
        .emit_name(Opcode::LoadFast, "r")
        .emit(Opcode::YieldValue)
        .emit(Opcode::PopTop)
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);

    let mut b = CodeBuilder::new("<module>");
    define(&mut b, inner.build().unwrap());
    define(&mut b, outer.build().unwrap());
    b.emit_name(Opcode::LoadName, "list")
        .emit_name(Opcode::LoadName, "outer")
        .call_function(0, 0)
        .call_function(1, 0)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "[1, 2, 3]");
}

#[test]
fn yield_from_a_plain_iterable() {
    // def g(): yield from [7, 8]
    let mut g = CodeBuilder::new("g");
    g.set_params(&[])
        .add_flags(CodeFlags::GENERATOR)
        .emit(Opcode::GenStart)
        .load_const(Const::Int(7))
        .load_const(Const::Int(8))
        .emit_arg(Opcode::BuildList, 2)
        .emit(Opcode::GetIter)
        .load_const(Const::None)
        .emit(Opcode::YieldFrom)
        .emit(Opcode::PopTop)
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);

    let mut b = CodeBuilder::new("<module>");
    define(&mut b, g.build().unwrap());
    b.emit_name(Opcode::LoadName, "tuple")
        .emit_name(Opcode::LoadName, "g")
        .call_function(0, 0)
        .call_function(1, 0)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "(7, 8)");
}

#[test]
fn next_on_an_exhausted_generator_raises_stop_iteration() {
    // g = count(1); next(g); next(g)
    let mut b = CodeBuilder::new("<module>");
    define(&mut b, count_code());
    b.emit_name(Opcode::LoadName, "count")
        .load_const(Const::Int(1))
        .call_function(1, 0)
        .emit_name(Opcode::StoreName, "g")
        .emit_name(Opcode::LoadName, "next")
        .emit_name(Opcode::LoadName, "g")
        .call_function(1, 0)
        .emit(Opcode::PopTop)
        .emit_name(Opcode::LoadName, "next")
        .emit_name(Opcode::LoadName, "g")
        .call_function(1, 0)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap_err().exception().unwrap().summary(), "StopIteration: done");
}

#[test]
fn exception_inside_a_generator_finishes_it() {
    // def bad(): yield 1 / 0
    let mut bad = CodeBuilder::new("bad");
    bad.set_params(&[])
        .add_flags(CodeFlags::GENERATOR)
        .emit(Opcode::GenStart)
        .load_const(Const::Int(1))
        .load_const(Const::Int(0))
        .emit(Opcode::BinaryTrueDivide)
        .emit(Opcode::YieldValue)
        .emit(Opcode::PopTop)
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);

    let globals = Namespace::new_module("__main__");
    let mut b = CodeBuilder::new("<module>");
    define(&mut b, bad.build().unwrap());
    b.load_const(Const::None).emit(Opcode::ReturnValue);

    let mut writer = NoPrint;
    let mut vm = VM::new(&mut writer);
    vm.run_code(b.build().unwrap(), globals.clone()).unwrap();
    let generator = vm.call(&globals.get("bad").unwrap(), ArgValues::default()).unwrap();
    let err = vm.resume_generator(&generator, Value::None).unwrap_err();
    assert_eq!(err.exception().unwrap().summary(), "ZeroDivisionError: division by zero");
    assert!(matches!(
        vm.resume_generator(&generator, Value::None).unwrap(),
        GeneratorState::Complete(Value::None)
    ));
}

/// `def g(): yield next(<target>)`
fn g_advancing(target: &str) -> Code {
    let mut g = CodeBuilder::new("g");
    g.set_params(&[])
        .add_flags(CodeFlags::GENERATOR)
        .emit(Opcode::GenStart)
        .emit_name(Opcode::LoadGlobal, "next")
        .emit_name(Opcode::LoadGlobal, target)
        .call_function(1, 0)
        .emit(Opcode::YieldValue)
        .emit(Opcode::PopTop)
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);
    g.build().unwrap()
}

#[test]
fn generator_advancing_itself_is_already_executing() {
    // gen = g(); next(gen)
    let mut b = CodeBuilder::new("<module>");
    define(&mut b, g_advancing("gen"));
    b.emit_name(Opcode::LoadName, "g")
        .call_function(0, 0)
        .emit_name(Opcode::StoreName, "gen")
        .emit_name(Opcode::LoadName, "next")
        .emit_name(Opcode::LoadName, "gen")
        .call_function(1, 0)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(
        result.unwrap_err().exception().unwrap().summary(),
        "ValueError: generator already executing"
    );
}

#[test]
fn wrapped_generator_advancing_its_wrapper_is_already_executing() {
    // e = enumerate(g()); next(e)
    let mut b = CodeBuilder::new("<module>");
    define(&mut b, g_advancing("e"));
    b.emit_name(Opcode::LoadName, "enumerate")
        .emit_name(Opcode::LoadName, "g")
        .call_function(0, 0)
        .call_function(1, 0)
        .emit_name(Opcode::StoreName, "e")
        .emit_name(Opcode::LoadName, "next")
        .emit_name(Opcode::LoadName, "e")
        .call_function(1, 0)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(
        result.unwrap_err().exception().unwrap().summary(),
        "ValueError: generator already executing"
    );
}
