use std::rc::Rc;

use byterun::{Code, CodeBuilder, CollectStringPrint, Const, ExecError, Namespace, NoPrint, Opcode, Value, VM};

fn run(code: Code) -> (Result<Value, ExecError>, String) {
    let mut writer = CollectStringPrint::new();
    let result = VM::new(&mut writer).run_code(code, Namespace::new_module("__main__"));
    (result, writer.into_output())
}

/// ```python
/// print('a', 1, None, sep=', ', end='.\n')
/// print('%s=%d (%.2f)' % ('pi', 3, 3.14159))
/// print('{0} + {1} = {0}{1}'.format('x', 'y'))
/// ```
fn formatting_program() -> Code {
    let mut b = CodeBuilder::new("<module>");
    b.set_filename("fmt.py")
        .set_line(1)
        .emit_name(Opcode::LoadName, "print")
        .load_const(Const::Str("a".into()))
        .load_const(Const::Int(1))
        .load_const(Const::None)
        .load_const(Const::Str("sep".into()))
        .load_const(Const::Str(", ".into()))
        .load_const(Const::Str("end".into()))
        .load_const(Const::Str(".\n".into()))
        .call_function(3, 2)
        .emit(Opcode::PopTop)
        .set_line(2)
        .emit_name(Opcode::LoadName, "print")
        .load_const(Const::Str("%s=%d (%.2f)".into()))
        .load_const(Const::Tuple(vec![
            Const::Str("pi".into()),
            Const::Int(3),
            Const::Float(3.14159),
        ]))
        .emit(Opcode::BinaryModulo)
        .call_function(1, 0)
        .emit(Opcode::PopTop)
        .set_line(3)
        .emit_name(Opcode::LoadName, "print")
        .load_const(Const::Str("{0} + {1} = {0}{1}".into()))
        .emit_name(Opcode::LoadAttr, "format")
        .load_const(Const::Str("x".into()))
        .load_const(Const::Str("y".into()))
        .call_function(2, 0)
        .call_function(1, 0)
        .emit(Opcode::PopTop)
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);
    b.build().unwrap()
}

const FORMATTING_OUTPUT: &str = "a, 1, None.\npi=3 (3.14)\nx + y = xy\n";

#[test]
fn print_and_string_formatting() {
    let (result, output) = run(formatting_program());
    assert!(result.is_ok());
    assert_eq!(output, FORMATTING_OUTPUT);
}

#[test]
fn print_expr_echoes_reprs() {
    let mut b = CodeBuilder::new("<module>");
    b.load_const(Const::Str("x".into()))
        .emit(Opcode::PrintExpr)
        .load_const(Const::None)
        .emit(Opcode::PrintExpr)
        .load_const(Const::Tuple(vec![Const::Float(1.0), Const::Ellipsis, Const::Bool(false)]))
        .emit(Opcode::PrintExpr)
        .load_const(Const::None)
        .emit(Opcode::ReturnValue);

    let (result, output) = run(b.build().unwrap());
    assert!(result.is_ok());
    assert_eq!(output, "'x'\n(1.0, Ellipsis, False)\n");
}

/// Emits `<build>` of an inline comprehension over `range(n)` binding `x`.
fn comprehension(b: &mut CodeBuilder, build: Opcode, element: &dyn Fn(&mut CodeBuilder), add: Opcode, n: i64) {
    let top = b.new_label();
    let done = b.new_label();
    b.emit_arg(build, 0)
        .emit_name(Opcode::LoadName, "range")
        .load_const(Const::Int(n))
        .call_function(1, 0)
        .emit(Opcode::GetIter)
        .place(top)
        .emit_jump(Opcode::ForIter, done)
        .emit_name(Opcode::StoreName, "x");
    element(b);
    b.emit_arg(add, 2).emit_jump(Opcode::JumpAbsolute, top).place(done);
}

#[test]
fn comprehension_helpers() {
    // [x * x for x in range(4)], {x % 2 for x in range(4)}, {x: -x for x in range(2)}
    let mut b = CodeBuilder::new("<module>");
    comprehension(
        &mut b,
        Opcode::BuildList,
        &|b| {
            b.emit_name(Opcode::LoadName, "x")
                .emit_name(Opcode::LoadName, "x")
                .emit(Opcode::BinaryMultiply);
        },
        Opcode::ListAppend,
        4,
    );
    comprehension(
        &mut b,
        Opcode::BuildSet,
        &|b| {
            b.emit_name(Opcode::LoadName, "x")
                .load_const(Const::Int(2))
                .emit(Opcode::BinaryModulo);
        },
        Opcode::SetAdd,
        4,
    );
    comprehension(
        &mut b,
        Opcode::BuildMap,
        &|b| {
            b.emit_name(Opcode::LoadName, "x")
                .emit(Opcode::UnaryNegative)
                .emit_name(Opcode::LoadName, "x");
        },
        Opcode::MapAdd,
        2,
    );
    b.emit_arg(Opcode::BuildTuple, 3).emit(Opcode::ReturnValue);

    let (result, _) = run(b.build().unwrap());
    assert_eq!(result.unwrap().py_repr(), "([0, 1, 4, 9], {0, 1}, {0: 0, 1: -1})");
}

#[test]
fn dumped_code_runs_the_same_after_loading() {
    let code = formatting_program();
    let bytes = code.dump().unwrap();
    let loaded = Code::load(&bytes).unwrap();
    assert_eq!(loaded.filename(), "fmt.py");
    assert_eq!(loaded.name(), "<module>");

    let (result, output) = run(loaded);
    assert!(result.is_ok());
    assert_eq!(output, FORMATTING_OUTPUT);
}

#[test]
fn nested_code_survives_a_dump() {
    let mut f = CodeBuilder::new("answer");
    f.set_params(&[]).load_const(Const::Int(42)).emit(Opcode::ReturnValue);
    let mut b = CodeBuilder::new("<module>");
    b.load_const(Const::Code(Rc::new(f.build().unwrap())))
        .load_const(Const::Str("answer".into()))
        .emit_arg(Opcode::MakeFunction, 0)
        .call_function(0, 0)
        .emit(Opcode::ReturnValue);

    let loaded = Code::load(&b.build().unwrap().dump().unwrap()).unwrap();
    let mut writer = NoPrint;
    let result = VM::new(&mut writer).run_code(loaded, Namespace::new_module("__main__"));
    assert_eq!(result.unwrap().py_repr(), "42");
}

#[test]
fn garbage_bytes_do_not_load() {
    assert!(Code::load(&[0xff, 0xff, 0xff]).is_err());
}
