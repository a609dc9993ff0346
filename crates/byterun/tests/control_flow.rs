use byterun::{BinaryOp, CodeBuilder, CollectStringPrint, CompareOp, Const, ExecError, Namespace, Opcode, Value, VM};

fn run(b: CodeBuilder) -> (Result<Value, ExecError>, String) {
    let mut writer = CollectStringPrint::new();
    let result = VM::new(&mut writer).run_code(b.build().unwrap(), Namespace::new_module("__main__"));
    (result, writer.into_output())
}

fn print_name(b: &mut CodeBuilder, name: &str) {
    b.emit_name(Opcode::LoadName, "print")
        .emit_name(Opcode::LoadName, name)
        .call_function(1, 0)
        .emit(Opcode::PopTop);
}

fn return_none(b: &mut CodeBuilder) {
    b.load_const(Const::None).emit(Opcode::ReturnValue);
}

/// ```python
/// total = 0
/// i = 0
/// while True:
///     i = i + 1
///     if i > 8:
///         break
///     if i % 2:
///         continue
///     total += i
/// print(total)
/// ```
#[test]
fn while_loop_with_break_and_continue() {
    let mut b = CodeBuilder::new("<module>");
    let after = b.new_label();
    let top = b.new_label();
    let no_break = b.new_label();
    let accumulate = b.new_label();
    b.load_const(Const::Int(0))
        .emit_name(Opcode::StoreName, "total")
        .load_const(Const::Int(0))
        .emit_name(Opcode::StoreName, "i")
        .emit_jump(Opcode::SetupLoop, after)
        .place(top)
        .emit_name(Opcode::LoadName, "i")
        .load_const(Const::Int(1))
        .emit(Opcode::BinaryAdd)
        .emit_name(Opcode::StoreName, "i")
        .emit_name(Opcode::LoadName, "i")
        .load_const(Const::Int(8))
        .compare_op(CompareOp::Gt)
        .emit_jump(Opcode::PopJumpIfFalse, no_break)
        .emit(Opcode::BreakLoop)
        .place(no_break)
        .emit_name(Opcode::LoadName, "i")
        .load_const(Const::Int(2))
        .emit(Opcode::BinaryModulo)
        .emit_jump(Opcode::PopJumpIfFalse, accumulate)
        .emit_jump(Opcode::ContinueLoop, top)
        .place(accumulate)
        .emit_name(Opcode::LoadName, "total")
        .emit_name(Opcode::LoadName, "i")
        .emit(Opcode::InplaceAdd)
        .emit_name(Opcode::StoreName, "total")
        .emit_jump(Opcode::JumpAbsolute, top)
        .emit(Opcode::PopBlock)
        .place(after);
    print_name(&mut b, "total");
    return_none(&mut b);

    let (result, output) = run(b);
    assert!(matches!(result, Ok(Value::None)));
    assert_eq!(output, "20\n");
}

/// ```python
/// for x in range(3):
///     print(x)
/// else:
///     print('done')
/// ```
#[test]
fn for_loop_with_else() {
    let mut b = CodeBuilder::new("<module>");
    let end = b.new_label();
    let top = b.new_label();
    let exhausted = b.new_label();
    b.emit_jump(Opcode::SetupLoop, end)
        .emit_name(Opcode::LoadName, "range")
        .load_const(Const::Int(3))
        .call_function(1, 0)
        .emit(Opcode::GetIter)
        .place(top)
        .emit_jump(Opcode::ForIter, exhausted)
        .emit_name(Opcode::StoreName, "x");
    print_name(&mut b, "x");
    b.emit_jump(Opcode::JumpAbsolute, top)
        .place(exhausted)
        .emit(Opcode::PopBlock)
        .emit_name(Opcode::LoadName, "print")
        .load_const(Const::Str("done".into()))
        .call_function(1, 0)
        .emit(Opcode::PopTop)
        .place(end);
    return_none(&mut b);

    let (result, output) = run(b);
    assert!(result.is_ok());
    assert_eq!(output, "0\n1\n2\ndone\n");
}

/// ```python
/// for x in [1, 2]:
///     try:
///         break
///     finally:
///         print('cleanup')
/// print('after')
/// ```
#[test]
fn break_runs_enclosing_finally() {
    let mut b = CodeBuilder::new("<module>");
    let end = b.new_label();
    let top = b.new_label();
    let exhausted = b.new_label();
    let finally = b.new_label();
    b.emit_jump(Opcode::SetupLoop, end)
        .load_const(Const::Int(1))
        .load_const(Const::Int(2))
        .emit_arg(Opcode::BuildList, 2)
        .emit(Opcode::GetIter)
        .place(top)
        .emit_jump(Opcode::ForIter, exhausted)
        .emit_name(Opcode::StoreName, "x")
        .emit_jump(Opcode::SetupFinally, finally)
        .emit(Opcode::BreakLoop)
        .emit(Opcode::PopBlock)
        .load_const(Const::None)
        .place(finally)
        .emit_name(Opcode::LoadName, "print")
        .load_const(Const::Str("cleanup".into()))
        .call_function(1, 0)
        .emit(Opcode::PopTop)
        .emit(Opcode::EndFinally)
        .emit_jump(Opcode::JumpAbsolute, top)
        .place(exhausted)
        .emit(Opcode::PopBlock)
        .place(end)
        .emit_name(Opcode::LoadName, "print")
        .load_const(Const::Str("after".into()))
        .call_function(1, 0)
        .emit(Opcode::PopTop);
    return_none(&mut b);

    let (result, output) = run(b);
    assert!(result.is_ok());
    assert_eq!(output, "cleanup\nafter\n");
}

#[test]
fn short_circuit_jumps_keep_the_deciding_value() {
    // (0 or 5, 3 and 0)
    let mut b = CodeBuilder::new("<module>");
    let or_end = b.new_label();
    let and_end = b.new_label();
    b.load_const(Const::Int(0))
        .emit_jump(Opcode::JumpIfTrueOrPop, or_end)
        .load_const(Const::Int(5))
        .place(or_end)
        .load_const(Const::Int(3))
        .emit_jump(Opcode::JumpIfFalseOrPop, and_end)
        .load_const(Const::Int(0))
        .place(and_end)
        .emit_arg(Opcode::BuildTuple, 2)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "(5, 0)");
}

#[test]
fn stack_shuffles() {
    // ROT_THREE then ROT_TWO reverses the top three entries
    let mut b = CodeBuilder::new("<module>");
    b.load_const(Const::Int(1))
        .load_const(Const::Int(2))
        .load_const(Const::Int(3))
        .emit(Opcode::RotThree)
        .emit(Opcode::RotTwo)
        .emit_arg(Opcode::BuildTuple, 3)
        .emit(Opcode::DupTop)
        .emit(Opcode::BinaryAdd)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "(3, 2, 1, 3, 2, 1)");
}

#[test]
fn unpack_and_subscript() {
    // first, second = 'ab'; d = {}; d[first] = second; return d, [1, 2, 3][1:]
    let mut b = CodeBuilder::new("<module>");
    b.load_const(Const::Str("ab".into()))
        .emit_arg(Opcode::UnpackSequence, 2)
        .emit_name(Opcode::StoreName, "first")
        .emit_name(Opcode::StoreName, "second")
        .emit_arg(Opcode::BuildMap, 0)
        .emit_name(Opcode::StoreName, "d")
        .emit_name(Opcode::LoadName, "second")
        .emit_name(Opcode::LoadName, "d")
        .emit_name(Opcode::LoadName, "first")
        .emit(Opcode::StoreSubscr)
        .emit_name(Opcode::LoadName, "d")
        .load_const(Const::Int(1))
        .load_const(Const::Int(2))
        .load_const(Const::Int(3))
        .emit_arg(Opcode::BuildList, 3)
        .load_const(Const::Int(1))
        .load_const(Const::None)
        .emit_arg(Opcode::BuildSlice, 2)
        .emit(Opcode::BinarySubscr)
        .emit_arg(Opcode::BuildTuple, 2)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "({'a': 'b'}, [2, 3])");
}

#[test]
fn unpack_length_mismatch_raises() {
    let mut b = CodeBuilder::new("<module>");
    b.load_const(Const::Tuple(vec![Const::Int(1), Const::Int(2), Const::Int(3)]))
        .emit_arg(Opcode::UnpackSequence, 2)
        .emit(Opcode::PopTop)
        .emit(Opcode::PopTop);
    return_none(&mut b);

    let (result, _) = run(b);
    let err = result.unwrap_err();
    assert_eq!(err.exception().unwrap().summary(), "ValueError: too many values to unpack (expected 2)");
}

#[test]
fn undefined_name() {
    let mut b = CodeBuilder::new("<module>");
    b.emit_name(Opcode::LoadName, "missing").emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap_err().exception().unwrap().summary(), "NameError: name 'missing' is not defined");
}

#[test]
fn leftover_stack_is_an_engine_error() {
    let mut b = CodeBuilder::new("<module>");
    b.load_const(Const::Int(1));
    return_none(&mut b);

    let (result, _) = run(b);
    let Err(ExecError::Internal(message)) = result else {
        panic!("expected an internal error");
    };
    assert_eq!(message, "Data remains on stack!");
}

#[test]
fn binary_op_table_matches_opcodes() {
    assert_eq!(BinaryOp::Add.symbol(), "+");
    let mut b = CodeBuilder::new("<module>");
    b.load_const(Const::Int(7))
        .load_const(Const::Int(2))
        .emit(Opcode::BinaryFloorDivide)
        .load_const(Const::Int(-7))
        .load_const(Const::Int(2))
        .emit(Opcode::BinaryModulo)
        .load_const(Const::Int(7))
        .load_const(Const::Int(2))
        .emit(Opcode::BinaryTrueDivide)
        .load_const(Const::Int(2))
        .load_const(Const::Int(10))
        .emit(Opcode::BinaryPower)
        .emit_arg(Opcode::BuildTuple, 4)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "(3, 1, 3.5, 1024)");
}

/// ```python
/// total = 0
/// for x in [1, 2, 3]:
///     total += x
///     if total > 2:
///         break
/// return total
/// ```
#[test]
fn break_leaves_the_loop_through_its_block() {
    let mut b = CodeBuilder::new("<module>");
    let end = b.new_label();
    let top = b.new_label();
    let exhausted = b.new_label();
    b.load_const(Const::Int(0))
        .emit_name(Opcode::StoreName, "total")
        .emit_jump(Opcode::SetupLoop, end)
        .load_const(Const::Int(1))
        .load_const(Const::Int(2))
        .load_const(Const::Int(3))
        .emit_arg(Opcode::BuildList, 3)
        .emit(Opcode::GetIter)
        .place(top)
        .emit_jump(Opcode::ForIter, exhausted)
        .emit_name(Opcode::StoreName, "x")
        .emit_name(Opcode::LoadName, "total")
        .emit_name(Opcode::LoadName, "x")
        .emit(Opcode::InplaceAdd)
        .emit_name(Opcode::StoreName, "total")
        .emit_name(Opcode::LoadName, "total")
        .load_const(Const::Int(2))
        .compare_op(CompareOp::Gt)
        .emit_jump(Opcode::PopJumpIfFalse, top)
        .emit(Opcode::BreakLoop)
        .emit_jump(Opcode::JumpAbsolute, top)
        .place(exhausted)
        .emit(Opcode::PopBlock)
        .place(end)
        .emit_name(Opcode::LoadName, "total")
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap().py_repr(), "3");
}

#[test]
fn impossible_repetition_raises_memory_error() {
    // [0] * (1 << 62)
    let mut b = CodeBuilder::new("<module>");
    b.load_const(Const::Int(0))
        .emit_arg(Opcode::BuildList, 1)
        .load_const(Const::Int(1 << 62))
        .emit(Opcode::BinaryMultiply)
        .emit(Opcode::ReturnValue);

    let (result, _) = run(b);
    assert_eq!(result.unwrap_err().exception().unwrap().summary(), "MemoryError");
}
