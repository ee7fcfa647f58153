//! End-to-end tests for the virtual machine.

use indoc::indoc;
use pretty_assertions::assert_eq;

use crate::{
    api::VmOptions,
    compiler::Compiler,
    parser,
    test_utils,
    values::{CompiledFunction, Value},
    vm::{Bytecode, Instructions, Opcode, RuntimeError, Vm, make},
};

fn run_vm(source: &str, options: &VmOptions) -> Result<Vm, RuntimeError> {
    let program = parser::parse(source).unwrap();
    let bytecode = Compiler::compile_program(&program).unwrap();
    let mut vm = Vm::with_globals(bytecode, Vec::new(), options);
    vm.run()?;
    Ok(vm)
}

/// Helper function to compile and run a source program, returning the
/// last popped value.
fn run(source: &str) -> Value {
    let vm = run_vm(source, &VmOptions::default())
        .unwrap_or_else(|e| panic!("runtime error in {:?}: {}", source, e));
    vm.last_popped()
}

fn run_err(source: &str) -> RuntimeError {
    match run_vm(source, &VmOptions::default()) {
        Ok(vm) => panic!("expected a runtime error, got {}", vm.last_popped()),
        Err(err) => err,
    }
}

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().map(|&i| Value::Int(i)).collect())
}

#[test]
fn test_integer_arithmetic() {
    let cases = [
        ("1", 1),
        ("2", 2),
        ("1 + 2", 3),
        ("1 - 2", -1),
        ("1 * 2", 2),
        ("4 / 2", 2),
        ("50 / 2 * 2 + 10 - 5", 55),
        ("5 * (2 + 10)", 60),
        ("-5", -5),
        ("-50 + 100 + -50", 0),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
        ("7 / 2", 3),
        ("-7 / 2", -3),
    ];
    for (source, expected) in cases {
        assert_eq!(run(source), Value::Int(expected), "{}", source);
    }
}

#[test]
fn test_integer_overflow_wraps() {
    assert_eq!(
        run("9223372036854775807 + 1"),
        Value::Int(i64::MIN)
    );
    assert_eq!(run("-9223372036854775807 - 2"), Value::Int(i64::MAX));
}

#[test]
fn test_boolean_expressions() {
    let cases = [
        ("true", true),
        ("false", false),
        ("1 < 2", true),
        ("1 > 2", false),
        ("1 < 1", false),
        ("1 == 1", true),
        ("1 != 1", false),
        ("true == true", true),
        ("true != false", true),
        ("(1 < 2) == true", true),
        ("(1 > 2) == false", true),
        ("!true", false),
        ("!!true", true),
        ("!5", false),
        ("!!5", true),
        ("!(if (false) { 5; })", true),
        (r#""a" == "a""#, true),
        (r#""a" != "b""#, true),
        ("1 == true", false),
        ("1 != \"1\"", true),
    ];
    for (source, expected) in cases {
        assert_eq!(run(source), Value::Bool(expected), "{}", source);
    }
}

#[test]
fn test_less_than_matches_swapped_greater_than() {
    for (a, b) in [(1, 2), (2, 1), (3, 3), (-4, 7)] {
        assert_eq!(
            run(&format!("{} < {}", a, b)),
            run(&format!("{} > {}", b, a))
        );
    }
}

#[test]
fn test_conditionals() {
    let cases = [
        ("if (true) { 10 }", Value::Int(10)),
        ("if (true) { 10 } else { 20 }", Value::Int(10)),
        ("if (false) { 10 } else { 20 }", Value::Int(20)),
        ("if (1) { 10 }", Value::Int(10)),
        ("if (1 < 2) { 10 } else { 20 }", Value::Int(10)),
        ("if (1 > 2) { 10 }", Value::Null),
        ("if (false) { 10 }", Value::Null),
        ("if ((if (false) { 10 })) { 10 } else { 20 }", Value::Int(20)),
        ("if (true) { 10 } else { 20 }; 3333", Value::Int(3333)),
    ];
    for (source, expected) in cases {
        assert_eq!(run(source), expected, "{}", source);
    }
}

#[test]
fn test_untaken_branch_never_reaches_the_stack() {
    let vm = run_vm("if (true) { 10 } else { 20 }; 3333", &VmOptions::default()).unwrap();
    assert_eq!(vm.last_popped(), Value::Int(3333));
    assert_eq!(vm.stack_top(), None);
}

#[test]
fn test_global_let_statements() {
    assert_eq!(run("let one = 1; one"), Value::Int(1));
    assert_eq!(run("let one = 1; let two = 2; one + two"), Value::Int(3));
    assert_eq!(
        run("let one = 1; let two = one + one; one + two"),
        Value::Int(3)
    );
}

#[test]
fn test_string_expressions() {
    assert_eq!(run(r#""blaze""#), Value::str("blaze"));
    assert_eq!(run(r#""bla" + "ze""#), Value::str("blaze"));
    assert_eq!(run(r#""bla" + "z" + "e""#), Value::str("blaze"));
}

#[test]
fn test_array_literals() {
    assert_eq!(run("[]"), ints(&[]));
    assert_eq!(run("[1, 2, 3]"), ints(&[1, 2, 3]));
    assert_eq!(run("[1 + 2, 3 * 4, 5 + 6]"), ints(&[3, 12, 11]));
}

#[test]
fn test_hash_literals() {
    assert_eq!(run("{}").to_string(), "{}");
    assert_eq!(run("{1: 2, 2: 3}").to_string(), "{1: 2, 2: 3}");
    assert_eq!(
        run("{1 + 1: 2 * 2, 3 + 3: 4 * 4}").to_string(),
        "{2: 4, 6: 16}"
    );
    assert_eq!(
        run(r#"{"b": 1, true: 2, 3: "c"}"#).to_string(),
        "{3: c, true: 2, b: 1}"
    );
}

#[test]
fn test_index_expressions() {
    let cases = [
        ("[1, 2, 3][1]", Value::Int(2)),
        ("[1, 2, 3][0 + 2]", Value::Int(3)),
        ("[[1, 1, 1]][0][0]", Value::Int(1)),
        ("[][0]", Value::Null),
        ("[1, 2, 3][99]", Value::Null),
        ("[1][-1]", Value::Null),
        ("{1: 1, 2: 2}[1]", Value::Int(1)),
        ("{1: 1, 2: 2}[2]", Value::Int(2)),
        ("{1: 1}[0]", Value::Null),
        ("{}[0]", Value::Null),
        (r#"{"one": 1}["o" + "ne"]"#, Value::Int(1)),
    ];
    for (source, expected) in cases {
        assert_eq!(run(source), expected, "{}", source);
    }
}

#[test]
fn test_calling_functions_without_arguments() {
    assert_eq!(
        run("let fivePlusTen = fn() { 5 + 10; }; fivePlusTen();"),
        Value::Int(15)
    );
    assert_eq!(
        run(indoc! {"
            let a = fn() { 1 };
            let b = fn() { a() + 1 };
            let c = fn() { b() + 1 };
            c();
        "}),
        Value::Int(3)
    );
}

#[test]
fn test_return_statements() {
    assert_eq!(
        run("let earlyExit = fn() { return 99; 100; }; earlyExit();"),
        Value::Int(99)
    );
    assert_eq!(
        run("let earlyExit = fn() { return 99; return 100; }; earlyExit();"),
        Value::Int(99)
    );
    assert_eq!(
        run("let f = fn(x) { if (x > 0) { return 1; }; -1 }; f(5) + f(-5)"),
        Value::Int(0)
    );
}

#[test]
fn test_functions_without_return_value() {
    assert_eq!(run("let noReturn = fn() { }; noReturn();"), Value::Null);
    assert_eq!(
        run(indoc! {"
            let noReturn = fn() { };
            let noReturnTwo = fn() { noReturn(); };
            noReturn();
            noReturnTwo();
        "}),
        Value::Null
    );
}

#[test]
fn test_first_class_functions() {
    assert_eq!(
        run(indoc! {"
            let returnsOne = fn() { 1; };
            let returnsOneReturner = fn() { returnsOne; };
            returnsOneReturner()();
        "}),
        Value::Int(1)
    );
}

#[test]
fn test_calling_functions_with_bindings() {
    let cases = [
        ("let one = fn() { let one = 1; one }; one();", 1),
        (
            "let oneAndTwo = fn() { let one = 1; let two = 2; one + two; }; oneAndTwo();",
            3,
        ),
        (
            indoc! {"
                let oneAndTwo = fn() { let one = 1; let two = 2; one + two; };
                let threeAndFour = fn() { let three = 3; let four = 4; three + four; };
                oneAndTwo() + threeAndFour();
            "},
            10,
        ),
        (
            indoc! {"
                let firstFoobar = fn() { let foobar = 50; foobar; };
                let secondFoobar = fn() { let foobar = 100; foobar; };
                firstFoobar() + secondFoobar();
            "},
            150,
        ),
        (
            indoc! {"
                let globalSeed = 50;
                let minusOne = fn() { let num = 1; globalSeed - num; };
                let minusTwo = fn() { let num = 2; globalSeed - num; };
                minusOne() + minusTwo();
            "},
            97,
        ),
    ];
    for (source, expected) in cases {
        assert_eq!(run(source), Value::Int(expected), "{}", source);
    }
}

#[test]
fn test_calling_functions_with_arguments_and_bindings() {
    let cases = [
        ("let identity = fn(a) { a; }; identity(4);", 4),
        ("let sum = fn(a, b) { a + b; }; sum(1, 2);", 3),
        ("let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2);", 3),
        (
            "let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2) + sum(3, 4);",
            10,
        ),
        (
            indoc! {"
                let sum = fn(a, b) { let c = a + b; c; };
                let outer = fn() { sum(1, 2) + sum(3, 4); };
                outer();
            "},
            10,
        ),
        (
            indoc! {"
                let globalNum = 10;
                let sum = fn(a, b) { let c = a + b; c + globalNum; };
                let outer = fn() { sum(1, 2) + sum(3, 4) + globalNum; };
                outer() + globalNum;
            "},
            50,
        ),
    ];
    for (source, expected) in cases {
        assert_eq!(run(source), Value::Int(expected), "{}", source);
    }
}

#[test]
fn test_functions_passed_as_arguments() {
    assert_eq!(
        run(indoc! {"
            let twice = fn(f, x) { f(f(x)) };
            let addThree = fn(x) { x + 3 };
            twice(addThree, 1);
        "}),
        Value::Int(7)
    );
}

#[test]
fn test_top_level_return_halts() {
    assert_eq!(run("1; return 2; 3"), Value::Int(2));
}

#[test]
fn test_calling_with_wrong_arguments() {
    assert_eq!(
        run_err("fn() { 1; }(1);"),
        RuntimeError::WrongArgumentCount { want: 0, got: 1 }
    );
    assert_eq!(
        run_err("fn(a) { a; }();"),
        RuntimeError::WrongArgumentCount { want: 1, got: 0 }
    );
    assert_eq!(
        run_err("fn(a, b) { a + b; }(1);"),
        RuntimeError::WrongArgumentCount { want: 2, got: 1 }
    );
}

#[test]
fn test_calling_non_function() {
    assert_eq!(run_err("1()"), RuntimeError::NotCallable("INTEGER"));
    assert_eq!(run_err(r#""f"(1)"#), RuntimeError::NotCallable("STRING"));
}

#[test]
fn test_type_errors() {
    assert_eq!(
        run_err("1 + true"),
        RuntimeError::UnsupportedBinaryOperands {
            op: Opcode::Add,
            left: "INTEGER",
            right: "BOOLEAN",
        }
    );
    assert_eq!(
        run_err(r#""a" - "b""#),
        RuntimeError::UnsupportedBinaryOperands {
            op: Opcode::Sub,
            left: "STRING",
            right: "STRING",
        }
    );
    assert_eq!(
        run_err("true > false"),
        RuntimeError::UnsupportedBinaryOperands {
            op: Opcode::GreaterThan,
            left: "BOOLEAN",
            right: "BOOLEAN",
        }
    );
    assert_eq!(
        run_err("[1] == [1]"),
        RuntimeError::UnsupportedBinaryOperands {
            op: Opcode::Equal,
            left: "ARRAY",
            right: "ARRAY",
        }
    );
    assert_eq!(run_err("-true"), RuntimeError::UnsupportedNegation("BOOLEAN"));
}

#[test]
fn test_less_than_fault_names_the_executed_instruction() {
    let err = run_err(r#""a" < "b""#);
    assert_eq!(
        err,
        RuntimeError::UnsupportedBinaryOperands {
            op: Opcode::GreaterThan,
            left: "STRING",
            right: "STRING",
        }
    );
    assert_eq!(
        err.to_string(),
        "unsupported operand types for OpGreaterThan: STRING, STRING"
    );
}

#[test]
fn test_division_by_zero() {
    assert_eq!(run_err("1 / 0"), RuntimeError::DivisionByZero);
}

#[test]
fn test_index_errors() {
    assert_eq!(
        run_err("1[0]"),
        RuntimeError::IndexNotSupported {
            container: "INTEGER",
            index: "INTEGER",
        }
    );
    assert_eq!(
        run_err(r#"[1]["a"]"#),
        RuntimeError::IndexNotSupported {
            container: "ARRAY",
            index: "STRING",
        }
    );
    assert_eq!(
        run_err("{1: 2}[[1]]"),
        RuntimeError::UnusableHashKey("ARRAY")
    );
    assert_eq!(
        run_err("{fn() { 1 }: 2}"),
        RuntimeError::UnusableHashKey("FUNCTION")
    );
}

fn run_bytecode(bytecode: Bytecode, options: &VmOptions) -> Result<Vm, RuntimeError> {
    let mut vm = Vm::with_globals(bytecode, Vec::new(), options);
    vm.run()?;
    Ok(vm)
}

#[test]
fn test_unbounded_recursion_hits_frame_limit() {
    test_utils::init_test_logging();

    // A function that calls itself through global 0. Source programs cannot
    // express this because `let` binds its name after compiling the value.
    let recurse: Instructions = vec![
        make(Opcode::GetGlobal, &[0]),
        make(Opcode::Call, &[0]),
        make(Opcode::ReturnValue, &[]),
    ]
    .into_iter()
    .collect();
    let bytecode = Bytecode {
        instructions: vec![
            make(Opcode::Constant, &[0]),
            make(Opcode::SetGlobal, &[0]),
            make(Opcode::GetGlobal, &[0]),
            make(Opcode::Call, &[0]),
            make(Opcode::Pop, &[]),
        ]
        .into_iter()
        .collect(),
        constants: vec![Value::function(CompiledFunction::new(recurse, 0, 0))],
    };

    let options = VmOptions {
        stack_size: 2048,
        max_frames: 64,
    };
    assert_eq!(
        run_bytecode(bytecode, &options).err(),
        Some(RuntimeError::FrameOverflow { max_frames: 64 })
    );
}

#[test]
fn test_stack_overflow() {
    let options = VmOptions {
        stack_size: 4,
        max_frames: 16,
    };
    assert_eq!(
        run_vm("[1, 2, 3, 4, 5]", &options).err(),
        Some(RuntimeError::StackOverflow { capacity: 4 })
    );
    assert!(run_vm("[1, 2, 3, 4]", &options).is_ok());
}

#[test]
fn test_malformed_bytecode() {
    let unknown = Bytecode {
        instructions: Instructions(vec![0xFF]),
        constants: vec![],
    };
    assert_eq!(
        run_bytecode(unknown, &VmOptions::default()).err(),
        Some(RuntimeError::UnknownOpcode(0xFF))
    );

    let truncated = Bytecode {
        instructions: Instructions(vec![Opcode::Constant as u8, 0x00]),
        constants: vec![Value::Int(1)],
    };
    assert_eq!(
        run_bytecode(truncated, &VmOptions::default()).err(),
        Some(RuntimeError::TruncatedInstruction(0))
    );

    let missing_constant = Bytecode {
        instructions: make(Opcode::Constant, &[3]).into(),
        constants: vec![],
    };
    assert_eq!(
        run_bytecode(missing_constant, &VmOptions::default()).err(),
        Some(RuntimeError::ConstantOutOfRange(3))
    );

    let underflow = Bytecode {
        instructions: make(Opcode::Pop, &[]).into(),
        constants: vec![],
    };
    assert_eq!(
        run_bytecode(underflow, &VmOptions::default()).err(),
        Some(RuntimeError::StackUnderflow)
    );
}

#[test]
fn test_globals_survive_between_runs() {
    let first = Compiler::compile_program(&parser::parse("let a = 40;").unwrap()).unwrap();
    let mut vm = Vm::new(first);
    vm.run().unwrap();
    let globals = vm.into_globals();
    assert_eq!(globals, vec![Value::Int(40)]);

    // Hand-built follow-up reading global 0.
    let second = Bytecode {
        instructions: vec![
            make(Opcode::GetGlobal, &[0]),
            make(Opcode::Constant, &[0]),
            make(Opcode::Add, &[]),
            make(Opcode::Pop, &[]),
        ]
        .into_iter()
        .collect(),
        constants: vec![Value::Int(2)],
    };
    let mut vm = Vm::with_globals(second, globals, &VmOptions::default());
    vm.run().unwrap();
    assert_eq!(vm.last_popped(), Value::Int(42));
}

#[test]
fn test_unset_global_reads_null() {
    let bytecode = Bytecode {
        instructions: vec![make(Opcode::GetGlobal, &[7]), make(Opcode::Pop, &[])]
            .into_iter()
            .collect(),
        constants: vec![],
    };
    let vm = run_bytecode(bytecode, &VmOptions::default()).unwrap();
    assert_eq!(vm.last_popped(), Value::Null);
}
