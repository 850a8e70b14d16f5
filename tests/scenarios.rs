//! End-to-end scenarios exercising scope, closure, and term-conversion
//! behavior together through the bundled driver, built directly as AST
//! values since this crate has no parser.

use std::rc::Rc;

use procscript_core::ast::{BinOp, Expr, Stmt};
use procscript_core::config::InterpreterConfig;
use procscript_core::param::{ParamMode, ParameterDescriptor};
use procscript_core::procedure::ProcKind;
use procscript_core::value::Value;
use procscript_core::{Identifier, Interpreter};

fn var(name: &str) -> Expr {
    Expr::Var(Identifier::new(name))
}

fn lit(v: Value) -> Expr {
    Expr::Literal(v)
}

/// Scenario 1: a `make_counter` factory returns a closure over a local
/// `n`; two counters created from two separate calls mutate
/// independent state, while repeated calls on the same counter persist.
#[test]
fn counter_closures_are_independent_and_stateful() {
    // procedure make_counter() {
    //   n := 0;
    //   return closure() { n := n + 1; return n; };
    // }
    let make_counter_body = vec![
        Stmt::Assign(var("n"), lit(Value::Int(0))),
        Stmt::Return(Some(Expr::ProcLit {
            params: vec![],
            body: Rc::new(vec![
                Stmt::Assign(var("n"), Expr::BinOp(BinOp::Add, Box::new(var("n")), Box::new(lit(Value::Int(1))))),
                Stmt::Return(Some(var("n"))),
            ]),
            kind: ProcKind::Closure,
        })),
    ];

    let program = vec![
        Stmt::ProcDef(
            Identifier::new("make_counter"),
            Expr::ProcLit { params: vec![], body: Rc::new(make_counter_body), kind: ProcKind::Plain },
        ),
        Stmt::Assign(var("counter_a"), Expr::Call(Box::new(var("make_counter")), vec![])),
        Stmt::Assign(var("counter_b"), Expr::Call(Box::new(var("make_counter")), vec![])),
        Stmt::ExprStmt(Expr::Call(Box::new(var("counter_a")), vec![])),
        Stmt::ExprStmt(Expr::Call(Box::new(var("counter_a")), vec![])),
        Stmt::Return(Some(Expr::ListLit(vec![
            Expr::Call(Box::new(var("counter_a")), vec![]),
            Expr::Call(Box::new(var("counter_b")), vec![]),
        ]))),
    ];

    let mut interp = Interpreter::new(InterpreterConfig::default());
    let result = interp.run(&program).unwrap();
    match result {
        Value::List(xs) => {
            assert!(matches!(xs[0], Value::Int(3)));
            assert!(matches!(xs[1], Value::Int(1)));
        }
        other => panic!("expected a list, got {}", other),
    }
}

/// Scenario 2: a `for` loop body writes to a variable defined outside
/// the loop; the write propagates out (write-through), while the loop
/// variable itself never leaks.
#[test]
fn for_loop_write_through_accumulates_into_outer_scope() {
    let program = vec![
        Stmt::Assign(var("total"), lit(Value::Int(0))),
        Stmt::ForIter(
            Identifier::new("x"),
            Expr::ListLit(vec![lit(Value::Int(1)), lit(Value::Int(2)), lit(Value::Int(3))]),
            vec![Stmt::Assign(var("total"), Expr::BinOp(BinOp::Add, Box::new(var("total")), Box::new(var("x"))))],
        ),
        Stmt::Return(Some(var("total"))),
    ];

    let mut interp = Interpreter::new(InterpreterConfig::default());
    assert!(matches!(interp.run(&program).unwrap(), Value::Int(6)));
}

/// Scenario 3: a READ_WRITE parameter's post-call value is written back
/// into the caller's own variable, swapping two values in place.
#[test]
fn read_write_parameters_swap_caller_variables() {
    // procedure swap(rw a, rw b) { t := a; a := b; b := t; }
    let swap_params = vec![
        ParameterDescriptor::new(Identifier::new("a"), ParamMode::ReadWrite),
        ParameterDescriptor::new(Identifier::new("b"), ParamMode::ReadWrite),
    ];
    let swap_body = vec![
        Stmt::Assign(var("t"), var("a")),
        Stmt::Assign(var("a"), var("b")),
        Stmt::Assign(var("b"), var("t")),
    ];

    let program = vec![
        Stmt::ProcDef(
            Identifier::new("swap"),
            Expr::ProcLit { params: swap_params, body: Rc::new(swap_body), kind: ProcKind::Plain },
        ),
        Stmt::Assign(var("x"), lit(Value::Int(1))),
        Stmt::Assign(var("y"), lit(Value::Int(2))),
        Stmt::ExprStmt(Expr::Call(Box::new(var("swap")), vec![var("x"), var("y")])),
        Stmt::Return(Some(Expr::ListLit(vec![var("x"), var("y")]))),
    ];

    let mut interp = Interpreter::new(InterpreterConfig::default());
    match interp.run(&program).unwrap() {
        Value::List(xs) => {
            assert!(matches!(xs[0], Value::Int(2)));
            assert!(matches!(xs[1], Value::Int(1)));
        }
        other => panic!("expected a list, got {}", other),
    }
}

/// Scenario 4: a plain procedure links "functions only" into its call
/// frame — it can still resolve another procedure bound in the caller's
/// scope, but an ordinary variable there resolves to `omega`.
#[test]
fn functions_only_linking_resolves_procedures_not_locals() {
    let program = vec![
        Stmt::ProcDef(
            Identifier::new("helper"),
            Expr::ProcLit {
                params: vec![],
                body: Rc::new(vec![Stmt::Return(Some(lit(Value::Int(42))))]),
                kind: ProcKind::Plain,
            },
        ),
        Stmt::Assign(var("secret"), lit(Value::Int(99))),
        Stmt::ProcDef(
            Identifier::new("caller"),
            Expr::ProcLit {
                params: vec![],
                body: Rc::new(vec![Stmt::Return(Some(Expr::ListLit(vec![
                    Expr::Call(Box::new(var("helper")), vec![]),
                    var("secret"),
                ])))]),
                kind: ProcKind::Plain,
            },
        ),
        Stmt::Return(Some(Expr::Call(Box::new(var("caller")), vec![]))),
    ];

    let mut interp = Interpreter::new(InterpreterConfig::default());
    match interp.run(&program).unwrap() {
        Value::List(xs) => {
            assert!(matches!(xs[0], Value::Int(42)));
            assert!(matches!(xs[1], Value::Omega));
        }
        other => panic!("expected a list, got {}", other),
    }
}

/// Scenario 5: a procedure value survives a round trip through its
/// symbolic term and the wire-format text, independent of how the term
/// registry was populated.
#[test]
fn procedure_survives_term_and_wire_format_round_trip() {
    let proc = procscript_core::procedure::make_plain_procedure(
        vec![ParameterDescriptor::new(Identifier::new("x"), ParamMode::Value)],
        vec![Stmt::Return(Some(Expr::BinOp(BinOp::Add, Box::new(var("x")), Box::new(lit(Value::Int(1))))))],
    );
    let value = Value::Procedure(proc);

    let term = value.to_term();
    let wire_text = term.to_string();
    let reparsed = procscript_core::term::parse_term(&wire_text).unwrap();
    let restored = Value::from_term(&reparsed).unwrap();

    assert!(value.equal_structural(&restored));
}

/// Scenario 6: a `catchUsr` clause intercepts a value explicitly thrown
/// from the language, but not a language-level error, and vice versa for
/// `catchLng`.
#[test]
fn catch_clauses_are_selective_by_error_category() {
    let user_thrown_program = vec![Stmt::TryCatch {
        body: vec![Stmt::Throw(lit(Value::Str("boom".to_string())))],
        user_catch: Some((Identifier::new("e"), vec![Stmt::Return(Some(var("e")))])),
        lang_catch: None,
    }];
    let mut interp = Interpreter::new(InterpreterConfig::default());
    match interp.run(&user_thrown_program).unwrap() {
        Value::Str(s) => assert_eq!(s, "boom"),
        other => panic!("expected the thrown string back, got {}", other),
    }

    let language_level_program = vec![Stmt::TryCatch {
        body: vec![Stmt::Throw(lit(Value::Str("boom".to_string())))],
        user_catch: None,
        lang_catch: Some((Identifier::new("e"), vec![Stmt::Return(Some(lit(Value::Int(-1))))])),
    }];
    let mut interp = Interpreter::new(InterpreterConfig::default());
    assert!(interp.run(&language_level_program).is_err());
}
