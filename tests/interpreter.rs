use skrift::error::SkriftError;
use skrift::interpreter::Interpreter;
use skrift::parser::{Parser, Stmt};
use skrift::resolver::{Locals, Resolver};
use skrift::scanner::Scanner;
use skrift::token::Token;
use skrift::value::Value;

fn scan(source: &str) -> Vec<Token<'_>> {
    Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source should lex cleanly")
}

fn frontend<'a>(tokens: &'a [Token<'a>]) -> (Vec<Stmt<'a>>, Locals) {
    let statements = Parser::new(tokens).parse().expect("source should parse");
    let locals = Resolver::new()
        .resolve(&statements)
        .expect("source should resolve");

    (statements, locals)
}

/// Run a program end-to-end and return everything it printed.
fn run(source: &str) -> String {
    let tokens = scan(source);
    let (statements, locals) = frontend(&tokens);

    let mut output = Vec::new();
    Interpreter::with_output(&mut output)
        .interpret(&statements, locals)
        .expect("program should run without errors");

    String::from_utf8(output).unwrap()
}

/// Run a program expected to fail at runtime; returns (printed output, error).
fn run_err(source: &str) -> (String, SkriftError) {
    let tokens = scan(source);
    let (statements, locals) = frontend(&tokens);

    let mut output = Vec::new();
    let err = Interpreter::with_output(&mut output)
        .interpret(&statements, locals)
        .expect_err("program should raise a runtime error");

    (String::from_utf8(output).unwrap(), err)
}

// ───────────────────────── arithmetic & rendering ─────────────────────────

#[test]
fn addition_renders_integral_numbers_without_fraction() {
    assert_eq!(run("print 1+1;"), "2\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run("print \"a\"+\"b\";"), "ab\n");
}

#[test]
fn fractional_results_keep_their_fraction() {
    assert_eq!(run("print 0.5 + 0.25;"), "0.75\n");
    assert_eq!(run("print 2.5 * 2;"), "5\n");
}

#[test]
fn unary_minus_negates() {
    assert_eq!(run("print -3 + 1;"), "-2\n");
}

#[test]
fn division_by_zero_follows_ieee_semantics() {
    assert_eq!(run("print 1 / 0;"), "inf\n");
    assert_eq!(run("print -1 / 0;"), "-inf\n");
}

#[test]
fn comparisons_produce_booleans() {
    assert_eq!(run("print 1 < 2; print 2 <= 2; print 3 > 4; print 4 >= 4;"),
               "true\ntrue\nfalse\ntrue\n");
}

#[test]
fn equality_is_structural_and_never_coerced() {
    assert_eq!(
        run("print 1 == 1; print 1 == \"1\"; print nil == nil; print nil == false; print \"a\" != \"b\";"),
        "true\nfalse\ntrue\nfalse\ntrue\n"
    );
}

// ───────────────────────── runtime type errors ─────────────────────────

#[test]
fn mixed_plus_is_a_runtime_error() {
    let (_, err) = run_err("print 1 + \"a\";");
    assert!(err
        .to_string()
        .contains("Operands must be both of type string or number"));
}

#[test]
fn minus_requires_numbers() {
    let (_, err) = run_err("print \"a\" - 1;");
    assert!(err.to_string().contains("Operands must be numbers"));
}

#[test]
fn unary_minus_requires_a_number() {
    let (_, err) = run_err("print -\"a\";");
    assert!(err.to_string().contains("Operand must be a number"));
}

#[test]
fn matching_operand_types_never_error() {
    assert_eq!(run("print 1 + 1; print \"a\" + \"b\";"), "2\nab\n");
}

#[test]
fn runtime_error_halts_remaining_statements() {
    let (output, err) = run_err("print 1; print missing; print 2;");

    assert_eq!(output, "1\n");
    assert!(err.to_string().contains("Undefined variable 'missing'"));
}

// ───────────────────────── truthiness & logical operators ─────────────────

#[test]
fn only_nil_and_false_are_falsy() {
    assert_eq!(
        run("print !nil; print !false; print !0; print !\"\"; print !true; print !clock;"),
        "true\ntrue\nfalse\nfalse\nfalse\nfalse\n"
    );
}

#[test]
fn logical_operators_return_the_operand_not_a_boolean() {
    assert_eq!(
        run("print \"hi\" or 2; print nil or \"yes\"; print nil and \"no\"; print 1 and 2;"),
        "hi\nyes\nnil\n2\n"
    );
}

#[test]
fn logical_operators_short_circuit() {
    // The right operand would raise if evaluated.
    assert_eq!(run("print true or missing; print false and missing;"),
               "true\nfalse\n");
}

// ───────────────────────── variables & scoping ─────────────────────────

#[test]
fn scenario_sum_of_two_globals() {
    assert_eq!(run("var a = 1; var b = 2; print a + b;"), "3\n");
}

#[test]
fn uninitialized_variables_default_to_nil() {
    assert_eq!(run("var a; print a;"), "nil\n");
}

#[test]
fn assignment_evaluates_to_the_assigned_value() {
    assert_eq!(run("var a = 1; print a = 2; print a;"), "2\n2\n");
}

#[test]
fn blocks_shadow_without_clobbering() {
    assert_eq!(
        run("var volume = 11;\nvolume = 0;\n{\n  var volume = 3 * 4 * 5;\n  print volume;\n}\nprint volume;"),
        "60\n0\n"
    );
}

#[test]
fn block_results_are_visible_through_globals() {
    let tokens = scan("var result;\nvar global = \"outside\";\n{\n  var local = \"inside\";\n  result = global + local;\n}");
    let (statements, locals) = frontend(&tokens);

    let mut sink = Vec::new();
    let mut interpreter = Interpreter::with_output(&mut sink);
    interpreter.interpret(&statements, locals).unwrap();

    assert_eq!(
        interpreter.get_global("result"),
        Some(Value::String("outsideinside".into()))
    );
}

#[test]
fn environment_is_restored_after_a_runtime_error() {
    let failing = scan("var a = 1; { var a = 2; print missing; }");
    let (failing_stmts, failing_locals) = frontend(&failing);

    let follow_up = scan("print a;");
    let (follow_up_stmts, follow_up_locals) = frontend(&follow_up);

    let mut sink = Vec::new();
    let mut interpreter = Interpreter::with_output(&mut sink);

    assert!(interpreter
        .interpret(&failing_stmts, failing_locals)
        .is_err());

    // The block frame was popped on the error path: the follow-up program
    // sees the global `a`, not the block-local one.
    interpreter
        .interpret(&follow_up_stmts, follow_up_locals)
        .expect("follow-up program should run");

    drop(interpreter);
    assert_eq!(String::from_utf8(sink).unwrap(), "1\n");
}

// ───────────────────────── control flow ─────────────────────────

#[test]
fn if_else_selects_by_truthiness() {
    assert_eq!(run("if (1) print \"then\"; else print \"else\";"), "then\n");
    assert_eq!(run("if (nil) print \"then\"; else print \"else\";"), "else\n");
    assert_eq!(run("if (false) print \"then\";"), "");
}

#[test]
fn while_loops_until_falsy() {
    assert_eq!(
        run("var i = 0; while (i < 3) { print i; i = i + 1; }"),
        "0\n1\n2\n"
    );
}

#[test]
fn for_loop_runs_its_desugared_form() {
    assert_eq!(
        run("for (var i = 0; i < 3; i = i + 1) print i;"),
        "0\n1\n2\n"
    );
}

// ───────────────────────── functions & closures ─────────────────────────

#[test]
fn functions_return_values() {
    assert_eq!(
        run("fun add(a,b){ return a+b; } print add(2,3);"),
        "5\n"
    );
}

#[test]
fn arity_mismatch_names_expected_and_actual() {
    let (_, err) = run_err("fun add(a,b){ return a+b; } print add(2);");
    assert!(err.to_string().contains("Expected 2 arguments but got 1"));

    let (_, err) = run_err("fun none(){ return 1; } none(1, 2);");
    assert!(err.to_string().contains("Expected 0 arguments but got 2"));
}

#[test]
fn missing_return_yields_nil() {
    assert_eq!(run("fun f() {} print f();"), "nil\n");
    assert_eq!(run("fun g() { return; } print g();"), "nil\n");
}

#[test]
fn return_unwinds_out_of_nested_loops() {
    assert_eq!(
        run("fun firstOver(limit) { var i = 0; while (true) { if (i > limit) return i; i = i + 1; } } print firstOver(3);"),
        "4\n"
    );
}

#[test]
fn recursion_works_through_the_declaring_scope() {
    assert_eq!(
        run("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
        "55\n"
    );
}

#[test]
fn non_callables_cannot_be_called() {
    let (_, err) = run_err("\"a\"();");
    assert!(err.to_string().contains("Can only call functions"));

    let (_, err) = run_err("var x = 1; x();");
    assert!(err.to_string().contains("Can only call functions"));
}

#[test]
fn closures_capture_the_declaration_environment() {
    // Both calls print the global: the closure binds `x` past the block
    // local declared after it.
    assert_eq!(
        run("var x = \"global\";\n{ fun f() { print x; } f(); var x = \"local\"; f(); }"),
        "global\nglobal\n"
    );
}

#[test]
fn closures_retain_state_between_calls() {
    assert_eq!(
        run("fun makeCounter() { var i = 0; fun count() { i = i + 1; print i; } return count; } var counter = makeCounter(); counter(); counter();"),
        "1\n2\n"
    );
}

#[test]
fn functions_are_first_class_values() {
    assert_eq!(run("fun f() {} print f;"), "<fn f>\n");
    assert_eq!(run("print clock;"), "<native fn clock>\n");
}

#[test]
fn curried_call_chains_evaluate_left_to_right() {
    assert_eq!(
        run("fun outer() { fun inner() { return 42; } return inner; } print outer()();"),
        "42\n"
    );
}

// ───────────────────────── natives ─────────────────────────

#[test]
fn clock_returns_a_positive_number() {
    assert_eq!(run("print clock() > 0;"), "true\n");
}
