use skrift::parser::{Parser, Stmt};
use skrift::resolver::Resolver;
use skrift::scanner::Scanner;
use skrift::token::Token;

fn scan(source: &str) -> Vec<Token<'_>> {
    Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source should lex cleanly")
}

fn parse<'a>(tokens: &'a [Token<'a>]) -> Vec<Stmt<'a>> {
    Parser::new(tokens).parse().expect("source should parse")
}

#[test]
fn globals_get_no_entry() {
    let tokens = scan("var a = 1; print a;");
    let statements = parse(&tokens);

    let locals = Resolver::new()
        .resolve(&statements)
        .expect("resolve should succeed");

    assert!(locals.is_empty());
}

#[test]
fn local_in_current_scope_has_distance_zero() {
    let tokens = scan("{ var a = 1; print a; }");
    let statements = parse(&tokens);

    let locals = Resolver::new()
        .resolve(&statements)
        .expect("resolve should succeed");

    assert_eq!(locals.len(), 1);
    assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![0]);
}

#[test]
fn distance_counts_scopes_between_use_and_declaration() {
    let tokens = scan("{ var a = 1; { { print a; } } }");
    let statements = parse(&tokens);

    let locals = Resolver::new()
        .resolve(&statements)
        .expect("resolve should succeed");

    assert_eq!(locals.len(), 1);
    assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn shadowing_resolves_to_the_nearest_scope() {
    let tokens = scan("{ var a = 1; { var a = 2; print a; } }");
    let statements = parse(&tokens);

    let locals = Resolver::new()
        .resolve(&statements)
        .expect("resolve should succeed");

    // Only the `print a` reference records a distance, and it points at the
    // inner declaration.
    assert_eq!(locals.len(), 1);
    assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![0]);
}

#[test]
fn function_parameters_resolve_inside_the_body() {
    let tokens = scan("fun id(x) { return x; }");
    let statements = parse(&tokens);

    let locals = Resolver::new()
        .resolve(&statements)
        .expect("resolve should succeed");

    assert_eq!(locals.len(), 1);
    assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![0]);
}

#[test]
fn resolve_is_idempotent() {
    let tokens = scan(
        "var x = 1;\n{ var y = x; fun f(a) { return a + y; } print f(y); }",
    );
    let statements = parse(&tokens);

    let first = Resolver::new()
        .resolve(&statements)
        .expect("resolve should succeed");
    let second = Resolver::new()
        .resolve(&statements)
        .expect("resolve should succeed");

    assert_eq!(first, second);
}

#[test]
fn self_referential_initializer_is_rejected() {
    let tokens = scan("{ var a = \"outer\"; { var a = a; } }");
    let statements = parse(&tokens);

    let errors = Resolver::new()
        .resolve(&statements)
        .expect_err("resolve should report a diagnostic");

    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .to_string()
        .contains("Cannot read local variable in its own initializer"));
}

#[test]
fn global_self_reference_is_allowed() {
    // Globals are late-bound; only locals reject self-reference.
    let tokens = scan("var a = a;");
    let statements = parse(&tokens);

    assert!(Resolver::new().resolve(&statements).is_ok());
}

#[test]
fn redeclaration_in_same_scope_is_rejected() {
    let tokens = scan("{ var a = 1; var a = 2; }");
    let statements = parse(&tokens);

    let errors = Resolver::new()
        .resolve(&statements)
        .expect_err("resolve should report a diagnostic");

    assert!(errors[0]
        .to_string()
        .contains("Variable already declared in this scope"));
}

#[test]
fn top_level_return_is_rejected() {
    let tokens = scan("return 1;");
    let statements = parse(&tokens);

    let errors = Resolver::new()
        .resolve(&statements)
        .expect_err("resolve should report a diagnostic");

    assert!(errors[0]
        .to_string()
        .contains("Cannot return from top-level code"));
}

#[test]
fn return_inside_function_is_allowed() {
    let tokens = scan("fun f() { return 1; }");
    let statements = parse(&tokens);

    assert!(Resolver::new().resolve(&statements).is_ok());
}

#[test]
fn multiple_static_errors_surface_in_one_pass() {
    let tokens = scan("return 1;\n{ var a = 1; var a = 2; }");
    let statements = parse(&tokens);

    let errors = Resolver::new()
        .resolve(&statements)
        .expect_err("resolve should report diagnostics");

    assert_eq!(errors.len(), 2);
}

#[test]
fn closure_reference_skips_scopes_opened_after_declaration() {
    // Inside `f` the reference to `x` must bind past the block-local `x`
    // declared *after* the function, i.e. resolve as a global (no entry),
    // never as the later local.
    let tokens = scan(
        "var x = \"global\";\n{ fun f() { print x; } f(); var x = \"local\"; f(); }",
    );
    let statements = parse(&tokens);

    let locals = Resolver::new()
        .resolve(&statements)
        .expect("resolve should succeed");

    // The two `f()` call sites resolve to the block scope; the `x` inside
    // the function body stays global.
    assert_eq!(locals.len(), 2);
    assert!(locals.values().all(|&distance| distance == 0));
}
