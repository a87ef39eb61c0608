//! Behavioral tests for `ReplSession`, the persistent session type that
//! maintains state (heap, global scope, definitions) across `execute()`
//! calls.
//!
//! `execute()` returns the `repr` of the last top-level expression statement
//! of a chunk, or `None` for chunks ending in a non-expression statement.

use krait::{CollectStringPrint, NoPrint, ReplSession};
use pretty_assertions::assert_eq;

fn eval(session: &mut ReplSession, source: &str) -> Option<String> {
    session
        .execute(source, &mut NoPrint)
        .unwrap_or_else(|err| panic!("{source:?} failed: {err}"))
}

fn eval_err(session: &mut ReplSession, source: &str) -> String {
    session
        .execute(source, &mut NoPrint)
        .expect_err("expected an error")
        .to_string()
}

// =============================================================================
// 1. Session creation
// =============================================================================

#[test]
fn create_session_with_script_name() {
    let session = ReplSession::new("<stdin>");
    assert_eq!(session.script_name(), "<stdin>");
}

// =============================================================================
// 2. Basic execute
// =============================================================================

/// Assignments are not expressions and produce no echoed value.
#[test]
fn execute_assignment_returns_none() {
    let mut session = ReplSession::new("<test>");
    assert_eq!(eval(&mut session, "x = 42"), None);
}

#[test]
fn execute_expression_returns_repr() {
    let mut session = ReplSession::new("<test>");
    assert_eq!(eval(&mut session, "1 + 2").as_deref(), Some("3"));
}

/// Only the last top-level expression statement of a chunk is echoed.
#[test]
fn execute_echoes_last_expression_statement() {
    let mut session = ReplSession::new("<test>");
    assert_eq!(eval(&mut session, "1; 2; 3").as_deref(), Some("3"));
    assert_eq!(eval(&mut session, "1; x = 2"), None);
}

// =============================================================================
// 3. Persistence across chunks
// =============================================================================

#[test]
fn variables_persist_across_chunks() {
    let mut session = ReplSession::new("<test>");
    eval(&mut session, "a = 10");
    eval(&mut session, "b = 20");
    assert_eq!(eval(&mut session, "a + b").as_deref(), Some("30"));
}

#[test]
fn function_defined_then_called() {
    let mut session = ReplSession::new("<test>");
    eval(&mut session, "def double(n):\n    return n * 2");
    assert_eq!(eval(&mut session, "double(21)").as_deref(), Some("42"));
}

#[test]
fn class_defined_then_instantiated() {
    let mut session = ReplSession::new("<test>");
    eval(
        &mut session,
        "class Point:\n    def __init__(self, x, y):\n        self.x = x\n        self.y = y",
    );
    eval(&mut session, "p = Point(3, 4)");
    assert_eq!(eval(&mut session, "p.x + p.y").as_deref(), Some("7"));
}

/// A failed chunk leaves earlier bindings intact and binds nothing new.
#[test]
fn failed_chunk_keeps_prior_state() {
    let mut session = ReplSession::new("<test>");
    eval(&mut session, "a = 1");
    eval_err(&mut session, "b = undefined_name");
    assert_eq!(eval(&mut session, "a").as_deref(), Some("1"));
    assert_eq!(
        eval_err(&mut session, "b"),
        "NameError: name 'b' is not defined"
    );
}

// =============================================================================
// 4. Values, aliasing, closures
// =============================================================================

/// Mutable containers are aliased by reference: mutation through one name is
/// visible through every other.
#[test]
fn lists_alias_by_reference() {
    let mut session = ReplSession::new("<test>");
    eval(&mut session, "a = [1, 2]");
    eval(&mut session, "b = a");
    eval(&mut session, "b[0] = 9");
    assert_eq!(eval(&mut session, "a").as_deref(), Some("[9, 2]"));
}

/// Functions capture their defining scope by reference.
#[test]
fn closures_capture_defining_scope() {
    let mut session = ReplSession::new("<test>");
    eval(
        &mut session,
        "def counter():\n    n = 10\n    def get():\n        return n\n    return get",
    );
    eval(&mut session, "g = counter()");
    assert_eq!(eval(&mut session, "g()").as_deref(), Some("10"));
}

#[test]
fn default_parameters_evaluate_at_definition_time() {
    let mut session = ReplSession::new("<test>");
    eval(&mut session, "k = 5");
    eval(&mut session, "def f(x=k):\n    return x");
    eval(&mut session, "k = 99");
    assert_eq!(eval(&mut session, "f()").as_deref(), Some("5"));
    assert_eq!(eval(&mut session, "f(1)").as_deref(), Some("1"));
}

#[test]
fn bound_method_reprs_name_class_and_method() {
    let mut session = ReplSession::new("<test>");
    eval(&mut session, "class C:\n    def m(self):\n        return 1");
    eval(&mut session, "c = C()");
    assert_eq!(eval(&mut session, "c.m").as_deref(), Some("<bound method C.m>"));
    assert_eq!(eval(&mut session, "C").as_deref(), Some("<class 'C'>"));
}

/// Attribute assignment through one alias is visible through the instance.
#[test]
fn instance_attributes_mutate_in_place() {
    let mut session = ReplSession::new("<test>");
    eval(&mut session, "class Box:\n    pass");
    eval(&mut session, "b = Box()");
    eval(&mut session, "b.value = 3");
    eval(&mut session, "b.value += 4");
    assert_eq!(eval(&mut session, "b.value").as_deref(), Some("7"));
    eval(&mut session, "del(b, 'value')");
    assert_eq!(
        eval_err(&mut session, "b.value"),
        "AttributeError: 'Box' object has no attribute 'value'"
    );
}

// =============================================================================
// 5. Arithmetic edges
// =============================================================================

/// `/` is truthful division: always a float.
#[test]
fn division_always_returns_float() {
    let mut session = ReplSession::new("<test>");
    assert_eq!(eval(&mut session, "9 / 3").as_deref(), Some("3.0"));
    assert_eq!(eval(&mut session, "7 / 2").as_deref(), Some("3.5"));
}

/// Integer arithmetic is arbitrary precision: i64 overflow promotes to a
/// heap big integer and stays exact.
#[test]
fn integer_arithmetic_promotes_on_overflow() {
    let mut session = ReplSession::new("<test>");
    eval(
        &mut session,
        "def fac(n):\n    if n == 0:\n        return 1\n    return n * fac(n - 1)",
    );
    assert_eq!(eval(&mut session, "fac(11)").as_deref(), Some("39916800"));
    assert_eq!(
        eval(&mut session, "fac(25)").as_deref(),
        Some("15511210043330985984000000")
    );
    assert_eq!(
        eval(&mut session, "fac(25) % 97").as_deref(),
        Some(format!("{}", 15_511_210_043_330_985_984_000_000_i128 % 97).as_str())
    );
}

#[test]
fn booleans_behave_as_integers_in_arithmetic() {
    let mut session = ReplSession::new("<test>");
    assert_eq!(eval(&mut session, "True + True").as_deref(), Some("2"));
    assert_eq!(eval(&mut session, "True == 1").as_deref(), Some("True"));
    assert_eq!(eval(&mut session, "False").as_deref(), Some("False"));
}

// =============================================================================
// 6. Print output
// =============================================================================

/// `print` writes space-separated arguments and a newline through the
/// supplied writer; strings print unquoted.
#[test]
fn print_writes_through_the_writer() {
    let mut session = ReplSession::new("<test>");
    let mut print = CollectStringPrint::new();
    let result = session.execute("print(1, 'two', [3])", &mut print).unwrap();
    assert_eq!(print.output(), "1 two [3]\n");
    assert_eq!(result.as_deref(), Some("None"));
}

// =============================================================================
// 7. Errors
// =============================================================================

#[test]
fn runtime_errors_render_as_kind_and_message() {
    let mut session = ReplSession::new("<test>");
    assert_eq!(
        eval_err(&mut session, "1 / 0"),
        "ZeroDivisionError: division by zero"
    );
    assert_eq!(
        eval_err(&mut session, "zz"),
        "NameError: name 'zz' is not defined"
    );
    assert_eq!(
        eval_err(&mut session, "1 + 'a'"),
        "TypeError: unsupported operand type(s) for +: 'int' and 'str'"
    );
    assert_eq!(eval_err(&mut session, "''[-2]"), "IndexError: index out of range");
}

/// An uncaught `raise` of a plain value renders the value's repr.
#[test]
fn uncaught_raise_renders_the_value() {
    let mut session = ReplSession::new("<test>");
    assert_eq!(eval_err(&mut session, "raise 3"), "Exception: 3");
    assert_eq!(eval_err(&mut session, "raise 'boom'"), "Exception: 'boom'");
}

#[test]
fn control_flow_statements_outside_their_construct_are_errors() {
    let mut session = ReplSession::new("<test>");
    assert_eq!(eval_err(&mut session, "break"), "SyntaxError: 'break' outside loop");
    assert_eq!(
        eval_err(&mut session, "return 1"),
        "SyntaxError: 'return' outside function"
    );
}

#[test]
fn runaway_recursion_raises_instead_of_overflowing() {
    let mut session = ReplSession::new("<test>");
    eval(&mut session, "def r():\n    return r()");
    assert_eq!(
        eval_err(&mut session, "r()"),
        "RuntimeError: maximum recursion depth exceeded"
    );
}

/// `finally` runs even when the chunk ultimately fails.
#[test]
fn finally_runs_on_the_error_path() {
    let mut session = ReplSession::new("<test>");
    eval(&mut session, "a = 0");
    eval_err(&mut session, "try:\n    raise 1\nfinally:\n    a = 7");
    assert_eq!(eval(&mut session, "a").as_deref(), Some("7"));
}

// =============================================================================
// 8. Garbage collection
// =============================================================================

/// Unbinding the last name for a structure lets the idle collection reclaim
/// it, including cyclic class/instance/closure structures.
#[test]
fn collection_reclaims_unreachable_cycles() {
    let mut session = ReplSession::new("<test>");
    let baseline = session.live_objects();
    eval(
        &mut session,
        "class Node:\n    def __init__(self):\n        self.other = None",
    );
    eval(&mut session, "a = Node()");
    eval(&mut session, "b = Node()");
    eval(&mut session, "a.other = b");
    eval(&mut session, "b.other = a");
    let with_cycle = session.live_objects();
    assert!(with_cycle > baseline, "cycle should allocate heap objects");
    eval(&mut session, "del(a)");
    eval(&mut session, "del(b)");
    eval(&mut session, "del(Node)");
    assert_eq!(session.live_objects(), baseline);
}
