//! Syntax-error diagnostics: the parser reports the first failure as
//! `expected <wanted> but found <seen> at line <N>` and aborts the chunk
//! without touching the environment.

use krait::{NoPrint, ReplSession};
use pretty_assertions::assert_eq;

fn parse_err(source: &str) -> String {
    ReplSession::new("<test>")
        .execute(source, &mut NoPrint)
        .expect_err("expected a syntax error")
        .to_string()
}

#[test]
fn missing_colon_after_compound_header() {
    assert_eq!(parse_err("if 1"), "SyntaxError: expected : but found NEWLINE at line 1");
    assert_eq!(
        parse_err("while 1"),
        "SyntaxError: expected : but found NEWLINE at line 1"
    );
}

#[test]
fn trailing_token_after_simple_statement() {
    assert_eq!(
        parse_err("break 1"),
        "SyntaxError: expected NEWLINE but found 1 at line 1"
    );
}

/// The offending token is echoed as written, quotes included.
#[test]
fn class_name_must_be_a_name() {
    assert_eq!(
        parse_err("class \"A\""),
        "SyntaxError: expected NAME but found \"A\" at line 1"
    );
}

/// `global` does not permit a trailing comma.
#[test]
fn global_requires_a_name_after_every_comma() {
    assert_eq!(
        parse_err("global a, b,"),
        "SyntaxError: expected NAME but found NEWLINE at line 1"
    );
}

/// A missing expression lists every atom alternative.
#[test]
fn missing_expression_lists_alternatives() {
    assert_eq!(
        parse_err("a ="),
        "SyntaxError: expected (, [, {, NAME, NUMBER, or STRING but found NEWLINE at line 1"
    );
    assert_eq!(
        parse_err("1 +"),
        "SyntaxError: expected (, [, {, NAME, NUMBER, or STRING but found NEWLINE at line 1"
    );
}

#[test]
fn error_line_numbers_point_into_the_chunk() {
    assert_eq!(
        parse_err("a = 1\nif a\n    pass"),
        "SyntaxError: expected : but found NEWLINE at line 2"
    );
}

#[test]
fn try_requires_a_handler_or_finally() {
    assert_eq!(
        parse_err("try:\n    pass"),
        "SyntaxError: expected except or finally but found EOF at line 2"
    );
}

#[test]
fn unclosed_bracket_at_end_of_input() {
    assert_eq!(parse_err("a = (1, 2"), "SyntaxError: unexpected end of input at line 1");
}

#[test]
fn unterminated_string_literal() {
    assert_eq!(parse_err("'abc"), "SyntaxError: unterminated string literal at line 1");
}

#[test]
fn inconsistent_dedent() {
    assert_eq!(
        parse_err("if 1:\n        a = 1\n    b = 2"),
        "SyntaxError: unindent does not match any outer indentation level at line 3"
    );
}

#[test]
fn assignment_target_must_be_assignable() {
    assert_eq!(
        parse_err("1 + 2 = 3"),
        "SyntaxError: cannot assign to expression at line 1"
    );
    assert_eq!(
        parse_err("a, b += 1"),
        "SyntaxError: illegal expression for augmented assignment at line 1"
    );
}

/// A failed parse must not bind anything.
#[test]
fn parse_errors_leave_the_environment_untouched() {
    let mut session = ReplSession::new("<test>");
    session.execute("zz = ", &mut NoPrint).expect_err("syntax error");
    let err = session.execute("zz", &mut NoPrint).expect_err("unbound");
    assert_eq!(err.to_string(), "NameError: name 'zz' is not defined");
}
