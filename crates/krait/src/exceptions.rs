use std::fmt::{self, Display};

use strum::{Display, IntoStaticStr};

use crate::value::Value;

/// Result type alias for operations that can produce a runtime error.
pub(crate) type RunResult<T> = Result<T, RunError>;

/// Exception kinds raised by the interpreter.
///
/// Uses strum derives for automatic `Display` and `Into<&'static str>`
/// implementations. The string representation matches the variant name
/// exactly (e.g., `IndexError` -> "IndexError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum ExcType {
    /// Scanner/parser failures, and control-flow statements used outside
    /// their enclosing construct (`break` outside a loop).
    SyntaxError,
    /// Sequence index out of range.
    IndexError,
    /// Reserved: dict lookups on missing keys return `None` instead, so this
    /// kind is never raised by the current surface.
    KeyError,
    /// Unbound name lookup or deletion.
    NameError,
    /// Operator or argument mismatch.
    TypeError,
    /// Integer or float division/modulo by zero.
    ZeroDivisionError,
    /// Failed `assert` statement.
    AssertionError,
    /// Missing attribute on an instance or class.
    AttributeError,
    /// Bare `raise` outside a handler, or the recursion limit.
    RuntimeError,
    /// Any `import` / `from ... import` statement.
    ModuleNotFoundError,
    /// Parsed-but-not-evaluated features: `in` / `not in` and `global`.
    UnimplementedError,
}

/// A raised built-in exception: a kind plus an optional message.
///
/// User `raise X` raises the plain value `X` and never constructs one of
/// these; built-in failures (index out of range, bad operand types, ...)
/// always do. A `SimpleException` only becomes a heap value when a `try`
/// handler actually catches it and needs something to match or bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleException {
    pub exc_type: ExcType,
    pub message: Option<String>,
}

impl SimpleException {
    pub(crate) fn new(exc_type: ExcType) -> Self {
        Self {
            exc_type,
            message: None,
        }
    }

    pub(crate) fn new_msg(exc_type: ExcType, message: impl Into<String>) -> Self {
        Self {
            exc_type,
            message: Some(message.into()),
        }
    }
}

impl Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.exc_type),
            None => write!(f, "{}", self.exc_type),
        }
    }
}

impl From<SimpleException> for RunError {
    fn from(exc: SimpleException) -> Self {
        Self::Exc(exc)
    }
}

/// An error signal propagating outward through the evaluator until caught.
///
/// Both variants are caught by `except` clauses; they differ only in how the
/// raised value is materialized when a handler needs it, and in how the REPL
/// renders them when nothing catches them.
#[derive(Debug, Clone)]
pub(crate) enum RunError {
    /// A built-in failure. Turned into a heap exception value on catch.
    Exc(SimpleException),
    /// A user `raise expr`: the raised value travels as-is.
    Raise(Value),
}

impl ExcType {
    /// Creates a `TypeError` with the given message.
    pub(crate) fn type_error(message: impl Into<String>) -> RunError {
        SimpleException::new_msg(Self::TypeError, message).into()
    }

    /// Creates a `NameError` for an unbound name.
    pub(crate) fn name_error(name: &str) -> RunError {
        SimpleException::new_msg(Self::NameError, format!("name '{name}' is not defined")).into()
    }

    /// Creates an `AttributeError` for a missing attribute.
    pub(crate) fn attribute_error(type_name: impl Display, attr: &str) -> RunError {
        SimpleException::new_msg(
            Self::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
        .into()
    }

    /// Creates the uniform out-of-range `IndexError`.
    pub(crate) fn index_error() -> RunError {
        SimpleException::new_msg(Self::IndexError, "index out of range").into()
    }

    /// Creates a `ZeroDivisionError` with the given message.
    pub(crate) fn zero_division(message: impl Into<String>) -> RunError {
        SimpleException::new_msg(Self::ZeroDivisionError, message).into()
    }

    /// Creates the bare `UnimplementedError` used for parsed-only features.
    pub(crate) fn unimplemented() -> RunError {
        SimpleException::new(Self::UnimplementedError).into()
    }

    /// Creates the `ModuleNotFoundError` every import resolves to.
    pub(crate) fn module_not_found(name: &str) -> RunError {
        SimpleException::new_msg(Self::ModuleNotFoundError, format!("No module named '{name}'")).into()
    }
}
