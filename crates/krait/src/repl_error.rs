use std::fmt;

use crate::{exceptions::SimpleException, parse::ParseError};

/// Error type for REPL execution, separating failures by pipeline stage.
///
/// Keeping parse and runtime failures distinct lets callers handle user
/// feedback and recovery accurately without string matching; `Display`
/// produces exactly the interactive rendering for each.
#[derive(Debug, Clone)]
pub enum ReplError {
    /// Scanning or parsing failed; the environment was not touched.
    Parse(ParseError),
    /// An uncaught built-in exception ended evaluation.
    Runtime(SimpleException),
    /// An uncaught user `raise` of a plain value, already rendered as its
    /// `repr` (the heap may reclaim the value before display).
    Raised(String),
}

impl fmt::Display for ReplError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "SyntaxError: {error}"),
            Self::Runtime(exc) => write!(f, "{exc}"),
            Self::Raised(repr) => write!(f, "Exception: {repr}"),
        }
    }
}

impl std::error::Error for ReplError {}

impl From<ParseError> for ReplError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}
