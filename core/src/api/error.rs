//! Public error type for the Blaze API.
//!
//! Each stage of the pipeline has its own error type; this enum is what
//! crosses the [`Session`](crate::api::Session) boundary.

use crate::compiler::CompileError;
use crate::parser::{ParseError, Span};
use crate::vm::RuntimeError;

/// Any failure of one compile-then-execute cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error("executing bytecode failed: {0}")]
    Runtime(#[from] RuntimeError),
}

impl Error {
    /// Source location of the error, when one is known.
    ///
    /// Only parse errors carry a location; later stages work on the tree
    /// and the bytecode, which do not record spans.
    pub fn span(&self) -> Option<&Span> {
        match self {
            Error::Parse(err) => Some(&err.span),
            Error::Compile(_) | Error::Runtime(_) => None,
        }
    }

    /// Short name of the failing stage.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Parse(_) => "parse",
            Error::Compile(_) => "compile",
            Error::Runtime(_) => "runtime",
        }
    }
}
