pub mod error;
pub mod parser;
mod syntax;

// Re-export the parser and rule enum for external use
pub use error::{ParseError, ParseErrorKind};
pub use parser::ProgramParser;
pub use parser::Rule;
pub use parser::parse;
pub use syntax::Span;
