//! Blaze - a small expression-oriented language with a bytecode VM
//!
//! # Overview
//!
//! Blaze programs are sequences of `let`, `return` and expression
//! statements over integers, booleans, strings, arrays, hashes and
//! first-class functions. Source is parsed into a syntax tree, compiled to
//! bytecode and executed on a stack-based virtual machine.
//!
//! # Quick Start
//!
//! ```
//! use blaze::{Session, SessionOptions, Value};
//!
//! let mut session = Session::new(SessionOptions::default());
//! session.run("let fib = fn(a, b) { a + b };").unwrap();
//! assert_eq!(session.run("fib(1, 2)").unwrap(), Value::Int(3));
//! ```
//!
//! # Errors
//!
//! Every stage reports its own error type, wrapped in [`Error`]. Use
//! [`render_error`] and friends to print them with source snippets.

mod error_renderer;

// Re-export public API from blaze_core
pub use blaze_core::api::{Error, Session, SessionOptions, VmOptions};

// Re-export the pipeline stages for embedders that drive them directly
pub use blaze_core::ast::{self, Program};
pub use blaze_core::compiler::{CompileError, Compiler};
pub use blaze_core::parser::{ParseError, parse};
pub use blaze_core::values::{self, Value};
pub use blaze_core::vm::{self, Bytecode, RuntimeError, Vm};

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
