//! Bytecode compiler for Blaze programs.
//!
//! Lowers an [`ast::Program`](crate::ast::Program) into flat
//! [`Bytecode`](crate::vm::Bytecode) for the VM.
//!
//! ## Design
//!
//! - Recursive walk over the closed AST
//! - One compilation scope per function body, kept on a stack
//! - Forward jumps are backpatched once their target is emitted
//! - Names resolve through an arena of nested symbol tables

mod bytecode;
mod error;
pub mod symbol_table;


pub use bytecode::{Compiler, EmittedInstruction};
pub use error::CompileError;
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
