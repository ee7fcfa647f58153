//! Stack-based virtual machine.

mod code;
mod error;
mod frame;
pub mod instruction_set;
mod runtime;
mod stack;

pub use code::{Bytecode, Instructions};
pub use error::RuntimeError;
pub use frame::Frame;
pub use instruction_set::{Definition, Opcode, lookup, make, read_operands};
pub use runtime::Vm;
pub use stack::Stack;

#[cfg(test)]
mod vm_test;
