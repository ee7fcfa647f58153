//! Runtime faults raised by the virtual machine.
//!
//! Any fault aborts the current execution. Values already stored in globals
//! before the fault stay there.

use crate::vm::Opcode;

/// A fault raised while executing bytecode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("stack overflow (capacity {capacity})")]
    StackOverflow { capacity: usize },

    #[error("stack underflow")]
    StackUnderflow,

    #[error("call depth exceeded (limit {max_frames} frames)")]
    FrameOverflow { max_frames: usize },

    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    #[error("truncated instruction at offset {0}")]
    TruncatedInstruction(usize),

    #[error("constant index {0} out of range")]
    ConstantOutOfRange(usize),

    /// `op` is the instruction that faulted; `a < b` runs as `b > a`, so
    /// the operands may be swapped relative to the source.
    #[error("unsupported operand types for {op}: {left}, {right}")]
    UnsupportedBinaryOperands {
        op: Opcode,
        left: &'static str,
        right: &'static str,
    },

    #[error("unsupported type for negation: {0}")]
    UnsupportedNegation(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index operator not supported: {container}[{index}]")]
    IndexNotSupported {
        container: &'static str,
        index: &'static str,
    },

    #[error("unusable as hash key: {0}")]
    UnusableHashKey(&'static str),

    #[error("calling non-function: {0}")]
    NotCallable(&'static str),

    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArgumentCount { want: usize, got: usize },
}
