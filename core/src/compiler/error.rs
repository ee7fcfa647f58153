//! Bytecode compilation errors.

/// Errors that can occur during bytecode compilation.
///
/// Compilation stops at the first error and produces no bytecode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("unknown operator {0}")]
    UnknownOperator(String),

    #[error("undefined variable {0}")]
    UndefinedVariable(String),

    /// A nested function referred to a local of an enclosing function.
    #[error("cannot capture '{0}' from an enclosing function")]
    UnsupportedFreeVariable(String),

    #[error("too many constants (limit: 65536)")]
    TooManyConstants,

    #[error("too many global bindings (limit: 65536)")]
    TooManyGlobals,

    #[error("too many local bindings in one function (limit: 256)")]
    TooManyLocals,

    #[error("too many elements in literal (limit: 65535 operands)")]
    TooManyElements,

    #[error("too many call arguments (limit: 255)")]
    TooManyArguments,

    #[error("jump target too far (limit: 65534 bytes)")]
    JumpTooFar,
}
