//! The Blaze session: parse, compile and execute, one input at a time.

use core::mem;

use tracing::debug;

use super::{Error, SessionOptions};
use crate::ast::Program;
use crate::compiler::{Compiler, SymbolTable};
use crate::parser;
use crate::values::Value;
use crate::vm::{Bytecode, Vm};

/// Runs source inputs one after another against shared global state.
///
/// The session carries three things from one input to the next: the global
/// symbol table, the constant pool and the global values. This is what lets
/// a REPL line refer to a binding made on an earlier line.
///
/// A failed compilation leaves all three untouched. A runtime fault keeps
/// the symbols and constants of the failed input, and any global assigned
/// before the fault.
///
/// # Example
///
/// ```
/// use blaze_core::api::{Session, SessionOptions};
/// use blaze_core::values::Value;
///
/// let mut session = Session::new(SessionOptions::default());
/// session.run("let answer = 40;").unwrap();
/// assert_eq!(session.run("answer + 2").unwrap(), Value::Int(42));
/// ```
pub struct Session {
    options: SessionOptions,
    symbols: SymbolTable,
    constants: Vec<Value>,
    globals: Vec<Value>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            symbols: SymbolTable::new(),
            constants: Vec::new(),
            globals: Vec::new(),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Global values assigned so far, indexed by symbol index.
    pub fn globals(&self) -> &[Value] {
        &self.globals
    }

    /// Parses, compiles and executes `source`, returning the final value.
    pub fn run(&mut self, source: &str) -> Result<Value, Error> {
        let program = parser::parse(source)?;
        self.run_program(&program)
    }

    pub fn run_program(&mut self, program: &Program) -> Result<Value, Error> {
        let bytecode = self.compile(program)?;
        self.execute(bytecode)
    }

    /// Compiles `program` on top of the session's symbols and constants.
    ///
    /// The new state is kept only if compilation succeeds.
    pub fn compile(&mut self, program: &Program) -> Result<Bytecode, Error> {
        let mut compiler = Compiler::with_state(self.symbols.clone(), self.constants.clone());
        compiler.compile(program)?;
        let bytecode = compiler.bytecode();

        let (symbols, constants) = compiler.into_state();
        debug!(
            bytes = bytecode.instructions.len(),
            constants = constants.len(),
            new_constants = constants.len() - self.constants.len(),
            "compiled input"
        );
        self.symbols = symbols;
        self.constants = constants;
        Ok(bytecode)
    }

    /// Executes `bytecode` against the session's globals.
    ///
    /// Returns the value most recently popped off the stack, which for a
    /// program ending in an expression statement is that expression's value.
    pub fn execute(&mut self, bytecode: Bytecode) -> Result<Value, Error> {
        let globals = mem::take(&mut self.globals);
        let mut vm = Vm::with_globals(bytecode, globals, &self.options.vm);

        let result = vm.run();
        let value = vm.last_popped();
        self.globals = vm.into_globals();
        debug!(ok = result.is_ok(), globals = self.globals.len(), "executed input");

        result?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::VmOptions;
    use crate::compiler::CompileError;
    use crate::vm::RuntimeError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bindings_persist_across_inputs() {
        let mut session = Session::default();
        session.run("let x = 1;").unwrap();
        session.run("let y = 2;").unwrap();
        assert_eq!(session.run("x + y").unwrap(), Value::Int(3));
        assert_eq!(session.globals(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_functions_persist_across_inputs() {
        let mut session = Session::default();
        session.run("let add = fn(a, b) { a + b };").unwrap();
        assert_eq!(session.run("add(20, 22)").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_failed_compile_leaves_state_unchanged() {
        let mut session = Session::default();
        session.run("let a = 5;").unwrap();

        let err = session.run("let b = 10; let c = missing;").unwrap_err();
        assert_eq!(
            err,
            Error::Compile(CompileError::UndefinedVariable("missing".to_string()))
        );

        // `b` was never committed, so the next binding reuses its index.
        assert!(session.run("b").is_err());
        session.run("let d = 7;").unwrap();
        assert_eq!(session.globals(), &[Value::Int(5), Value::Int(7)]);
    }

    #[test]
    fn test_runtime_error_keeps_earlier_globals() {
        let mut session = Session::default();
        let err = session.run("let a = 1; let b = a / 0;").unwrap_err();
        assert_eq!(err, Error::Runtime(RuntimeError::DivisionByZero));
        assert_eq!(session.run("a").unwrap(), Value::Int(1));
        // `b` is known to the compiler but was never assigned.
        assert_eq!(session.run("b").unwrap(), Value::Null);
    }

    #[test]
    fn test_parse_error_has_span() {
        let mut session = Session::default();
        let err = session.run("let = 1;").unwrap_err();
        assert_eq!(err.stage(), "parse");
        assert!(err.span().is_some());
    }

    #[test]
    fn test_options_apply_to_every_run() {
        let mut session = Session::new(SessionOptions {
            vm: VmOptions {
                stack_size: 2,
                max_frames: 8,
            },
        });
        assert!(session.run("[1, 2]").is_ok());
        assert_eq!(
            session.run("[1, 2, 3]").unwrap_err(),
            Error::Runtime(RuntimeError::StackOverflow { capacity: 2 })
        );
    }

    #[test]
    fn test_let_yields_assigned_value() {
        let mut session = Session::default();
        assert_eq!(session.run("let a = 3;").unwrap(), Value::Int(3));
        assert_eq!(session.run("").unwrap(), Value::Null);
    }
}
