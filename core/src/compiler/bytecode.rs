//! Bytecode compiler implementation.

use core::mem;

use tracing::{debug, trace};

use crate::ast::{Block, Expr, Literal, Program, Statement};
use crate::compiler::CompileError;
use crate::compiler::symbol_table::{SymbolScope, SymbolTable};
use crate::values::{CompiledFunction, Value};
use crate::vm::instruction_set::{Opcode, PLACEHOLDER, make};
use crate::vm::{Bytecode, Instructions};

const MAX_CONSTANTS: usize = u16::MAX as usize + 1;
const MAX_GLOBALS: usize = u16::MAX as usize + 1;
const MAX_LOCALS: usize = u8::MAX as usize + 1;

/// Opcode and byte offset of an instruction already written to a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmittedInstruction {
    pub opcode: Opcode,
    pub position: usize,
}

/// Instruction buffer of one function body (or of the main program).
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
    /// Offsets of jumps still carrying the placeholder operand.
    pending_jumps: Vec<usize>,
}

/// Main-scope state recorded before each [`Compiler::compile`] call, so
/// that a failed call can be undone.
struct Checkpoint {
    symbols: SymbolTable,
    constants: usize,
    instructions: usize,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
    pending_jumps: Vec<usize>,
}

/// Compiles a [`Program`] into [`Bytecode`].
///
/// The compiler walks the tree recursively and writes into the innermost
/// compilation scope. Forward jumps are emitted with a placeholder operand
/// and patched once their target is known.
///
/// The global symbol table and the constant pool can be carried from one
/// compiler to the next with [`Compiler::with_state`] and
/// [`Compiler::into_state`].
pub struct Compiler {
    constants: Vec<Value>,
    symbols: SymbolTable,
    current: CompilationScope,
    /// Scopes of the functions enclosing the one being compiled.
    enclosing: Vec<CompilationScope>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_state(SymbolTable::new(), Vec::new())
    }

    pub fn with_state(symbols: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbols,
            current: CompilationScope::default(),
            enclosing: Vec::new(),
        }
    }

    /// Compiles a whole program in one go.
    pub fn compile_program(program: &Program) -> Result<Bytecode, CompileError> {
        let mut compiler = Compiler::new();
        compiler.compile(program)?;
        Ok(compiler.bytecode())
    }

    /// Compiles `program` on top of what this compiler already holds.
    ///
    /// On error every effect of the call is undone: the symbols, the
    /// constant pool and the main instructions are as they were before it,
    /// and [`bytecode`](Self::bytecode) keeps returning the last good
    /// program.
    pub fn compile(&mut self, program: &Program) -> Result<(), CompileError> {
        let checkpoint = self.checkpoint();
        let result = program
            .statements
            .iter()
            .try_for_each(|statement| self.compile_statement(statement));
        if let Err(err) = &result {
            debug!(%err, "compile failed, rolling back");
            self.rollback(checkpoint);
        }
        result
    }

    /// Snapshot of the main scope's instructions and the constant pool.
    pub fn bytecode(&self) -> Bytecode {
        debug_assert!(
            self.current.pending_jumps.is_empty(),
            "unpatched jumps at offsets {:?}",
            self.current.pending_jumps
        );
        Bytecode {
            instructions: self.current.instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbols, self.constants)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            symbols: self.symbols.clone(),
            constants: self.constants.len(),
            instructions: self.current.instructions.len(),
            last_instruction: self.current.last_instruction,
            previous_instruction: self.current.previous_instruction,
            pending_jumps: self.current.pending_jumps.clone(),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        // An error inside a function literal leaves its scopes open; the
        // outermost enclosing scope is the main one.
        if !self.enclosing.is_empty() {
            self.current = self.enclosing.remove(0);
            self.enclosing.clear();
        }
        self.current.instructions.truncate(checkpoint.instructions);
        self.current.last_instruction = checkpoint.last_instruction;
        self.current.previous_instruction = checkpoint.previous_instruction;
        self.current.pending_jumps = checkpoint.pending_jumps;
        self.constants.truncate(checkpoint.constants);
        self.symbols = checkpoint.symbols;
    }

    // === Statements ===

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Expression(expr) => {
                self.compile_expr(expr)?;
                self.emit(Opcode::Pop, &[]);
            }
            Statement::Let { name, value } => {
                self.compile_expr(value)?;
                let symbol = self.symbols.define(name);
                match symbol.scope {
                    SymbolScope::Global => {
                        if symbol.index >= MAX_GLOBALS {
                            return Err(CompileError::TooManyGlobals);
                        }
                        self.emit(Opcode::SetGlobal, &[symbol.index]);
                    }
                    SymbolScope::Local => {
                        if symbol.index >= MAX_LOCALS {
                            return Err(CompileError::TooManyLocals);
                        }
                        self.emit(Opcode::SetLocal, &[symbol.index]);
                    }
                }
            }
            Statement::Return(value) => {
                self.compile_expr(value)?;
                self.emit(Opcode::ReturnValue, &[]);
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// Compiles an `if` branch so that it leaves exactly one value.
    ///
    /// The trailing `Pop` of the branch's last expression statement is
    /// dropped; a branch that ends in anything else yields null.
    fn compile_branch(&mut self, block: &Block) -> Result<(), CompileError> {
        self.compile_block(block)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        } else {
            self.emit(Opcode::Null, &[]);
        }
        Ok(())
    }

    // === Expressions ===

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Infix {
                operator,
                left,
                right,
            } => {
                // `a < b` is compiled as `b > a`.
                if operator == "<" {
                    self.compile_expr(right)?;
                    self.compile_expr(left)?;
                    self.emit(Opcode::GreaterThan, &[]);
                    return Ok(());
                }
                let op = match operator.as_str() {
                    "+" => Opcode::Add,
                    "-" => Opcode::Sub,
                    "*" => Opcode::Mul,
                    "/" => Opcode::Div,
                    ">" => Opcode::GreaterThan,
                    "==" => Opcode::Equal,
                    "!=" => Opcode::NotEqual,
                    _ => return Err(CompileError::UnknownOperator(operator.clone())),
                };
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.emit(op, &[]);
            }

            Expr::Prefix { operator, right } => {
                let op = match operator.as_str() {
                    "!" => Opcode::Bang,
                    "-" => Opcode::Minus,
                    _ => return Err(CompileError::UnknownOperator(operator.clone())),
                };
                self.compile_expr(right)?;
                self.emit(op, &[]);
            }

            Expr::Literal(Literal::Int(i)) => {
                let index = self.add_constant(Value::Int(*i))?;
                self.emit(Opcode::Constant, &[index]);
            }
            Expr::Literal(Literal::Str(s)) => {
                let index = self.add_constant(Value::str(s))?;
                self.emit(Opcode::Constant, &[index]);
            }
            Expr::Literal(Literal::Bool(true)) => {
                self.emit(Opcode::True, &[]);
            }
            Expr::Literal(Literal::Bool(false)) => {
                self.emit(Opcode::False, &[]);
            }

            Expr::Ident(name) => {
                let (symbol, depth) = self
                    .symbols
                    .resolve_with_depth(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                let (scope, index) = (symbol.scope, symbol.index);
                match scope {
                    SymbolScope::Global => self.emit(Opcode::GetGlobal, &[index]),
                    SymbolScope::Local if depth == 0 => self.emit(Opcode::GetLocal, &[index]),
                    SymbolScope::Local => {
                        return Err(CompileError::UnsupportedFreeVariable(name.clone()));
                    }
                };
            }

            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expr(condition)?;
                let jump_not_truthy = self.emit_jump(Opcode::JumpNotTruthy);

                self.compile_branch(consequence)?;
                let jump = self.emit_jump(Opcode::Jump);

                self.patch_jump(jump_not_truthy)?;
                match alternative {
                    Some(alternative) => self.compile_branch(alternative)?,
                    None => {
                        self.emit(Opcode::Null, &[]);
                    }
                }
                self.patch_jump(jump)?;
            }

            Expr::Function { params, body } => {
                self.enter_scope();
                for param in params {
                    if self.symbols.define(param).index >= MAX_LOCALS {
                        return Err(CompileError::TooManyLocals);
                    }
                }

                self.compile_block(body)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(Opcode::ReturnValue) {
                    self.emit(Opcode::Return, &[]);
                }

                let (instructions, num_locals) = self.leave_scope();
                let function = CompiledFunction::new(instructions, num_locals, params.len());
                let index = self.add_constant(Value::function(function))?;
                self.emit(Opcode::Constant, &[index]);
            }

            Expr::Call { function, args } => {
                if args.len() > u8::MAX as usize {
                    return Err(CompileError::TooManyArguments);
                }
                self.compile_expr(function)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.emit(Opcode::Call, &[args.len()]);
            }

            Expr::Array(elements) => {
                if elements.len() > u16::MAX as usize {
                    return Err(CompileError::TooManyElements);
                }
                for element in elements {
                    self.compile_expr(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }

            Expr::Hash(pairs) => {
                if pairs.len() * 2 > u16::MAX as usize {
                    return Err(CompileError::TooManyElements);
                }
                // Deterministic output: pairs are ordered by the key's text.
                let mut sorted: Vec<(String, &Expr, &Expr)> = pairs
                    .iter()
                    .map(|(key, value)| (key.to_string(), key, value))
                    .collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                for (_, key, value) in sorted {
                    self.compile_expr(key)?;
                    self.compile_expr(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2]);
            }

            Expr::Index { left, index } => {
                self.compile_expr(left)?;
                self.compile_expr(index)?;
                self.emit(Opcode::Index, &[]);
            }
        }
        Ok(())
    }

    // === Constants ===

    fn add_constant(&mut self, value: Value) -> Result<usize, CompileError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants);
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    // === Instruction Emission ===

    /// Emit an instruction and return its byte offset.
    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.current.instructions.len();
        self.current.instructions.extend_from_slice(&instruction);
        trace!(position, %op, ?operands, "emit");

        self.current.previous_instruction = self.current.last_instruction;
        self.current.last_instruction = Some(EmittedInstruction {
            opcode: op,
            position,
        });
        position
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        self.current
            .last_instruction
            .is_some_and(|last| last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        if let Some(last) = self.current.last_instruction {
            self.current.instructions.truncate(last.position);
            self.current.last_instruction = self.current.previous_instruction;
        }
    }

    fn replace_last_pop_with_return(&mut self) {
        if let Some(last) = self.current.last_instruction.as_mut() {
            let position = last.position;
            last.opcode = Opcode::ReturnValue;
            self.replace_instruction(position, &make(Opcode::ReturnValue, &[]));
        }
    }

    fn replace_instruction(&mut self, position: usize, instruction: &[u8]) {
        self.current.instructions[position..position + instruction.len()]
            .copy_from_slice(instruction);
    }

    /// Rewrites the operand of the instruction at `position` in place.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let Ok(op) = Opcode::try_from(self.current.instructions[position]) else {
            unreachable!("no instruction starts at offset {}", position);
        };
        self.replace_instruction(position, &make(op, &[operand]));
    }

    // === Jump Patching Infrastructure ===

    /// Emit a jump whose target is not known yet and return its offset.
    fn emit_jump(&mut self, op: Opcode) -> usize {
        debug_assert!(op.is_jump());
        let position = self.emit(op, &[PLACEHOLDER as usize]);
        self.current.pending_jumps.push(position);
        position
    }

    /// Point the jump at `position` to the next instruction to be emitted.
    fn patch_jump(&mut self, position: usize) -> Result<(), CompileError> {
        let target = self.current.instructions.len();
        if target >= PLACEHOLDER as usize {
            return Err(CompileError::JumpTooFar);
        }
        self.change_operand(position, target);
        self.current.pending_jumps.retain(|&p| p != position);
        Ok(())
    }

    // === Scopes ===

    fn enter_scope(&mut self) {
        let outer = mem::take(&mut self.current);
        self.enclosing.push(outer);
        self.symbols.enter_scope();
        debug!(depth = self.enclosing.len(), "enter compilation scope");
    }

    /// Closes the current function scope, returning its instructions and
    /// the number of locals it defined.
    fn leave_scope(&mut self) -> (Instructions, usize) {
        let outer = self.enclosing.pop().unwrap_or_default();
        let finished = mem::replace(&mut self.current, outer);
        debug_assert!(
            finished.pending_jumps.is_empty(),
            "unpatched jumps at offsets {:?}",
            finished.pending_jumps
        );
        let num_locals = self.symbols.leave_scope();
        debug!(
            depth = self.enclosing.len(),
            num_locals,
            bytes = finished.instructions.len(),
            "leave compilation scope"
        );
        (finished.instructions, num_locals)
    }
}
