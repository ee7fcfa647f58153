use core::mem;
use std::rc::Rc;

use hashbrown::HashMap;
use tracing::{debug, trace};

use crate::api::VmOptions;
use crate::values::{CompiledFunction, Value};
use crate::vm::instruction_set::{Opcode, read_u16};
use crate::vm::{Bytecode, Frame, RuntimeError, Stack};

/// Executes one [`Bytecode`] program.
///
/// The main program runs as frame 0. Globals can be seeded and taken back
/// out so that consecutive programs share them.
pub struct Vm {
    constants: Vec<Value>,
    stack: Stack<Value>,
    globals: Vec<Value>,
    frame: Frame,
    /// Suspended caller frames, innermost last.
    callers: Vec<Frame>,
    max_frames: usize,
}

impl Vm {
    pub fn new(bytecode: Bytecode) -> Self {
        Self::with_globals(bytecode, Vec::new(), &VmOptions::default())
    }

    pub fn with_globals(bytecode: Bytecode, globals: Vec<Value>, options: &VmOptions) -> Self {
        let main = Rc::new(CompiledFunction::main(bytecode.instructions));
        Self {
            constants: bytecode.constants,
            stack: Stack::new(options.stack_size),
            globals,
            frame: Frame::new(main, 0),
            callers: Vec::new(),
            max_frames: options.max_frames,
        }
    }

    /// The value most recently popped off the stack.
    ///
    /// Expression statements end in a pop, so after a run this is the value
    /// of the last one executed.
    pub fn last_popped(&self) -> Value {
        self.stack.last_popped().cloned().unwrap_or_default()
    }

    pub fn stack_top(&self) -> Option<Value> {
        self.stack.top()
    }

    pub fn globals(&self) -> &[Value] {
        &self.globals
    }

    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let ip = self.frame.ip;
            let Some(&byte) = self.frame.function.instructions.get(ip) else {
                if self.callers.is_empty() {
                    return Ok(());
                }
                // Falling off the end of a function body returns null.
                self.return_from_frame(Value::Null)?;
                continue;
            };
            self.frame.ip += 1;

            let op = Opcode::try_from(byte).map_err(RuntimeError::UnknownOpcode)?;
            trace!(ip, %op, sp = self.stack.sp(), depth = self.callers.len(), "execute");

            use Opcode::*;
            match op {
                Constant => {
                    let index = self.read_u16_operand()?;
                    let value = self
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or(RuntimeError::ConstantOutOfRange(index))?;
                    self.stack.push(value)?;
                }
                Add | Sub | Mul | Div | Equal | NotEqual | GreaterThan => {
                    self.execute_binary(op)?;
                }
                Pop => {
                    self.stack.pop()?;
                }
                True => self.stack.push(Value::Bool(true))?,
                False => self.stack.push(Value::Bool(false))?,
                Null => self.stack.push(Value::Null)?,
                Minus => {
                    let operand = self.stack.pop()?;
                    match operand {
                        Value::Int(i) => self.stack.push(Value::Int(i.wrapping_neg()))?,
                        other => return Err(RuntimeError::UnsupportedNegation(other.type_name())),
                    }
                }
                Bang => {
                    let operand = self.stack.pop()?;
                    self.stack.push(Value::Bool(!operand.is_truthy()))?;
                }
                JumpNotTruthy => {
                    let target = self.read_u16_operand()?;
                    let condition = self.stack.pop()?;
                    if !condition.is_truthy() {
                        self.frame.ip = target;
                    }
                }
                Jump => {
                    let target = self.read_u16_operand()?;
                    self.frame.ip = target;
                }
                GetGlobal => {
                    let index = self.read_u16_operand()?;
                    let value = self.globals.get(index).cloned().unwrap_or_default();
                    self.stack.push(value)?;
                }
                SetGlobal => {
                    let index = self.read_u16_operand()?;
                    let value = self.stack.pop()?;
                    if index >= self.globals.len() {
                        self.globals.resize(index + 1, Value::Null);
                    }
                    self.globals[index] = value;
                }
                Array => {
                    let count = self.read_u16_operand()?;
                    let elements = self.stack.pop_n(count)?;
                    self.stack.push(Value::array(elements))?;
                }
                Hash => {
                    let count = self.read_u16_operand()?;
                    let items = self.stack.pop_n(count)?;
                    let mut pairs = HashMap::with_capacity(count / 2);
                    for pair in items.chunks_exact(2) {
                        let key = pair[0]
                            .hash_key()
                            .ok_or(RuntimeError::UnusableHashKey(pair[0].type_name()))?;
                        pairs.insert(key, pair[1].clone());
                    }
                    self.stack.push(Value::Hash(Rc::new(pairs)))?;
                }
                Index => {
                    let index = self.stack.pop()?;
                    let container = self.stack.pop()?;
                    self.stack.push(Self::index(&container, &index)?)?;
                }
                Call => {
                    let argc = self.read_u8_operand()?;
                    self.call_function(argc)?;
                }
                ReturnValue => {
                    let value = self.stack.pop()?;
                    if self.callers.is_empty() {
                        return Ok(());
                    }
                    self.return_from_frame(value)?;
                }
                Return => {
                    if self.callers.is_empty() {
                        return Ok(());
                    }
                    self.return_from_frame(Value::Null)?;
                }
                GetLocal => {
                    let slot = self.frame.base + self.read_u8_operand()?;
                    let value = self.stack.get(slot)?.clone();
                    self.stack.push(value)?;
                }
                SetLocal => {
                    let slot = self.frame.base + self.read_u8_operand()?;
                    let value = self.stack.pop()?;
                    self.stack.set(slot, value)?;
                }
            }
        }
    }

    fn read_u16_operand(&mut self) -> Result<usize, RuntimeError> {
        let ip = self.frame.ip;
        let bytes = self
            .frame
            .function
            .instructions
            .get(ip..ip + 2)
            .ok_or(RuntimeError::TruncatedInstruction(ip - 1))?;
        let operand = read_u16(bytes) as usize;
        self.frame.ip += 2;
        Ok(operand)
    }

    fn read_u8_operand(&mut self) -> Result<usize, RuntimeError> {
        let ip = self.frame.ip;
        let byte = *self
            .frame
            .function
            .instructions
            .get(ip)
            .ok_or(RuntimeError::TruncatedInstruction(ip - 1))?;
        self.frame.ip += 1;
        Ok(byte as usize)
    }

    fn call_function(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let function = match self.stack.peek(argc)? {
            Value::Function(function) => function.clone(),
            other => return Err(RuntimeError::NotCallable(other.type_name())),
        };
        if argc != function.num_parameters {
            return Err(RuntimeError::WrongArgumentCount {
                want: function.num_parameters,
                got: argc,
            });
        }
        if self.callers.len() + 1 >= self.max_frames {
            return Err(RuntimeError::FrameOverflow {
                max_frames: self.max_frames,
            });
        }

        let base = self.stack.sp() - argc;
        self.stack.set_sp(base + function.num_locals)?;
        let callee_frame = Frame::new(function, base);
        self.callers.push(mem::replace(&mut self.frame, callee_frame));
        debug!(depth = self.callers.len(), base, argc, "push frame");
        Ok(())
    }

    fn return_from_frame(&mut self, value: Value) -> Result<(), RuntimeError> {
        let caller = self.callers.pop().ok_or(RuntimeError::StackUnderflow)?;
        let finished = mem::replace(&mut self.frame, caller);
        debug!(depth = self.callers.len(), base = finished.base, "pop frame");

        // Drops the locals, the arguments and the callee itself.
        self.stack.set_sp(finished.base.saturating_sub(1))?;
        self.stack.push(value)
    }

    fn execute_binary(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        let result = match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => Self::integer_binary(op, *l, *r)?,
            (Value::Str(l), Value::Str(r)) if op == Opcode::Add => {
                Value::Str(Rc::from(format!("{}{}", l, r)))
            }
            _ if matches!(op, Opcode::Equal | Opcode::NotEqual) => {
                let equal = left
                    .scalar_eq(&right)
                    .ok_or_else(|| Self::unsupported(op, &left, &right))?;
                Value::Bool(equal == (op == Opcode::Equal))
            }
            _ => return Err(Self::unsupported(op, &left, &right)),
        };
        self.stack.push(result)
    }

    fn integer_binary(op: Opcode, left: i64, right: i64) -> Result<Value, RuntimeError> {
        Ok(match op {
            Opcode::Add => Value::Int(left.wrapping_add(right)),
            Opcode::Sub => Value::Int(left.wrapping_sub(right)),
            Opcode::Mul => Value::Int(left.wrapping_mul(right)),
            Opcode::Div => {
                if right == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Value::Int(left.wrapping_div(right))
            }
            Opcode::Equal => Value::Bool(left == right),
            Opcode::NotEqual => Value::Bool(left != right),
            Opcode::GreaterThan => Value::Bool(left > right),
            _ => unreachable!("{} is not a binary operator", op),
        })
    }

    fn unsupported(op: Opcode, left: &Value, right: &Value) -> RuntimeError {
        RuntimeError::UnsupportedBinaryOperands {
            op,
            left: left.type_name(),
            right: right.type_name(),
        }
    }

    fn index(container: &Value, index: &Value) -> Result<Value, RuntimeError> {
        match (container, index) {
            (Value::Array(elements), Value::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| elements.get(i))
                .cloned()
                .unwrap_or_default()),
            (Value::Hash(pairs), key) => {
                let key = key
                    .hash_key()
                    .ok_or(RuntimeError::UnusableHashKey(key.type_name()))?;
                Ok(pairs.get(&key).cloned().unwrap_or_default())
            }
            _ => Err(RuntimeError::IndexNotSupported {
                container: container.type_name(),
                index: index.type_name(),
            }),
        }
    }
}
