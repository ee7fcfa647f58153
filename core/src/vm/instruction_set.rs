//! Blaze VM Instructions - Variable Operand Format
//!
//! This module defines the instruction set for Blaze's stack-based virtual machine
//! and the helpers that encode and decode it.
//!
//! # Instruction Format
//!
//! Every instruction is one opcode byte followed by zero or one operand:
//! ```text
//! ┌────────────┬──────────────────────────────┐
//! │   Opcode   │  Operand (0, 1 or 2 bytes)   │
//! │  (8 bits)  │  big-endian, fixed per op    │
//! └────────────┴──────────────────────────────┘
//! ```
//!
//! The operand width is a property of the opcode and is never inferred from
//! the data. The compiler relies on this to rewrite jump targets in place.
//!
//! # Stack Discipline
//!
//! Stack effect notation: `[..., operand1, operand2] -> [..., result]`

use core::fmt;

/// Operand value reserved for jumps whose target is not known yet.
///
/// No valid instruction offset can equal this value; the compiler rejects
/// programs large enough to reach it.
pub const PLACEHOLDER: u16 = u16::MAX;

/// A single VM opcode.
///
/// The discriminant is the byte written to the instruction stream. Byte
/// values are part of the bytecode format and must not be reordered.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Push constant from pool
    /// Operand: u16 index | Stack: [...] -> [..., value]
    Constant = 0x00,

    /// Stack: [..., a, b] -> [..., a + b]
    Add = 0x01,

    /// Discard top value
    /// Stack: [..., a] -> [...]
    Pop = 0x02,

    /// Stack: [..., a, b] -> [..., a - b]
    Sub = 0x03,

    /// Stack: [..., a, b] -> [..., a * b]
    Mul = 0x04,

    /// Stack: [..., a, b] -> [..., a / b]
    Div = 0x05,

    /// Stack: [...] -> [..., true]
    True = 0x06,

    /// Stack: [...] -> [..., false]
    False = 0x07,

    /// Stack: [..., a, b] -> [..., a == b]
    Equal = 0x08,

    /// Stack: [..., a, b] -> [..., a != b]
    NotEqual = 0x09,

    /// Stack: [..., a, b] -> [..., a > b]
    ///
    /// There is no less-than opcode: `a < b` is compiled as `b > a`.
    GreaterThan = 0x0A,

    /// Integer negation
    /// Stack: [..., a] -> [..., -a]
    Minus = 0x0B,

    /// Logical not of the operand's truthiness
    /// Stack: [..., a] -> [..., !a]
    Bang = 0x0C,

    /// Pop and jump to an absolute offset if the value is falsy
    /// Operand: u16 offset | Stack: [..., cond] -> [...]
    JumpNotTruthy = 0x0D,

    /// Unconditional jump to an absolute offset
    /// Operand: u16 offset | Stack: [...] -> [...]
    Jump = 0x0E,

    /// Stack: [...] -> [..., null]
    Null = 0x0F,

    /// Operand: u16 index | Stack: [...] -> [..., value]
    GetGlobal = 0x10,

    /// Operand: u16 index | Stack: [..., value] -> [...]
    SetGlobal = 0x11,

    /// Make array with N elements
    /// Operand: u16 count | Stack: [..., e1, ..., eN] -> [..., array]
    Array = 0x12,

    /// Make hash from key/value pairs
    /// Operand: u16 count of *values* (2 per pair) | Stack: [..., k1, v1, ..., kN, vN] -> [..., hash]
    Hash = 0x13,

    /// Stack: [..., container, index] -> [..., element]
    Index = 0x14,

    /// Call the function sitting below the arguments
    /// Operand: u8 argument count | Stack: [..., fn, a1, ..., aN] -> [..., result]
    Call = 0x15,

    /// Return the top of stack to the caller
    /// Stack: [..., retval] -> caller [..., retval]
    ReturnValue = 0x16,

    /// Return from a function without a value
    /// Stack: [...] -> caller [..., null]
    Return = 0x17,

    /// Load frame-relative local
    /// Operand: u8 index | Stack: [...] -> [..., value]
    GetLocal = 0x18,

    /// Store frame-relative local
    /// Operand: u8 index | Stack: [..., value] -> [...]
    SetLocal = 0x19,
}

/// Name and operand layout of an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Definition {
    pub name: &'static str,
    /// Width in bytes of each operand, in order.
    pub operand_widths: &'static [usize],
}

impl Definition {
    const fn new(name: &'static str, operand_widths: &'static [usize]) -> Self {
        Self {
            name,
            operand_widths,
        }
    }

    /// Total encoded size of the instruction, opcode byte included.
    pub fn width(&self) -> usize {
        1 + self.operand_widths.iter().sum::<usize>()
    }
}

impl Opcode {
    /// Every opcode, indexed by its byte value.
    pub const ALL: [Opcode; 26] = [
        Opcode::Constant,
        Opcode::Add,
        Opcode::Pop,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::True,
        Opcode::False,
        Opcode::Equal,
        Opcode::NotEqual,
        Opcode::GreaterThan,
        Opcode::Minus,
        Opcode::Bang,
        Opcode::JumpNotTruthy,
        Opcode::Jump,
        Opcode::Null,
        Opcode::GetGlobal,
        Opcode::SetGlobal,
        Opcode::Array,
        Opcode::Hash,
        Opcode::Index,
        Opcode::Call,
        Opcode::ReturnValue,
        Opcode::Return,
        Opcode::GetLocal,
        Opcode::SetLocal,
    ];

    pub fn definition(self) -> Definition {
        use Opcode::*;
        match self {
            Constant => Definition::new("OpConstant", &[2]),
            Add => Definition::new("OpAdd", &[]),
            Pop => Definition::new("OpPop", &[]),
            Sub => Definition::new("OpSub", &[]),
            Mul => Definition::new("OpMul", &[]),
            Div => Definition::new("OpDiv", &[]),
            True => Definition::new("OpTrue", &[]),
            False => Definition::new("OpFalse", &[]),
            Equal => Definition::new("OpEqual", &[]),
            NotEqual => Definition::new("OpNotEqual", &[]),
            GreaterThan => Definition::new("OpGreaterThan", &[]),
            Minus => Definition::new("OpMinus", &[]),
            Bang => Definition::new("OpBang", &[]),
            JumpNotTruthy => Definition::new("OpJumpNotTruthy", &[2]),
            Jump => Definition::new("OpJump", &[2]),
            Null => Definition::new("OpNull", &[]),
            GetGlobal => Definition::new("OpGetGlobal", &[2]),
            SetGlobal => Definition::new("OpSetGlobal", &[2]),
            Array => Definition::new("OpArray", &[2]),
            Hash => Definition::new("OpHash", &[2]),
            Index => Definition::new("OpIndex", &[]),
            Call => Definition::new("OpCall", &[1]),
            ReturnValue => Definition::new("OpReturnValue", &[]),
            Return => Definition::new("OpReturn", &[]),
            GetLocal => Definition::new("OpGetLocal", &[1]),
            SetLocal => Definition::new("OpSetLocal", &[1]),
        }
    }

    /// Total encoded size of this opcode's instructions.
    #[inline]
    pub fn width(self) -> usize {
        self.definition().width()
    }

    /// Returns true for the opcodes whose operand is an instruction offset.
    #[inline]
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpNotTruthy)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::ALL.get(byte as usize).copied().ok_or(byte)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

/// Definition of the opcode encoded as `byte`, if there is one.
pub fn lookup(byte: u8) -> Option<Definition> {
    Opcode::try_from(byte).ok().map(Opcode::definition)
}

/// Encode one instruction.
///
/// Operands are truncated to their declared width; callers are expected to
/// range-check them first (the compiler reports oversized operands as errors).
pub fn make(op: Opcode, operands: &[usize]) -> Vec<u8> {
    let def = op.definition();
    debug_assert_eq!(
        operands.len(),
        def.operand_widths.len(),
        "{} expects {} operand(s)",
        def.name,
        def.operand_widths.len()
    );

    let mut instruction = Vec::with_capacity(def.width());
    instruction.push(op as u8);
    for (operand, width) in operands.iter().zip(def.operand_widths) {
        match width {
            2 => instruction.extend_from_slice(&(*operand as u16).to_be_bytes()),
            1 => instruction.push(*operand as u8),
            _ => unreachable!("unsupported operand width {}", width),
        }
    }
    instruction
}

/// Decode the operands that follow an opcode byte.
///
/// `ins` starts right after the opcode. Returns the operands and the number
/// of bytes they occupied, or `None` if `ins` is too short for them.
pub fn read_operands(def: &Definition, ins: &[u8]) -> Option<(Vec<usize>, usize)> {
    let mut operands = Vec::with_capacity(def.operand_widths.len());
    let mut offset = 0;
    for width in def.operand_widths {
        let bytes = ins.get(offset..offset + width)?;
        match width {
            2 => operands.push(read_u16(bytes) as usize),
            1 => operands.push(read_u8(bytes) as usize),
            _ => unreachable!("unsupported operand width {}", width),
        }
        offset += width;
    }
    Some((operands, offset))
}

/// Reads a big-endian `u16`. Panics if `ins` has fewer than two bytes.
#[inline]
pub fn read_u16(ins: &[u8]) -> u16 {
    u16::from_be_bytes([ins[0], ins[1]])
}

/// Panics if `ins` is empty.
#[inline]
pub fn read_u8(ins: &[u8]) -> u8 {
    ins[0]
}
