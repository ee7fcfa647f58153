use core::fmt;
use core::ops::{Deref, DerefMut};

use hashbrown::HashSet;

use crate::values::Value;
use crate::vm::instruction_set::{Opcode, read_operands};

/// A flat, encoded instruction stream.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Instructions(pub Vec<u8>);

impl Instructions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Absolute offsets targeted by any jump in this stream.
    fn jump_targets(&self) -> HashSet<usize> {
        let mut targets = HashSet::new();
        let mut ip = 0;
        while ip < self.0.len() {
            let Ok(op) = Opcode::try_from(self.0[ip]) else {
                break;
            };
            let def = op.definition();
            let Some((operands, _)) = read_operands(&def, &self.0[ip + 1..]) else {
                break;
            };
            if op.is_jump() {
                targets.extend(operands.first());
            }
            ip += def.width();
        }
        targets
    }
}

impl Deref for Instructions {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for Instructions {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl FromIterator<Vec<u8>> for Instructions {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        Self(iter.into_iter().flatten().collect())
    }
}

/// Disassembly listing, one instruction per line: `0003 OpJump 10`.
impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ip = 0;
        while ip < self.0.len() {
            let op = match Opcode::try_from(self.0[ip]) {
                Ok(op) => op,
                Err(byte) => {
                    writeln!(f, "{:04} ERROR: unknown opcode {:#04x}", ip, byte)?;
                    ip += 1;
                    continue;
                }
            };
            let def = op.definition();
            let Some((operands, read)) = read_operands(&def, &self.0[ip + 1..]) else {
                writeln!(f, "{:04} ERROR: truncated {}", ip, def.name)?;
                break;
            };
            write!(f, "{:04} {}", ip, def.name)?;
            for operand in &operands {
                write!(f, " {}", operand)?;
            }
            writeln!(f)?;
            ip += 1 + read;
        }
        Ok(())
    }
}

impl fmt::Debug for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Compiler output handed to the VM.
#[derive(Clone, Default, PartialEq)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

/// Formats an instruction stream with `Ln:` labels on jump targets.
fn write_labelled(f: &mut fmt::Formatter<'_>, ins: &Instructions, indent: &str) -> fmt::Result {
    let mut targets: Vec<_> = ins.jump_targets().into_iter().collect();
    targets.sort();
    let label_map: hashbrown::HashMap<usize, usize> = targets
        .into_iter()
        .enumerate()
        .map(|(i, addr)| (addr, i))
        .collect();

    for line in ins.to_string().lines() {
        let addr: Option<usize> = line.get(..4).and_then(|a| a.parse().ok());
        let label = addr
            .and_then(|a| label_map.get(&a))
            .map(|l| format!("L{}:", l))
            .unwrap_or_default();
        writeln!(f, "{}{:>4} {}", indent, label, line)?;
    }
    // Jumps past the last instruction land on the end of the stream.
    if let Some(l) = label_map.get(&ins.len()) {
        writeln!(f, "{}{:>4} {:04} <end>", indent, format!("L{}:", l), ins.len())?;
    }
    Ok(())
}

impl fmt::Debug for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bytecode {{")?;

        if self.constants.is_empty() {
            writeln!(f, "  constants: []")?;
        } else {
            writeln!(f, "  constants: [")?;
            for (i, constant) in self.constants.iter().enumerate() {
                match constant {
                    Value::Function(func) => {
                        writeln!(
                            f,
                            "    [{}] = fn(params: {}, locals: {})",
                            i, func.num_parameters, func.num_locals
                        )?;
                        write_labelled(f, &func.instructions, "      ")?;
                    }
                    other => writeln!(f, "    [{}] = {:?}", i, other)?,
                }
            }
            writeln!(f, "  ]")?;
        }

        writeln!(f, "  instructions:")?;
        write_labelled(f, &self.instructions, "    ")?;
        write!(f, "}}")
    }
}
