use core::fmt;

use crate::vm::Instructions;

/// A function body lowered to bytecode.
///
/// Stored in the constant pool of the scope that defined it and shared by
/// reference from there on.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    /// Local slots the frame reserves, parameters included.
    pub num_locals: usize,
    pub num_parameters: usize,
}

impl CompiledFunction {
    pub fn new(instructions: Instructions, num_locals: usize, num_parameters: usize) -> Self {
        debug_assert!(num_parameters <= num_locals);
        Self {
            instructions,
            num_locals,
            num_parameters,
        }
    }

    /// Wraps top-level instructions so the main program can run as frame 0.
    pub fn main(instructions: Instructions) -> Self {
        Self::new(instructions, 0, 0)
    }
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFunction")
            .field("num_locals", &self.num_locals)
            .field("num_parameters", &self.num_parameters)
            .field("instructions", &format_args!("{} bytes", self.instructions.len()))
            .finish()
    }
}
