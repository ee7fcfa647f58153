//! Call frames for the VM.

use std::rc::Rc;

use crate::values::CompiledFunction;

/// One activation of a compiled function.
#[derive(Debug, Clone)]
pub struct Frame {
    pub function: Rc<CompiledFunction>,

    /// Offset of the next byte to decode in `function.instructions`.
    pub ip: usize,

    /// Stack index of local slot 0. The callee itself sits at `base - 1`.
    pub base: usize,
}

impl Frame {
    pub fn new(function: Rc<CompiledFunction>, base: usize) -> Self {
        Self {
            function,
            ip: 0,
            base,
        }
    }
}
