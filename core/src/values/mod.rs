//! Runtime values shared by the compiler's constant pool and the VM.

pub mod function;
pub mod value;

pub use function::CompiledFunction;
pub use value::{HashKey, Value};
