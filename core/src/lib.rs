//! Blaze core: parser, bytecode compiler and stack-based virtual machine.
//!
//! Source text flows through the pipeline in three stages:
//!
//! ```text
//! source --parser--> ast::Program --compiler--> vm::Bytecode --vm--> values::Value
//! ```
//!
//! [`api::Session`] wires the stages together and carries global state
//! (symbols, constants, global values) from one input to the next, which is
//! what the REPL uses.

pub mod api;
pub mod ast;
pub mod compiler;
pub mod parser;
pub mod values;
pub mod vm;

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_nested_scopes() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
