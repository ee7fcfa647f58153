//! Public API for the Blaze language.
//!
//! [`Session`] is the entry point: it runs source text through the parser,
//! the compiler and the VM, and keeps global state between inputs.
//!
//! # Example
//!
//! ```
//! use blaze_core::api::Session;
//!
//! let mut session = Session::default();
//! let value = session.run("let double = fn(x) { x * 2 }; double(21)").unwrap();
//! assert_eq!(value.to_string(), "42");
//! ```

pub mod error;
pub mod options;
pub mod session;

pub use error::Error;
pub use options::{SessionOptions, VmOptions};
pub use session::Session;
