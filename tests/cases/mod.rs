//! Shared harness for the table-style integration tests.
//!
//! `test_case!` runs one input through the public API and checks any of:
//!
//! - `ast`: the parsed program printed back in its canonical form
//! - `value`: the REPL form of the final value
//! - `error`: the failing stage (`"parse"`, `"compile"` or `"runtime"`)
//! - `message`: a fragment of the error message

#![allow(dead_code, unused_macros)]

use blaze::{Error, Session, Value};

pub fn run(input: &str) -> Result<Value, Error> {
    Session::default().run(input)
}

pub fn run_err(input: &str) -> Error {
    match run(input) {
        Ok(value) => panic!("expected {:?} to fail, got {}", input, value),
        Err(err) => err,
    }
}

macro_rules! check_field {
    ($input:expr, ast: $expected:expr) => {
        let program = blaze::parse($input).expect("input should parse");
        pretty_assertions::assert_eq!(program.to_string(), $expected);
    };
    ($input:expr, value: $expected:expr) => {
        let value = cases::run($input).expect("input should run");
        pretty_assertions::assert_eq!(value.to_string(), $expected);
    };
    ($input:expr, error: $expected:expr) => {
        assert_eq!(cases::run_err($input).stage(), $expected);
    };
    ($input:expr, message: $expected:expr) => {
        let message = cases::run_err($input).to_string();
        assert!(
            message.contains($expected),
            "error message {:?} should contain {:?}",
            message,
            $expected
        );
    };
}

macro_rules! test_case {
    ($name:ident, input: $input:expr, $($key:ident: $expected:expr),+ $(,)?) => {
        #[test]
        fn $name() {
            let input: &str = $input;
            $( check_field!(input, $key: $expected); )+
        }
    };
}
