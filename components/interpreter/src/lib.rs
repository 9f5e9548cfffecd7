//! Interpreter Component
//!
//! Tree-walking evaluation of parsed eco programs.
//!
//! # Overview
//!
//! - [`Runtime`] - Scope chain, closure call stack, `this` register, global
//!   record, and the `evaluate` dispatcher
//! - [`Closure`] - Captured lexical environment of a function value
//! - [`Unwind`] - Control-flow signal: non-local return, user throw, or
//!   engine error
//!
//! # Example
//!
//! ```
//! use interpreter::Runtime;
//! use parser::Parser;
//! use core_types::Value;
//!
//! let program = Parser::new("const x = 1 + 2 * 3; return x;").parse().unwrap();
//! let mut runtime = Runtime::new();
//! let result = runtime.run_program(&program).unwrap();
//! assert_eq!(result, Value::Number(7.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod closure;
mod eval;
pub mod runtime;

pub use closure::Closure;
pub use runtime::{EvalResult, Runtime, ScopeFrame, Unwind};
