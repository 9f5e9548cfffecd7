//! Core value and error types for the eco toolchain.
//!
//! This crate provides the foundational types shared by the parser,
//! interpreter, bundler, and CLI:
//!
//! - [`Value`] - Tagged representation of eco runtime values
//! - [`HtmlElement`] - Opaque result of evaluating an HTML expression literal
//! - [`EcoError`] - Errors with kind, message, and source position
//! - [`SourcePosition`] - Source code location
//!
//! # Examples
//!
//! ```
//! use core_types::{Value, EcoError, ErrorKind};
//!
//! let num = Value::Number(42.0);
//! assert!(num.is_truthy());
//! assert_eq!(num.type_of(), "number");
//!
//! let error = EcoError {
//!     kind: ErrorKind::TypeError,
//!     message: "undefined is not a function".to_string(),
//!     position: None,
//! };
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod html;
mod source;
mod value;

pub use error::{EcoError, ErrorKind};
pub use html::HtmlElement;
pub use source::SourcePosition;
pub use value::{FunctionValue, NativeFn, NativeFunction, Value};
