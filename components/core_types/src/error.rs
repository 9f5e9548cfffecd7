//! Error types shared by the parser, interpreter, and bundler.

use crate::SourcePosition;
use std::fmt;

/// The kind of error raised by the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Syntax error raised by the lexer or parser
    SyntaxError,
    /// Type error (e.g., calling a non-function)
    TypeError,
    /// Reference to an invalid assignment target
    ReferenceError,
    /// Module resolution or bundling failure
    ModuleError,
    /// Internal engine error
    InternalError,
}

/// An error with message, kind, and optional source position.
///
/// Parser errors always carry a position; the [`fmt::Display`] impl renders
/// them in the surface form `Error at line L, column C: <reason>`.
///
/// # Examples
///
/// ```
/// use core_types::{EcoError, ErrorKind, SourcePosition};
///
/// let error = EcoError {
///     kind: ErrorKind::SyntaxError,
///     message: "unexpected token".to_string(),
///     position: Some(SourcePosition { line: 2, column: 7, offset: 15 }),
/// };
///
/// assert_eq!(error.to_string(), "Error at line 2, column 7: unexpected token");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EcoError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Source position where the error occurred
    pub position: Option<SourcePosition>,
}

impl EcoError {
    /// Create an error without position information.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }
}

impl fmt::Display for EcoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(pos) => write!(
                f,
                "Error at line {}, column {}: {}",
                pos.line, pos.column, self.message
            ),
            None => write!(f, "Error: {}", self.message),
        }
    }
}

impl std::error::Error for EcoError {}
