//! Parser error helpers.

use core_types::{EcoError, ErrorKind, SourcePosition};

/// Create a syntax error at a given position.
pub fn syntax_error(message: impl Into<String>, position: Option<SourcePosition>) -> EcoError {
    EcoError {
        kind: ErrorKind::SyntaxError,
        message: message.into(),
        position,
    }
}

/// Create an unexpected token error.
pub fn unexpected_token(got: &str, position: Option<SourcePosition>) -> EcoError {
    syntax_error(format!("unexpected token {}", got), position)
}

/// Create an unexpected end of input error.
pub fn unexpected_eof(position: Option<SourcePosition>) -> EcoError {
    syntax_error("unexpected end of input", position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_kind() {
        let err = syntax_error("test", None);
        assert!(matches!(err.kind, ErrorKind::SyntaxError));
    }

    #[test]
    fn test_unexpected_token_message() {
        let err = unexpected_token("'}'", None);
        assert!(err.message.contains("unexpected token"));
    }
}
