//! Recursive descent parser for the eco language.
//!
//! The expression grammar is a precedence ladder: assignment → ternary →
//! logical → equality/relational → additive → multiplicative → unary prefix
//! → postfix → access/call chain → primary. Only the access chain iterates;
//! every other binary level consumes a single operator and a single
//! sub-level right operand, so same-level chains like `a + b + c` stop
//! after `a + b` and the remainder fails at the statement terminator.
//!
//! Arrow functions are disambiguated from parenthesized expressions by
//! backtracking: the lexer position is snapshotted before each primary
//! attempt and restored when the primary fails or is followed by `=>`.

use crate::ast::*;
use crate::error::{syntax_error, unexpected_token};
use crate::lexer::{Keyword, Lexer, Operator, Symbol, Token, TokenKind};
use core_types::EcoError;

/// Parser for eco source code.
pub struct Parser {
    lexer: Lexer,
    /// Current block nesting depth; imports and exports only parse at depth 0
    block_depth: usize,
}

impl Parser {
    /// Create a new parser for the given source code.
    pub fn new(source: &str) -> Self {
        Self {
            lexer: Lexer::new(source),
            block_depth: 0,
        }
    }

    /// Parse the source into a program (a list of top-level statements).
    pub fn parse(&mut self) -> Result<Program, EcoError> {
        let mut statements = Vec::new();
        while self.lexer.peek()?.is_some() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parse a single expression; entry point used for `#{…}` interpolation.
    pub fn parse_single_expression(&mut self) -> Result<Expression, EcoError> {
        self.parse_expression()
    }

    fn error_here(&mut self, message: impl Into<String>) -> EcoError {
        let position = self.lexer.get_position();
        syntax_error(message, Some(self.lexer.get_line_and_column(position)))
    }

    fn unexpected(&mut self, token: &Token) -> EcoError {
        unexpected_token(
            &token.kind.describe(),
            Some(self.lexer.get_line_and_column(token.position)),
        )
    }

    fn parse_statement(&mut self) -> Result<Statement, EcoError> {
        let token = match self.lexer.peek()? {
            Some(token) => token.clone(),
            None => return Err(self.error_here("unexpected end of input")),
        };

        match token.kind {
            TokenKind::Keyword(Keyword::Const) | TokenKind::Keyword(Keyword::Let) => {
                self.parse_var_decl()
            }
            TokenKind::Symbol(Symbol::LBrace) => self.parse_block(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            TokenKind::Keyword(Keyword::Export) | TokenKind::Keyword(Keyword::Expose) => {
                self.parse_export()
            }
            TokenKind::Symbol(Symbol::Semicolon) => {
                self.lexer.consume()?;
                Ok(Statement::Noop)
            }
            _ => {
                let expression = self.parse_expression()?;
                self.lexer.consume_symbol(Symbol::Semicolon)?;
                Ok(Statement::Expression(expression))
            }
        }
    }

    fn parse_var_decl(&mut self) -> Result<Statement, EcoError> {
        let keyword = self.lexer.consume()?;
        let is_const = matches!(keyword.kind, TokenKind::Keyword(Keyword::Const));
        let binding = self.parse_binding()?;
        self.lexer.consume_symbol(Symbol::Semicolon)?;
        Ok(Statement::VarDecl { is_const, binding })
    }

    fn parse_block(&mut self) -> Result<Statement, EcoError> {
        self.lexer.consume_symbol(Symbol::LBrace)?;
        self.block_depth += 1;
        let mut statements = Vec::new();
        loop {
            match self.lexer.peek()? {
                None => {
                    self.block_depth -= 1;
                    return Err(self.error_here("unexpected end of input"));
                }
                Some(token) if matches!(token.kind, TokenKind::Symbol(Symbol::RBrace)) => {
                    self.lexer.consume()?;
                    break;
                }
                Some(_) => {
                    let statement = match self.parse_statement() {
                        Ok(statement) => statement,
                        Err(err) => {
                            self.block_depth -= 1;
                            return Err(err);
                        }
                    };
                    statements.push(statement);
                }
            }
        }
        self.block_depth -= 1;
        Ok(Statement::Block(statements))
    }

    fn parse_if(&mut self) -> Result<Statement, EcoError> {
        self.lexer.consume_keyword(Keyword::If)?;
        self.lexer.consume_symbol(Symbol::LParen)?;
        let cond = self.parse_expression()?;
        self.lexer.consume_symbol(Symbol::RParen)?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.lexer.peek_keyword(Keyword::Else)? {
            self.lexer.consume()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Statement, EcoError> {
        self.lexer.consume_keyword(Keyword::While)?;
        self.lexer.consume_symbol(Symbol::LParen)?;
        let cond = self.parse_expression()?;
        self.lexer.consume_symbol(Symbol::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While { cond, body })
    }

    fn parse_return(&mut self) -> Result<Statement, EcoError> {
        self.lexer.consume_keyword(Keyword::Return)?;
        if self.lexer.peek_symbol(Symbol::Semicolon)? {
            self.lexer.consume()?;
            return Ok(Statement::Return { value: None });
        }
        let value = self.parse_expression()?;
        self.lexer.consume_symbol(Symbol::Semicolon)?;
        Ok(Statement::Return { value: Some(value) })
    }

    fn parse_throw(&mut self) -> Result<Statement, EcoError> {
        self.lexer.consume_keyword(Keyword::Throw)?;
        let value = self.parse_expression()?;
        self.lexer.consume_symbol(Symbol::Semicolon)?;
        Ok(Statement::Throw { value })
    }

    fn parse_try(&mut self) -> Result<Statement, EcoError> {
        self.lexer.consume_keyword(Keyword::Try)?;
        let try_block = Box::new(self.parse_block()?);
        self.lexer.consume_keyword(Keyword::Catch)?;
        let catch_name = if self.lexer.peek_symbol(Symbol::LParen)? {
            self.lexer.consume()?;
            let name = self.lexer.expect_identifier()?;
            self.lexer.consume_symbol(Symbol::RParen)?;
            Some(name)
        } else {
            None
        };
        let catch_block = Box::new(self.parse_block()?);
        let finally_block = if self.lexer.peek_keyword(Keyword::Finally)? {
            self.lexer.consume()?;
            Some(Box::new(self.parse_block()?))
        } else {
            None
        };
        Ok(Statement::TryCatch {
            try_block,
            catch_block,
            catch_name,
            finally_block,
        })
    }

    // ---------------------------------------------------------------------
    // Bindings and destructuring patterns
    // ---------------------------------------------------------------------

    fn parse_binding(&mut self) -> Result<Binding, EcoError> {
        let pattern = self.parse_pattern()?;
        let init = if self.lexer.peek_operator(Operator::Assign)? {
            self.lexer.consume()?;
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Binding { pattern, init })
    }

    fn parse_pattern(&mut self) -> Result<Pattern, EcoError> {
        let token = match self.lexer.peek()? {
            Some(token) => token.clone(),
            None => return Err(self.error_here("unexpected end of input")),
        };
        match token.kind {
            TokenKind::Identifier(_) => {
                let name = self.lexer.expect_identifier()?;
                Ok(Pattern::Identifier(name))
            }
            TokenKind::Symbol(Symbol::LBracket) => self.parse_array_pattern(),
            TokenKind::Symbol(Symbol::LBrace) => self.parse_object_pattern(),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, EcoError> {
        self.lexer.consume_symbol(Symbol::LBracket)?;
        let mut elements: Vec<Option<DestructuredValue>> = Vec::new();
        let mut seen_rest = false;
        loop {
            if self.lexer.peek_symbol(Symbol::RBracket)? {
                self.lexer.consume()?;
                break;
            }
            if self.lexer.peek_symbol(Symbol::Comma)? {
                // A comma with no value is a hole.
                if seen_rest {
                    return Err(self.error_here("cannot destructure more values after rest"));
                }
                self.lexer.consume()?;
                elements.push(None);
                continue;
            }
            if seen_rest {
                return Err(self.error_here("cannot destructure more values after rest"));
            }
            let value = self.parse_destructured_value()?;
            seen_rest = value.is_rest;
            elements.push(Some(value));
            if self.lexer.peek_symbol(Symbol::Comma)? {
                self.lexer.consume()?;
            } else {
                self.lexer.consume_symbol(Symbol::RBracket)?;
                break;
            }
        }
        Ok(Pattern::Array(elements))
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, EcoError> {
        self.lexer.consume_symbol(Symbol::LBrace)?;
        let mut entries = Vec::new();
        let mut seen_rest = false;
        loop {
            if self.lexer.peek_symbol(Symbol::RBrace)? {
                self.lexer.consume()?;
                break;
            }
            if seen_rest {
                return Err(self.error_here("cannot destructure more values after rest"));
            }
            let value = self.parse_destructured_value()?;
            seen_rest = value.is_rest;
            entries.push(value);
            if self.lexer.peek_symbol(Symbol::Comma)? {
                self.lexer.consume()?;
            } else {
                self.lexer.consume_symbol(Symbol::RBrace)?;
                break;
            }
        }
        Ok(Pattern::Object(entries))
    }

    fn parse_destructured_value(&mut self) -> Result<DestructuredValue, EcoError> {
        if self.lexer.peek_symbol(Symbol::Ellipsis)? {
            self.lexer.consume()?;
            let name = self.lexer.expect_identifier()?;
            return Ok(DestructuredValue {
                name,
                default: None,
                is_rest: true,
            });
        }
        let name = self.lexer.expect_identifier()?;
        let default = if self.lexer.peek_operator(Operator::Assign)? {
            self.lexer.consume()?;
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(DestructuredValue {
            name,
            default,
            is_rest: false,
        })
    }

    // ---------------------------------------------------------------------
    // Imports and exports
    // ---------------------------------------------------------------------

    fn parse_import(&mut self) -> Result<Statement, EcoError> {
        if self.block_depth > 0 {
            return Err(self.error_here("imports must be top level"));
        }
        self.lexer.consume_keyword(Keyword::Import)?;

        let token = match self.lexer.peek()? {
            Some(token) => token.clone(),
            None => return Err(self.error_here("unexpected end of input")),
        };

        let decl = match token.kind {
            // import 'file';
            TokenKind::Str(_) => {
                let from_file = self.expect_string()?;
                ImportDecl {
                    default_name: None,
                    namespace_name: None,
                    named: None,
                    from_file,
                }
            }
            // import * as ns from 'file';
            TokenKind::Operator(Operator::Star) => {
                self.lexer.consume()?;
                self.lexer.consume_keyword(Keyword::As)?;
                let namespace_name = self.lexer.expect_identifier()?;
                self.lexer.consume_keyword(Keyword::From)?;
                let from_file = self.expect_string()?;
                ImportDecl {
                    default_name: None,
                    namespace_name: Some(namespace_name),
                    named: None,
                    from_file,
                }
            }
            // import { a, b as c } from 'file';
            TokenKind::Symbol(Symbol::LBrace) => {
                let named = self.parse_import_bindings()?;
                self.lexer.consume_keyword(Keyword::From)?;
                let from_file = self.expect_string()?;
                ImportDecl {
                    default_name: None,
                    namespace_name: None,
                    named: Some(named),
                    from_file,
                }
            }
            // import x from 'file';
            TokenKind::Identifier(_) => {
                let default_name = self.lexer.expect_identifier()?;
                self.lexer.consume_keyword(Keyword::From)?;
                let from_file = self.expect_string()?;
                ImportDecl {
                    default_name: Some(default_name),
                    namespace_name: None,
                    named: None,
                    from_file,
                }
            }
            _ => return Err(self.unexpected(&token)),
        };

        self.lexer.consume_symbol(Symbol::Semicolon)?;
        Ok(Statement::Import(decl))
    }

    fn parse_import_bindings(&mut self) -> Result<Vec<ImportBinding>, EcoError> {
        self.lexer.consume_symbol(Symbol::LBrace)?;
        let mut bindings = Vec::new();
        loop {
            if self.lexer.peek_symbol(Symbol::RBrace)? {
                self.lexer.consume()?;
                break;
            }
            let name = self.lexer.expect_identifier()?;
            let alias = if self.lexer.peek_keyword(Keyword::As)? {
                self.lexer.consume()?;
                Some(self.lexer.expect_identifier()?)
            } else {
                None
            };
            bindings.push(ImportBinding { name, alias });
            if self.lexer.peek_symbol(Symbol::Comma)? {
                self.lexer.consume()?;
            } else {
                self.lexer.consume_symbol(Symbol::RBrace)?;
                break;
            }
        }
        Ok(bindings)
    }

    fn parse_export(&mut self) -> Result<Statement, EcoError> {
        if self.block_depth > 0 {
            return Err(self.error_here("exports must be top level"));
        }
        // `expose` is accepted as a synonym of `export`.
        self.lexer.consume()?;

        let token = match self.lexer.peek()? {
            Some(token) => token.clone(),
            None => return Err(self.error_here("unexpected end of input")),
        };

        let decl = match token.kind {
            // export default expr;
            TokenKind::Keyword(Keyword::Default) => {
                self.lexer.consume()?;
                let value = self.parse_expression()?;
                self.lexer.consume_symbol(Symbol::Semicolon)?;
                ExportDecl::Default(value)
            }
            // export const|let …;
            TokenKind::Keyword(Keyword::Const) | TokenKind::Keyword(Keyword::Let) => {
                let keyword = self.lexer.consume()?;
                let is_const = matches!(keyword.kind, TokenKind::Keyword(Keyword::Const));
                let binding = self.parse_binding()?;
                self.lexer.consume_symbol(Symbol::Semicolon)?;
                ExportDecl::VarDecl { is_const, binding }
            }
            // export * from 'file';
            TokenKind::Operator(Operator::Star) => {
                self.lexer.consume()?;
                self.lexer.consume_keyword(Keyword::From)?;
                let file = self.expect_string()?;
                self.lexer.consume_symbol(Symbol::Semicolon)?;
                ExportDecl::Reexport {
                    file,
                    all: true,
                    named: Vec::new(),
                }
            }
            // export { a, b as c, default as d } from 'file';
            TokenKind::Symbol(Symbol::LBrace) => {
                let named = self.parse_export_bindings()?;
                self.lexer.consume_keyword(Keyword::From)?;
                let file = self.expect_string()?;
                self.lexer.consume_symbol(Symbol::Semicolon)?;
                ExportDecl::Reexport {
                    file,
                    all: false,
                    named,
                }
            }
            _ => return Err(self.unexpected(&token)),
        };

        Ok(Statement::Export(decl))
    }

    fn parse_export_bindings(&mut self) -> Result<Vec<ExportBinding>, EcoError> {
        self.lexer.consume_symbol(Symbol::LBrace)?;
        let mut bindings = Vec::new();
        loop {
            if self.lexer.peek_symbol(Symbol::RBrace)? {
                self.lexer.consume()?;
                break;
            }
            // `default as d` re-exports the source module's default.
            let name = if self.lexer.peek_keyword(Keyword::Default)? {
                self.lexer.consume()?;
                "default".to_string()
            } else {
                self.lexer.expect_identifier()?
            };
            let alias = if self.lexer.peek_keyword(Keyword::As)? {
                self.lexer.consume()?;
                Some(self.lexer.expect_identifier()?)
            } else {
                None
            };
            bindings.push(ExportBinding { name, alias });
            if self.lexer.peek_symbol(Symbol::Comma)? {
                self.lexer.consume()?;
            } else {
                self.lexer.consume_symbol(Symbol::RBrace)?;
                break;
            }
        }
        Ok(bindings)
    }

    fn expect_string(&mut self) -> Result<String, EcoError> {
        let token = self.lexer.consume()?;
        match token.kind {
            TokenKind::Str(value) => Ok(value),
            ref other => Err(self.lexer.error_at(
                token.position,
                format!("expected string got {}", other.describe()),
            )),
        }
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expression, EcoError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, EcoError> {
        let left = self.parse_ternary()?;
        let op = match self.lexer.peek()? {
            Some(Token {
                kind: TokenKind::Operator(op),
                ..
            }) => match op {
                Operator::Assign => AssignOp::Assign,
                Operator::PlusAssign => AssignOp::AddAssign,
                Operator::MinusAssign => AssignOp::SubAssign,
                Operator::StarAssign => AssignOp::MulAssign,
                Operator::SlashAssign => AssignOp::DivAssign,
                _ => return Ok(left),
            },
            _ => return Ok(left),
        };
        self.lexer.consume()?;
        // Right-associative: a = b = c assigns b first.
        let value = self.parse_assignment()?;
        Ok(Expression::Assignment {
            target: Box::new(left),
            op,
            value: Box::new(value),
        })
    }

    fn parse_ternary(&mut self) -> Result<Expression, EcoError> {
        let cond = self.parse_logical()?;
        if !self.lexer.peek_symbol(Symbol::Question)? {
            return Ok(cond);
        }
        self.lexer.consume()?;
        let then_branch = self.parse_ternary()?;
        self.lexer.consume_symbol(Symbol::Colon)?;
        let else_branch = self.parse_ternary()?;
        Ok(Expression::Ternary {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn parse_logical(&mut self) -> Result<Expression, EcoError> {
        let left = self.parse_equality()?;
        let op = match self.lexer.peek()? {
            Some(Token {
                kind: TokenKind::Operator(Operator::AndAnd),
                ..
            }) => BinaryOp::And,
            Some(Token {
                kind: TokenKind::Operator(Operator::OrOr),
                ..
            }) => BinaryOp::Or,
            _ => return Ok(left),
        };
        self.lexer.consume()?;
        let right = self.parse_equality()?;
        Ok(Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_equality(&mut self) -> Result<Expression, EcoError> {
        let left = self.parse_additive()?;
        let op = match self.lexer.peek()? {
            Some(Token { kind, .. }) => match kind {
                TokenKind::Operator(Operator::StrictEq) => BinaryOp::StrictEq,
                TokenKind::Operator(Operator::Eq) => BinaryOp::Eq,
                TokenKind::Operator(Operator::StrictNotEq) => BinaryOp::StrictNotEq,
                TokenKind::Operator(Operator::NotEq) => BinaryOp::NotEq,
                TokenKind::Operator(Operator::GtEq) => BinaryOp::GtEq,
                TokenKind::Operator(Operator::LtEq) => BinaryOp::LtEq,
                TokenKind::Symbol(Symbol::Gt) => BinaryOp::Gt,
                TokenKind::Symbol(Symbol::Lt) => BinaryOp::Lt,
                _ => return Ok(left),
            },
            None => return Ok(left),
        };
        self.lexer.consume()?;
        let right = self.parse_additive()?;
        Ok(Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expression, EcoError> {
        let left = self.parse_multiplicative()?;
        let op = match self.lexer.peek()? {
            Some(Token {
                kind: TokenKind::Operator(Operator::Plus),
                ..
            }) => BinaryOp::Add,
            Some(Token {
                kind: TokenKind::Operator(Operator::Minus),
                ..
            }) => BinaryOp::Sub,
            _ => return Ok(left),
        };
        self.lexer.consume()?;
        let right = self.parse_multiplicative()?;
        Ok(Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, EcoError> {
        let left = self.parse_unary()?;
        let op = match self.lexer.peek()? {
            Some(Token {
                kind: TokenKind::Operator(Operator::Star),
                ..
            }) => BinaryOp::Mul,
            Some(Token {
                kind: TokenKind::Operator(Operator::Slash),
                ..
            }) => BinaryOp::Div,
            _ => return Ok(left),
        };
        self.lexer.consume()?;
        let right = self.parse_unary()?;
        Ok(Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn parse_unary(&mut self) -> Result<Expression, EcoError> {
        match self.lexer.peek()? {
            Some(Token {
                kind: TokenKind::Operator(Operator::Not),
                ..
            }) => {
                self.lexer.consume()?;
                let expr = self.parse_unary()?;
                Ok(Expression::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(expr),
                })
            }
            Some(Token {
                kind: TokenKind::Operator(Operator::Minus),
                ..
            }) => {
                self.lexer.consume()?;
                let expr = self.parse_unary()?;
                Ok(Expression::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                })
            }
            Some(Token {
                kind: TokenKind::Operator(Operator::Increment),
                ..
            }) => {
                self.lexer.consume()?;
                let expr = self.parse_unary()?;
                Ok(Expression::IncOrDec {
                    is_prefix: true,
                    op: IncDecOp::Increment,
                    expr: Box::new(expr),
                })
            }
            Some(Token {
                kind: TokenKind::Operator(Operator::Decrement),
                ..
            }) => {
                self.lexer.consume()?;
                let expr = self.parse_unary()?;
                Ok(Expression::IncOrDec {
                    is_prefix: true,
                    op: IncDecOp::Decrement,
                    expr: Box::new(expr),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, EcoError> {
        let expr = self.parse_access_chain()?;
        if self.lexer.peek_operator(Operator::Increment)? {
            self.lexer.consume()?;
            return Ok(Expression::IncOrDec {
                is_prefix: false,
                op: IncDecOp::Increment,
                expr: Box::new(expr),
            });
        }
        if self.lexer.peek_operator(Operator::Decrement)? {
            self.lexer.consume()?;
            return Ok(Expression::IncOrDec {
                is_prefix: false,
                op: IncDecOp::Decrement,
                expr: Box::new(expr),
            });
        }
        Ok(expr)
    }

    /// The access/call chain is the only left-associated, iterated level.
    fn parse_access_chain(&mut self) -> Result<Expression, EcoError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.lexer.peek()? {
                Some(Token {
                    kind: TokenKind::Symbol(Symbol::Dot),
                    ..
                }) => {
                    self.lexer.consume()?;
                    let field = self.lexer.expect_identifier()?;
                    if self.lexer.peek_symbol(Symbol::LParen)? {
                        let args = self.parse_arguments()?;
                        expr = Expression::MethodCall {
                            object: Box::new(expr),
                            field_name: field,
                            args,
                        };
                    } else {
                        expr = Expression::FieldAccess {
                            object: Box::new(expr),
                            field,
                        };
                    }
                }
                Some(Token {
                    kind: TokenKind::Symbol(Symbol::LBracket),
                    ..
                }) => {
                    self.lexer.consume()?;
                    let index = self.parse_expression()?;
                    self.lexer.consume_symbol(Symbol::RBracket)?;
                    expr = Expression::ArrayAccess {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(Token {
                    kind: TokenKind::Symbol(Symbol::LParen),
                    ..
                }) => {
                    let args = self.parse_arguments()?;
                    expr = Expression::FuncCall {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, EcoError> {
        self.lexer.consume_symbol(Symbol::LParen)?;
        let mut args = Vec::new();
        loop {
            if self.lexer.peek_symbol(Symbol::RParen)? {
                self.lexer.consume()?;
                break;
            }
            args.push(self.parse_expression()?);
            if self.lexer.peek_symbol(Symbol::Comma)? {
                self.lexer.consume()?;
            } else {
                self.lexer.consume_symbol(Symbol::RParen)?;
                break;
            }
        }
        Ok(args)
    }

    /// Primary dispatch with arrow-function backtracking.
    ///
    /// The lexer position is snapshotted before the attempt. When the
    /// primary parse fails, or succeeds but is immediately followed by
    /// `=>`, the stream is rewound and re-parsed as an arrow function.
    fn parse_primary(&mut self) -> Result<Expression, EcoError> {
        let start = self.lexer.get_position();
        match self.parse_primary_inner() {
            Ok(expr) => {
                if self.lexer.peek_symbol(Symbol::Arrow).unwrap_or(false) {
                    self.lexer.revert(start);
                    return self.parse_arrow_function();
                }
                Ok(expr)
            }
            Err(_) => {
                self.lexer.revert(start);
                self.parse_arrow_function()
            }
        }
    }

    fn parse_primary_inner(&mut self) -> Result<Expression, EcoError> {
        let token = match self.lexer.peek()? {
            Some(token) => token.clone(),
            None => return Err(self.error_here("unexpected end of input")),
        };

        match token.kind {
            TokenKind::Boolean(b) => {
                self.lexer.consume()?;
                Ok(Expression::Literal(Literal::Boolean(b)))
            }
            TokenKind::Null => {
                self.lexer.consume()?;
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::Undefined => {
                self.lexer.consume()?;
                Ok(Expression::Literal(Literal::Undefined))
            }
            TokenKind::Number(n) => {
                self.lexer.consume()?;
                Ok(Expression::Literal(Literal::Number(n)))
            }
            TokenKind::Str(s) => {
                self.lexer.consume()?;
                Ok(Expression::Literal(Literal::Str(s)))
            }
            TokenKind::Identifier(name) => {
                self.lexer.consume()?;
                Ok(Expression::Load { name })
            }
            TokenKind::Symbol(Symbol::LParen) => {
                self.lexer.consume()?;
                let inner = self.parse_expression()?;
                self.lexer.consume_symbol(Symbol::RParen)?;
                Ok(Expression::Parens(Box::new(inner)))
            }
            TokenKind::Symbol(Symbol::LBracket) => self.parse_array_literal(),
            TokenKind::Symbol(Symbol::LBrace) => self.parse_object_literal(),
            TokenKind::Symbol(Symbol::Lt) => self.parse_html(),
            TokenKind::Symbol(Symbol::Backtick) => self.parse_template_string(),
            TokenKind::Keyword(Keyword::New) => {
                self.lexer.consume()?;
                let class_name = self.lexer.expect_identifier()?;
                let args = self.parse_arguments()?;
                Ok(Expression::New { class_name, args })
            }
            TokenKind::Keyword(Keyword::Typeof) => {
                self.lexer.consume()?;
                let expr = self.parse_unary()?;
                Ok(Expression::Typeof(Box::new(expr)))
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, EcoError> {
        self.lexer.consume_symbol(Symbol::LBracket)?;
        let mut elements = Vec::new();
        loop {
            if self.lexer.peek_symbol(Symbol::RBracket)? {
                self.lexer.consume()?;
                break;
            }
            if self.lexer.peek_symbol(Symbol::Ellipsis)? {
                self.lexer.consume()?;
                let value = self.parse_expression()?;
                elements.push(Expression::Spread(Box::new(value)));
            } else {
                elements.push(self.parse_expression()?);
            }
            if self.lexer.peek_symbol(Symbol::Comma)? {
                self.lexer.consume()?;
            } else {
                self.lexer.consume_symbol(Symbol::RBracket)?;
                break;
            }
        }
        Ok(Expression::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, EcoError> {
        self.lexer.consume_symbol(Symbol::LBrace)?;
        let mut fields = Vec::new();
        loop {
            if self.lexer.peek_symbol(Symbol::RBrace)? {
                self.lexer.consume()?;
                break;
            }
            fields.push(self.parse_object_property()?);
            if self.lexer.peek_symbol(Symbol::Comma)? {
                self.lexer.consume()?;
            } else {
                self.lexer.consume_symbol(Symbol::RBrace)?;
                break;
            }
        }
        Ok(Expression::Object(fields))
    }

    fn parse_object_property(&mut self) -> Result<ObjectProperty, EcoError> {
        if self.lexer.peek_symbol(Symbol::Ellipsis)? {
            self.lexer.consume()?;
            let value = self.parse_expression()?;
            return Ok(ObjectProperty::Spread(value));
        }
        if self.lexer.peek_symbol(Symbol::LBracket)? {
            self.lexer.consume()?;
            let key = self.parse_expression()?;
            self.lexer.consume_symbol(Symbol::RBracket)?;
            self.lexer.consume_symbol(Symbol::Colon)?;
            let value = self.parse_expression()?;
            return Ok(ObjectProperty::Dynamic { key, value });
        }

        let token = self.lexer.consume()?;
        let key = match token.kind {
            TokenKind::Identifier(name) => name,
            TokenKind::Str(value) => value,
            ref other => {
                return Err(self.lexer.error_at(
                    token.position,
                    format!("expected property name got {}", other.describe()),
                ))
            }
        };
        if self.lexer.peek_symbol(Symbol::Colon)? {
            self.lexer.consume()?;
            let value = self.parse_expression()?;
            Ok(ObjectProperty::Regular {
                key,
                value: Some(value),
            })
        } else {
            // Shorthand: { name } loads `name` from the scope chain.
            Ok(ObjectProperty::Regular { key, value: None })
        }
    }

    fn parse_arrow_function(&mut self) -> Result<Expression, EcoError> {
        let parameters = if self.lexer.peek_symbol(Symbol::LParen)? {
            self.lexer.consume()?;
            let mut parameters = Vec::new();
            loop {
                if self.lexer.peek_symbol(Symbol::RParen)? {
                    self.lexer.consume()?;
                    break;
                }
                parameters.push(self.parse_binding()?);
                if self.lexer.peek_symbol(Symbol::Comma)? {
                    self.lexer.consume()?;
                } else {
                    self.lexer.consume_symbol(Symbol::RParen)?;
                    break;
                }
            }
            parameters
        } else {
            let name = self.lexer.expect_identifier()?;
            vec![Binding {
                pattern: Pattern::Identifier(name),
                init: None,
            }]
        };

        self.lexer.consume_symbol(Symbol::Arrow)?;

        let body = if self.lexer.peek_symbol(Symbol::LBrace)? {
            FunctionBody::Block(Box::new(self.parse_block()?))
        } else {
            FunctionBody::Expression(Box::new(self.parse_expression()?))
        };

        Ok(Expression::Function { parameters, body })
    }

    // ---------------------------------------------------------------------
    // Template strings and HTML
    // ---------------------------------------------------------------------

    fn parse_template_string(&mut self) -> Result<Expression, EcoError> {
        self.lexer.consume_symbol(Symbol::Backtick)?;
        let mut parts = Vec::new();
        loop {
            let text = self.lexer.get_until(&["`", "${"])?;
            if let TokenKind::Str(content) = text.kind {
                if !content.is_empty() {
                    parts.push(Expression::TemplateStringContent(content));
                }
            }
            if self.lexer.peek_symbol(Symbol::Backtick)? {
                self.lexer.consume()?;
                break;
            }
            self.lexer.consume_symbol(Symbol::DollarBrace)?;
            let expr = self.parse_expression()?;
            self.lexer.consume_symbol(Symbol::RBrace)?;
            parts.push(expr);
        }
        Ok(Expression::TemplateString(parts))
    }

    fn parse_html(&mut self) -> Result<Expression, EcoError> {
        self.lexer.consume_symbol(Symbol::Lt)?;

        // Tagless fragment: <>children</>
        if self.lexer.peek_symbol(Symbol::Gt)? {
            self.lexer.consume()?;
            let children = self.parse_html_children(None)?;
            return Ok(Expression::Html {
                tag_name: None,
                attributes: Vec::new(),
                children,
            });
        }

        let tag_name = self.lexer.expect_identifier()?;
        let mut attributes = Vec::new();
        let children;
        loop {
            if self.lexer.peek_symbol(Symbol::Gt)? {
                self.lexer.consume()?;
                children = self.parse_html_children(Some(&tag_name))?;
                break;
            }
            if self.lexer.peek_symbol(Symbol::SlashGt)? {
                self.lexer.consume()?;
                children = Vec::new();
                break;
            }
            attributes.push(self.parse_html_attribute()?);
        }

        Ok(Expression::Html {
            tag_name: Some(tag_name),
            attributes,
            children,
        })
    }

    fn parse_html_attribute(&mut self) -> Result<HtmlAttribute, EcoError> {
        let name = self.lexer.expect_identifier()?;
        if !self.lexer.peek_operator(Operator::Assign)? {
            // A bare attribute means true.
            return Ok(HtmlAttribute {
                name,
                value: Expression::Literal(Literal::Boolean(true)),
            });
        }
        self.lexer.consume()?;

        let token = match self.lexer.peek()? {
            Some(token) => token.clone(),
            None => return Err(self.error_here("unexpected end of input")),
        };
        let value = match token.kind {
            TokenKind::Str(s) => {
                self.lexer.consume()?;
                Expression::Literal(Literal::Str(s))
            }
            TokenKind::Symbol(Symbol::LBrace) => {
                self.lexer.consume()?;
                let expr = self.parse_expression()?;
                self.lexer.consume_symbol(Symbol::RBrace)?;
                expr
            }
            _ => return Err(self.unexpected(&token)),
        };
        Ok(HtmlAttribute { name, value })
    }

    fn parse_html_children(
        &mut self,
        tag_name: Option<&str>,
    ) -> Result<Vec<Expression>, EcoError> {
        let mut children = Vec::new();
        loop {
            let text = self.lexer.get_until(&["<", "{"])?;
            if let TokenKind::Str(content) = text.kind {
                if !content.trim().is_empty() {
                    children.push(Expression::HtmlText(content));
                }
            }
            if self.lexer.peek_symbol(Symbol::LBrace)? {
                self.lexer.consume()?;
                let expr = self.parse_expression()?;
                self.lexer.consume_symbol(Symbol::RBrace)?;
                children.push(Expression::HtmlExpr(Box::new(expr)));
                continue;
            }
            if self.lexer.peek_symbol(Symbol::LtSlash)? {
                self.lexer.consume()?;
                match tag_name {
                    Some(name) => {
                        // Closing tag must match the opening tag.
                        self.lexer.consume_identifier(name)?;
                    }
                    None => {}
                }
                self.lexer.consume_symbol(Symbol::Gt)?;
                break;
            }
            children.push(self.parse_html()?);
        }
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source).parse().unwrap()
    }

    fn parse_err(source: &str) -> EcoError {
        Parser::new(source).parse().unwrap_err()
    }

    #[test]
    fn test_var_decl() {
        let program = parse("const x = 42;");
        assert_eq!(program.len(), 1);
        assert!(matches!(
            &program[0],
            Statement::VarDecl { is_const: true, .. }
        ));
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let program = parse("const x = 1 + 2 * 3;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::Binary { op, right, .. }) = &binding.init else {
            panic!("expected binary init");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            **right,
            Expression::Binary { op: BinaryOp::Mul, .. }
        ));
    }

    #[test]
    fn test_binary_does_not_self_chain() {
        // `a + b + c` leaves `+ c` unconsumed, so the statement fails at
        // the terminator.
        let err = parse_err("const x = a + b + c;");
        assert!(err.message.contains("expected"));
    }

    #[test]
    fn test_parenthesized_chain_parses() {
        let program = parse("const x = (a + b) + c;");
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn test_arrow_single_param() {
        let program = parse("const f = x => x;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        assert!(matches!(
            binding.init,
            Some(Expression::Function { .. })
        ));
    }

    #[test]
    fn test_arrow_empty_params() {
        let program = parse("const f = () => 5;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::Function { parameters, .. }) = &binding.init else {
            panic!("expected function");
        };
        assert!(parameters.is_empty());
    }

    #[test]
    fn test_arrow_with_defaults() {
        let program = parse("const f = (x, y = 10) => x + y;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::Function { parameters, body }) = &binding.init else {
            panic!("expected function");
        };
        assert_eq!(parameters.len(), 2);
        assert!(parameters[1].init.is_some());
        assert!(matches!(body, FunctionBody::Expression(_)));
    }

    #[test]
    fn test_arrow_block_body() {
        let program = parse("const f = (x) => { return x; };");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::Function { body, .. }) = &binding.init else {
            panic!("expected function");
        };
        assert!(matches!(body, FunctionBody::Block(_)));
    }

    #[test]
    fn test_destructure_array_with_hole_and_rest() {
        let program = parse("const [a, , ...b] = list;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Pattern::Array(elements) = &binding.pattern else {
            panic!("expected array pattern");
        };
        assert_eq!(elements.len(), 3);
        assert!(elements[1].is_none());
        assert!(elements[2].as_ref().unwrap().is_rest);
    }

    #[test]
    fn test_destructure_rest_must_be_last() {
        let err = parse_err("const [...a, b] = list;");
        assert!(err.message.contains("cannot destructure more values after rest"));
    }

    #[test]
    fn test_destructure_object_with_defaults() {
        let program = parse("const { a, b = 2 } = obj;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Pattern::Object(entries) = &binding.pattern else {
            panic!("expected object pattern");
        };
        assert_eq!(entries.len(), 2);
        assert!(entries[1].default.is_some());
    }

    #[test]
    fn test_access_chain_iterates() {
        let program = parse("a.b.c[0](1)(2);");
        let Statement::Expression(expr) = &program[0] else {
            panic!("expected expression statement");
        };
        // Outermost node is the second call.
        assert!(matches!(expr, Expression::FuncCall { .. }));
    }

    #[test]
    fn test_method_call_vs_field_access() {
        let program = parse("a.b(); a.b;");
        assert!(matches!(
            &program[0],
            Statement::Expression(Expression::MethodCall { .. })
        ));
        assert!(matches!(
            &program[1],
            Statement::Expression(Expression::FieldAccess { .. })
        ));
    }

    #[test]
    fn test_ternary() {
        let program = parse("const x = a ? 1 : 2;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        assert!(matches!(binding.init, Some(Expression::Ternary { .. })));
    }

    #[test]
    fn test_import_forms() {
        let program = parse(
            "import x from './a';\n\
             import * as ns from './b';\n\
             import { a, b as c } from './c';\n\
             import './d';",
        );
        assert_eq!(program.len(), 4);
        let Statement::Import(decl) = &program[0] else {
            panic!("expected import");
        };
        assert_eq!(decl.default_name.as_deref(), Some("x"));
        let Statement::Import(decl) = &program[2] else {
            panic!("expected import");
        };
        let named = decl.named.as_ref().unwrap();
        assert_eq!(named[1].alias.as_deref(), Some("c"));
    }

    #[test]
    fn test_import_must_be_top_level() {
        let err = parse_err("{ import x from './a'; }");
        assert!(err.message.contains("imports must be top level"));
    }

    #[test]
    fn test_export_forms() {
        let program = parse(
            "export default 41;\n\
             export const x = 1;\n\
             export * from './a';\n\
             export { a, default as d } from './b';",
        );
        assert_eq!(program.len(), 4);
        assert!(matches!(
            &program[0],
            Statement::Export(ExportDecl::Default(_))
        ));
        let Statement::Export(ExportDecl::Reexport { named, .. }) = &program[3] else {
            panic!("expected reexport");
        };
        assert_eq!(named[1].name, "default");
        assert_eq!(named[1].alias.as_deref(), Some("d"));
    }

    #[test]
    fn test_expose_is_export() {
        let program = parse("expose default 1;");
        assert!(matches!(
            &program[0],
            Statement::Export(ExportDecl::Default(_))
        ));
    }

    #[test]
    fn test_export_must_be_top_level() {
        let err = parse_err("{ export default 1; }");
        assert!(err.message.contains("exports must be top level"));
    }

    #[test]
    fn test_template_string() {
        let program = parse("const s = `a ${x} b`;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::TemplateString(parts)) = &binding.init else {
            panic!("expected template string");
        };
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[0], Expression::TemplateStringContent(_)));
        assert!(matches!(parts[1], Expression::Load { .. }));
    }

    #[test]
    fn test_html_element() {
        let program = parse("const el = <div id=\"main\" hidden>hello {name}</div>;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::Html {
            tag_name,
            attributes,
            children,
        }) = &binding.init
        else {
            panic!("expected html");
        };
        assert_eq!(tag_name.as_deref(), Some("div"));
        assert_eq!(attributes.len(), 2);
        assert!(matches!(
            attributes[1].value,
            Expression::Literal(Literal::Boolean(true))
        ));
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0], Expression::HtmlText(_)));
        assert!(matches!(children[1], Expression::HtmlExpr(_)));
    }

    #[test]
    fn test_html_self_closing_and_nested() {
        let program = parse("const el = <div><br/><span>x</span></div>;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::Html { children, .. }) = &binding.init else {
            panic!("expected html");
        };
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_html_fragment() {
        let program = parse("const el = <>text</>;");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::Html { tag_name, .. }) = &binding.init else {
            panic!("expected html");
        };
        assert!(tag_name.is_none());
    }

    #[test]
    fn test_html_mismatched_closing_tag() {
        let err = parse_err("const el = <div>x</span>;");
        assert!(err.message.contains("expected identifier 'div'"));
    }

    #[test]
    fn test_object_literal_forms() {
        let program = parse("const o = { a: 1, b, [k]: 2, ...rest, 'c d': 3 };");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::Object(fields)) = &binding.init else {
            panic!("expected object");
        };
        assert_eq!(fields.len(), 5);
        assert!(matches!(
            fields[1],
            ObjectProperty::Regular { value: None, .. }
        ));
        assert!(matches!(fields[2], ObjectProperty::Dynamic { .. }));
        assert!(matches!(fields[3], ObjectProperty::Spread(_)));
    }

    #[test]
    fn test_array_literal_with_spread() {
        let program = parse("const a = [1, ...b, 2];");
        let Statement::VarDecl { binding, .. } = &program[0] else {
            panic!("expected var decl");
        };
        let Some(Expression::Array(elements)) = &binding.init else {
            panic!("expected array");
        };
        assert!(matches!(elements[1], Expression::Spread(_)));
    }

    #[test]
    fn test_try_catch_finally() {
        let program = parse("try { throw 1; } catch (e) { } finally { }");
        assert!(matches!(
            &program[0],
            Statement::TryCatch {
                catch_name: Some(_),
                finally_block: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_error_carries_line_and_column() {
        let err = parse_err("const x = 1;\nconst = 2;");
        let pos = err.position.clone().expect("position");
        assert_eq!(pos.line, 2);
        assert!(err.to_string().starts_with("Error at line 2"));
    }

    #[test]
    fn test_new_and_typeof() {
        let program = parse("const a = new Foo(1); const t = typeof a;");
        assert!(matches!(
            &program[0],
            Statement::VarDecl { binding, .. }
                if matches!(binding.init, Some(Expression::New { .. }))
        ));
        assert!(matches!(
            &program[1],
            Statement::VarDecl { binding, .. }
                if matches!(binding.init, Some(Expression::Typeof(_)))
        ));
    }

    #[test]
    fn test_postfix_and_prefix_inc() {
        let program = parse("i++; ++i;");
        assert!(matches!(
            &program[0],
            Statement::Expression(Expression::IncOrDec {
                is_prefix: false,
                ..
            })
        ));
        assert!(matches!(
            &program[1],
            Statement::Expression(Expression::IncOrDec {
                is_prefix: true,
                ..
            })
        ));
    }
}
