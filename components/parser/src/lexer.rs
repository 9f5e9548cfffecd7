//! Lexer - tokenizes eco source code into tokens.
//!
//! The scanner is character-driven with a single cached lookahead token.
//! Multi-character symbols and operators are resolved by longest match over
//! the combined symbol/operator table. Raw text regions (template string
//! contents, HTML text) are captured through [`Lexer::get_until`], which
//! bypasses tokenization entirely.

use core_types::{EcoError, ErrorKind, SourcePosition};

/// Keywords of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// const keyword
    Const,
    /// let keyword
    Let,
    /// return keyword
    Return,
    /// new keyword
    New,
    /// if keyword
    If,
    /// else keyword
    Else,
    /// while keyword
    While,
    /// try keyword
    Try,
    /// catch keyword
    Catch,
    /// finally keyword
    Finally,
    /// throw keyword
    Throw,
    /// typeof keyword
    Typeof,
    /// export keyword
    Export,
    /// default keyword
    Default,
    /// expose keyword (synonym of export)
    Expose,
    /// import keyword
    Import,
    /// from keyword
    From,
    /// as keyword
    As,
}

/// Structural symbols, including the HTML and template-string delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// Arrow `=>`
    Arrow,
    /// Spread / rest `...`
    Ellipsis,
    /// Backtick opening or closing a template string
    Backtick,
    /// `${` opening a template interpolation
    DollarBrace,
    /// `</` opening a closing HTML tag
    LtSlash,
    /// `/>` closing a self-closing HTML tag
    SlashGt,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
}

/// Operators, resolved by longest match alongside the symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    StarAssign,
    /// `/=`
    SlashAssign,
    /// `++`
    Increment,
    /// `--`
    Decrement,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `===`
    StrictEq,
    /// `==`
    Eq,
    /// `=`
    Assign,
    /// `!==`
    StrictNotEq,
    /// `!=`
    NotEq,
    /// `>=`
    GtEq,
    /// `<=`
    LtEq,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `!`
    Not,
}

/// The kind of a token, carrying any literal payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Structural symbol
    Symbol(Symbol),
    /// Keyword
    Keyword(Keyword),
    /// `true` or `false`
    Boolean(bool),
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// Identifier
    Identifier(String),
    /// Decimal number literal
    Number(f64),
    /// String literal (delimiters stripped, escapes uninterpreted) or a
    /// synthetic raw-text token produced by [`Lexer::get_until`]
    Str(String),
    /// Operator
    Operator(Operator),
}

impl TokenKind {
    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Symbol(s) => format!("'{}'", symbol_lexeme(*s)),
            TokenKind::Keyword(k) => format!("'{}'", keyword_lexeme(*k)),
            TokenKind::Boolean(b) => b.to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::Undefined => "undefined".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Str(_) => "string".to_string(),
            TokenKind::Operator(op) => format!("'{}'", operator_lexeme(*op)),
        }
    }
}

/// A token with its kind and start offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Kind and literal payload
    pub kind: TokenKind,
    /// Zero-based character offset of the token's first character
    pub position: usize,
}

const SYMBOLS: &[(&str, Symbol)] = &[
    ("=>", Symbol::Arrow),
    ("...", Symbol::Ellipsis),
    ("`", Symbol::Backtick),
    ("${", Symbol::DollarBrace),
    ("</", Symbol::LtSlash),
    ("/>", Symbol::SlashGt),
    ("<", Symbol::Lt),
    (">", Symbol::Gt),
    ("(", Symbol::LParen),
    (")", Symbol::RParen),
    ("[", Symbol::LBracket),
    ("]", Symbol::RBracket),
    ("{", Symbol::LBrace),
    ("}", Symbol::RBrace),
    (",", Symbol::Comma),
    (".", Symbol::Dot),
    ("?", Symbol::Question),
    (":", Symbol::Colon),
    (";", Symbol::Semicolon),
];

const OPERATORS: &[(&str, Operator)] = &[
    ("+=", Operator::PlusAssign),
    ("-=", Operator::MinusAssign),
    ("*=", Operator::StarAssign),
    ("/=", Operator::SlashAssign),
    ("++", Operator::Increment),
    ("--", Operator::Decrement),
    ("&&", Operator::AndAnd),
    ("||", Operator::OrOr),
    ("===", Operator::StrictEq),
    ("==", Operator::Eq),
    ("=", Operator::Assign),
    ("!==", Operator::StrictNotEq),
    ("!=", Operator::NotEq),
    (">=", Operator::GtEq),
    ("<=", Operator::LtEq),
    ("+", Operator::Plus),
    ("-", Operator::Minus),
    ("*", Operator::Star),
    ("/", Operator::Slash),
    ("!", Operator::Not),
];

fn symbol_lexeme(symbol: Symbol) -> &'static str {
    SYMBOLS
        .iter()
        .find(|(_, s)| *s == symbol)
        .map(|(lexeme, _)| *lexeme)
        .unwrap_or("?")
}

/// Source lexeme of an operator.
pub fn operator_lexeme(op: Operator) -> &'static str {
    OPERATORS
        .iter()
        .find(|(_, o)| *o == op)
        .map(|(lexeme, _)| *lexeme)
        .unwrap_or("?")
}

/// Source lexeme of a keyword.
pub fn keyword_lexeme(keyword: Keyword) -> &'static str {
    match keyword {
        Keyword::Const => "const",
        Keyword::Let => "let",
        Keyword::Return => "return",
        Keyword::New => "new",
        Keyword::If => "if",
        Keyword::Else => "else",
        Keyword::While => "while",
        Keyword::Try => "try",
        Keyword::Catch => "catch",
        Keyword::Finally => "finally",
        Keyword::Throw => "throw",
        Keyword::Typeof => "typeof",
        Keyword::Export => "export",
        Keyword::Default => "default",
        Keyword::Expose => "expose",
        Keyword::Import => "import",
        Keyword::From => "from",
        Keyword::As => "as",
    }
}

fn keyword_from_str(word: &str) -> Option<Keyword> {
    let keyword = match word {
        "const" => Keyword::Const,
        "let" => Keyword::Let,
        "return" => Keyword::Return,
        "new" => Keyword::New,
        "if" => Keyword::If,
        "else" => Keyword::Else,
        "while" => Keyword::While,
        "try" => Keyword::Try,
        "catch" => Keyword::Catch,
        "finally" => Keyword::Finally,
        "throw" => Keyword::Throw,
        "typeof" => Keyword::Typeof,
        "export" => Keyword::Export,
        "default" => Keyword::Default,
        "expose" => Keyword::Expose,
        "import" => Keyword::Import,
        "from" => Keyword::From,
        "as" => Keyword::As,
        _ => return None,
    };
    Some(keyword)
}

/// Lexer for eco source code.
///
/// Holds at most one token of lookahead between [`Lexer::peek`] and the next
/// consume. [`Lexer::revert`] always clears the cache, so parser
/// backtracking restarts from a clean state.
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    current_token: Option<Token>,
    last_position: usize,
}

impl Lexer {
    /// Create a new lexer for the given source code.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            current_token: None,
            last_position: 0,
        }
    }

    /// Peek at the next non-comment token without consuming it.
    ///
    /// Returns `None` at end of input.
    pub fn peek(&mut self) -> Result<Option<&Token>, EcoError> {
        if self.current_token.is_none() {
            self.current_token = self.scan_token()?;
        }
        Ok(self.current_token.as_ref())
    }

    /// Return and advance past the next token, failing at end of input.
    pub fn consume(&mut self) -> Result<Token, EcoError> {
        let token = match self.current_token.take() {
            Some(token) => token,
            None => self
                .scan_token()?
                .ok_or_else(|| self.error_at(self.position, "unexpected end of input"))?,
        };
        self.last_position = token.position;
        Ok(token)
    }

    /// Check whether the next token is the given symbol.
    pub fn peek_symbol(&mut self, symbol: Symbol) -> Result<bool, EcoError> {
        Ok(matches!(
            self.peek()?,
            Some(Token { kind: TokenKind::Symbol(s), .. }) if *s == symbol
        ))
    }

    /// Check whether the next token is the given operator.
    pub fn peek_operator(&mut self, op: Operator) -> Result<bool, EcoError> {
        Ok(matches!(
            self.peek()?,
            Some(Token { kind: TokenKind::Operator(o), .. }) if *o == op
        ))
    }

    /// Check whether the next token is the given keyword.
    pub fn peek_keyword(&mut self, keyword: Keyword) -> Result<bool, EcoError> {
        Ok(matches!(
            self.peek()?,
            Some(Token { kind: TokenKind::Keyword(k), .. }) if *k == keyword
        ))
    }

    /// Consume the next token, failing unless it is the given symbol.
    pub fn consume_symbol(&mut self, symbol: Symbol) -> Result<Token, EcoError> {
        let token = self.consume()?;
        match token.kind {
            TokenKind::Symbol(s) if s == symbol => Ok(token),
            ref other => Err(self.error_at(
                token.position,
                format!("expected '{}' got {}", symbol_lexeme(symbol), other.describe()),
            )),
        }
    }

    /// Consume the next token, failing unless it is the given operator.
    pub fn consume_operator(&mut self, op: Operator) -> Result<Token, EcoError> {
        let token = self.consume()?;
        match token.kind {
            TokenKind::Operator(o) if o == op => Ok(token),
            ref other => Err(self.error_at(
                token.position,
                format!("expected '{}' got {}", operator_lexeme(op), other.describe()),
            )),
        }
    }

    /// Consume the next token, failing unless it is the given keyword.
    pub fn consume_keyword(&mut self, keyword: Keyword) -> Result<Token, EcoError> {
        let token = self.consume()?;
        match token.kind {
            TokenKind::Keyword(k) if k == keyword => Ok(token),
            ref other => Err(self.error_at(
                token.position,
                format!(
                    "expected '{}' got {}",
                    keyword_lexeme(keyword),
                    other.describe()
                ),
            )),
        }
    }

    /// Consume the next token, failing unless it is an identifier, and
    /// return its name.
    pub fn expect_identifier(&mut self) -> Result<String, EcoError> {
        let token = self.consume()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok(name),
            ref other => Err(self.error_at(
                token.position,
                format!("expected identifier got {}", other.describe()),
            )),
        }
    }

    /// Consume the next token, failing unless it is the named identifier.
    pub fn consume_identifier(&mut self, name: &str) -> Result<Token, EcoError> {
        let token = self.consume()?;
        match token.kind {
            TokenKind::Identifier(ref ident) if ident == name => Ok(token),
            ref other => Err(self.error_at(
                token.position,
                format!("expected identifier '{}' got {}", name, other.describe()),
            )),
        }
    }

    /// Capture raw characters up to (but not including) the first occurrence
    /// of any terminator, returning them as a synthetic string token.
    ///
    /// The terminator is left unconsumed. Fails with *unexpected end of
    /// string* when no terminator occurs before end of input. Any cached
    /// lookahead is rolled back first so the capture starts at the position
    /// the parser last observed.
    pub fn get_until(&mut self, terminators: &[&str]) -> Result<Token, EcoError> {
        if let Some(token) = self.current_token.take() {
            self.position = token.position;
        }
        let start = self.position;
        let mut index = start;
        while index < self.chars.len() {
            if terminators.iter().any(|t| self.matches_at(index, t)) {
                let text: String = self.chars[start..index].iter().collect();
                self.position = index;
                self.last_position = start;
                return Ok(Token {
                    kind: TokenKind::Str(text),
                    position: start,
                });
            }
            index += 1;
        }
        Err(self.error_at(start, "unexpected end of string"))
    }

    /// Rewind the stream to a previous position, invalidating any cached
    /// lookahead.
    pub fn revert(&mut self, position: usize) {
        self.position = position;
        self.current_token = None;
    }

    /// Position of the next token to be returned.
    pub fn get_position(&self) -> usize {
        match &self.current_token {
            Some(token) => token.position,
            None => self.position,
        }
    }

    /// Start position of the most recently consumed token.
    pub fn get_last_position(&self) -> usize {
        self.last_position
    }

    /// Compute the 1-based line and column of a character offset by scanning
    /// the original input.
    pub fn get_line_and_column(&self, position: usize) -> SourcePosition {
        let clamped = position.min(self.chars.len());
        let mut line = 1u32;
        let mut column = 1u32;
        for &ch in &self.chars[..clamped] {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        SourcePosition {
            line,
            column,
            offset: position,
        }
    }

    /// Build a positioned syntax error.
    pub fn error_at(&self, position: usize, message: impl Into<String>) -> EcoError {
        EcoError {
            kind: ErrorKind::SyntaxError,
            message: message.into(),
            position: Some(self.get_line_and_column(position)),
        }
    }

    fn matches_at(&self, index: usize, text: &str) -> bool {
        let mut pos = index;
        for expected in text.chars() {
            if pos >= self.chars.len() || self.chars[pos] != expected {
                return false;
            }
            pos += 1;
        }
        true
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek_char(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.position]
        }
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.position];
        self.position += 1;
        ch
    }

    fn scan_token(&mut self) -> Result<Option<Token>, EcoError> {
        self.skip_whitespace_and_comments()?;

        if self.is_at_end() {
            return Ok(None);
        }

        let start = self.position;
        let ch = self.peek_char();

        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(Some(self.scan_identifier(start)));
        }
        if ch.is_ascii_digit() {
            return Ok(Some(self.scan_number(start)));
        }
        if ch == '\'' || ch == '"' {
            return self.scan_string(start).map(Some);
        }
        self.scan_symbol_or_operator(start).map(Some)
    }

    fn scan_identifier(&mut self, start: usize) -> Token {
        let mut word = String::new();
        while !self.is_at_end() {
            let ch = self.peek_char();
            if ch.is_ascii_alphanumeric() || ch == '_' {
                word.push(self.advance());
            } else {
                break;
            }
        }

        let kind = match word.as_str() {
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            _ => match keyword_from_str(&word) {
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier(word),
            },
        };
        Token {
            kind,
            position: start,
        }
    }

    fn scan_number(&mut self, start: usize) -> Token {
        let mut digits = String::new();
        while !self.is_at_end() && self.peek_char().is_ascii_digit() {
            digits.push(self.advance());
        }
        // A dot only belongs to the number when digits follow; `1.foo`
        // stays a field access.
        if self.peek_char() == '.'
            && self
                .peek_char_at(1)
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
        {
            digits.push(self.advance());
            while !self.is_at_end() && self.peek_char().is_ascii_digit() {
                digits.push(self.advance());
            }
        }
        let value = digits.parse::<f64>().unwrap_or(f64::NAN);
        Token {
            kind: TokenKind::Number(value),
            position: start,
        }
    }

    fn scan_string(&mut self, start: usize) -> Result<Token, EcoError> {
        let quote = self.advance();
        let mut value = String::new();
        while !self.is_at_end() && self.peek_char() != quote {
            // Escape sequences are passed through uninterpreted.
            value.push(self.advance());
        }
        if self.is_at_end() {
            return Err(self.error_at(start, "unexpected end of string"));
        }
        self.advance();
        Ok(Token {
            kind: TokenKind::Str(value),
            position: start,
        })
    }

    /// Longest-match resolution over the combined symbol and operator table.
    ///
    /// The prefix grows while any candidate still begins with it; the final
    /// prefix must then match a candidate exactly. There is no backing off
    /// to a shorter match, so `..` is an error rather than two dots.
    fn scan_symbol_or_operator(&mut self, start: usize) -> Result<Token, EcoError> {
        let mut length = 0usize;
        loop {
            let end = start + length + 1;
            if end > self.chars.len() {
                break;
            }
            let prefix: String = self.chars[start..end].iter().collect();
            let extendable = SYMBOLS.iter().any(|(lexeme, _)| lexeme.starts_with(&prefix))
                || OPERATORS.iter().any(|(lexeme, _)| lexeme.starts_with(&prefix));
            if !extendable {
                break;
            }
            length += 1;
        }

        if length == 0 {
            let ch = self.peek_char();
            return Err(self.error_at(start, format!("invalid character '{}'", ch)));
        }

        let lexeme: String = self.chars[start..start + length].iter().collect();
        if let Some((_, symbol)) = SYMBOLS.iter().find(|(l, _)| *l == lexeme) {
            self.position = start + length;
            return Ok(Token {
                kind: TokenKind::Symbol(*symbol),
                position: start,
            });
        }
        if let Some((_, op)) = OPERATORS.iter().find(|(l, _)| *l == lexeme) {
            self.position = start + length;
            return Ok(Token {
                kind: TokenKind::Operator(*op),
                position: start,
            });
        }
        Err(self.error_at(start, format!("unrecognised token '{}'", lexeme)))
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), EcoError> {
        loop {
            if self.is_at_end() {
                return Ok(());
            }
            match self.peek_char() {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_char_at(1) == Some('/') => {
                    while !self.is_at_end() && self.peek_char() != '\n' {
                        self.advance();
                    }
                }
                '/' if self.peek_char_at(1) == Some('*') => {
                    let comment_start = self.position;
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while !self.is_at_end() {
                        if self.peek_char() == '*' && self.peek_char_at(1) == Some('/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        return Err(self.error_at(comment_start, "unclosed comment"));
                    }
                }
                _ => return Ok(()),
            }
        }
    }
}
