//! Runtime orchestration for the CLI.
//!
//! The Runtime struct wires the components together: parser for source,
//! interpreter for execution, bundler + filesystem resolver for `--bundle`.

use crate::error::CliResult;
use crate::globals::{self, FsResolver};
use bundler::Bundler;
use core_types::Value;
use parser::Parser;
use std::path::Path;

/// Orchestrates parsing, evaluation, and bundling.
pub struct Runtime {
    print_ast: bool,
    print_tokens: bool,
    interpreter: interpreter::Runtime,
}

impl Runtime {
    /// Create a runtime with the host globals installed.
    pub fn new() -> Self {
        let mut interpreter = interpreter::Runtime::new();
        globals::install(&mut interpreter);
        Self {
            print_ast: false,
            print_tokens: false,
            interpreter,
        }
    }

    /// Enable AST printing.
    pub fn with_print_ast(mut self, enabled: bool) -> Self {
        self.print_ast = enabled;
        self
    }

    /// Enable token stream printing.
    pub fn with_print_tokens(mut self, enabled: bool) -> Self {
        self.print_tokens = enabled;
        self
    }

    /// Execute a script file.
    ///
    /// # Errors
    /// Returns `CliError` when the file cannot be read or execution fails.
    pub fn execute_file(&mut self, path: &str) -> CliResult<Value> {
        let source = std::fs::read_to_string(path)?;
        self.execute_string(&source)
    }

    /// Execute a source string and return its result value.
    ///
    /// # Example
    /// ```
    /// use eco_cli::Runtime;
    /// use core_types::Value;
    ///
    /// let mut runtime = Runtime::new();
    /// let result = runtime.execute_string("return 1 + 2;").unwrap();
    /// assert_eq!(result, Value::Number(3.0));
    /// ```
    pub fn execute_string(&mut self, source: &str) -> CliResult<Value> {
        if self.print_tokens {
            let mut lexer = parser::Lexer::new(source);
            while let Some(token) = lexer.peek()? {
                println!("{:>5}  {:?}", token.position, token.kind);
                lexer.consume()?;
            }
        }

        let program = Parser::new(source).parse()?;
        if self.print_ast {
            println!("{:#?}", program);
        }

        Ok(self.interpreter.run_program(&program)?)
    }

    /// Bundle the module graph rooted at the given entry file into a single
    /// script.
    pub fn bundle_file(&mut self, entry: &str) -> CliResult<String> {
        let path = Path::new(entry);
        let current_dir = path
            .parent()
            .map(|parent| parent.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.to_string());

        let mut resolver = FsResolver::new();
        let mut bundler = Bundler::new(&mut resolver);
        Ok(bundler.bundle(&current_dir, &file_name)?)
    }

    /// Start the REPL.
    pub fn repl(&mut self) -> CliResult<()> {
        crate::repl::run_repl(self)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
