//! Command-line argument definitions.

use clap::Parser;

/// Command-line arguments for the eco shell.
#[derive(Parser, Debug)]
#[command(name = "eco", version, about = "eco language toolchain")]
pub struct Cli {
    /// Script file to execute
    #[arg(short, long)]
    pub file: Option<String>,

    /// Evaluate inline source code
    #[arg(short, long)]
    pub eval: Option<String>,

    /// Start the interactive REPL
    #[arg(short, long)]
    pub repl: bool,

    /// Bundle the module graph rooted at the given entry file
    #[arg(short, long)]
    pub bundle: Option<String>,

    /// Write the bundle to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<String>,

    /// Print the parsed AST before execution
    #[arg(long)]
    pub print_ast: bool,

    /// Print the token stream before execution
    #[arg(long)]
    pub print_tokens: bool,
}
