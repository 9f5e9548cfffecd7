//! Eco CLI Library
//!
//! Provides the Runtime orchestration struct and supporting modules for the
//! eco command-line shell.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod globals;
pub mod repl;
pub mod runtime;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use globals::FsResolver;
pub use runtime::Runtime;
