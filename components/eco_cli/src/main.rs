//! Eco CLI
//!
//! Entry point for the eco toolchain. Parses CLI arguments and delegates to
//! the Runtime for execution and bundling.

use clap::Parser as ClapParser;
use eco_cli::{Cli, Runtime};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut runtime = Runtime::new()
        .with_print_ast(cli.print_ast)
        .with_print_tokens(cli.print_tokens);

    if let Some(entry) = cli.bundle {
        match runtime.bundle_file(&entry) {
            Ok(script) => match cli.out {
                Some(path) => std::fs::write(&path, script)?,
                None => print!("{}", script),
            },
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    } else if let Some(file) = cli.file {
        match runtime.execute_file(&file) {
            Ok(result) => {
                if !matches!(result, core_types::Value::Undefined) {
                    println!("{}", result);
                }
            }
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    } else if let Some(code) = cli.eval {
        match runtime.execute_string(&code) {
            Ok(result) => {
                if !matches!(result, core_types::Value::Undefined) {
                    println!("{}", result);
                }
            }
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    } else if cli.repl {
        runtime.repl()?;
    } else {
        println!("eco v0.1.0");
        println!();
        println!("Usage:");
        println!("  eco --file <FILE>       Execute a script");
        println!("  eco --eval <CODE>       Evaluate inline code");
        println!("  eco --repl              Start interactive REPL");
        println!("  eco --bundle <ENTRY>    Bundle a module graph");
        println!();
        println!("Run 'eco --help' for more options.");
    }

    Ok(())
}
