//! REPL (Read-Eval-Print Loop) implementation.

use crate::error::{CliError, CliResult};
use crate::runtime::Runtime;
use core_types::Value;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the interactive REPL.
///
/// # Arguments
/// * `runtime` - The Runtime instance to use for execution
pub fn run_repl(runtime: &mut Runtime) -> CliResult<()> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| CliError::ReplError(format!("Failed to initialize editor: {}", e)))?;

    println!("eco v0.1.0");
    println!("Type eco code or 'exit' to quit.");
    println!();

    let mut line_buffer = String::new();
    let mut in_multiline = false;

    loop {
        let prompt = if in_multiline { "... " } else { "> " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if !in_multiline && (trimmed == "exit" || trimmed == ".exit" || trimmed == "quit") {
                    println!("Goodbye!");
                    break;
                }

                if !in_multiline && trimmed.starts_with('.') {
                    handle_repl_command(trimmed);
                    continue;
                }

                if in_multiline {
                    line_buffer.push('\n');
                }
                line_buffer.push_str(&line);

                if is_input_complete(&line_buffer) {
                    in_multiline = false;
                    let _ = editor.add_history_entry(&line_buffer);

                    match runtime.execute_string(&line_buffer) {
                        Ok(value) => {
                            println!("{}", format_value(&value));
                        }
                        Err(CliError::EcoError(e)) => {
                            // An unexpected end means the input continues on
                            // the next line.
                            if e.message.contains("unexpected end of input") {
                                in_multiline = true;
                                continue;
                            }
                            eprintln!("{}", e);
                        }
                        Err(e) => {
                            eprintln!("Error: {}", e);
                        }
                    }

                    line_buffer.clear();
                } else {
                    in_multiline = true;
                }
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    println!("^C");
                    line_buffer.clear();
                    in_multiline = false;
                } else {
                    println!("Press Ctrl-D or type 'exit' to quit");
                }
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                return Err(CliError::ReplError(format!("Readline error: {}", err)));
            }
        }
    }

    Ok(())
}

/// Handle special REPL commands.
fn handle_repl_command(command: &str) {
    match command {
        ".help" => {
            println!("REPL Commands:");
            println!("  .help     - Show this help message");
            println!("  .clear    - Clear the screen");
            println!("  .exit     - Exit the REPL");
            println!("  exit      - Exit the REPL");
            println!("  quit      - Exit the REPL");
        }
        ".clear" => {
            print!("\x1B[2J\x1B[1;1H");
        }
        _ => {
            println!("Unknown command: {}", command);
            println!("Type .help for available commands");
        }
    }
}

/// Check if the input appears to be complete.
///
/// A simple heuristic that checks for balanced braces, brackets, and
/// parentheses outside of strings.
fn is_input_complete(input: &str) -> bool {
    let mut brace_count = 0;
    let mut bracket_count = 0;
    let mut paren_count = 0;
    let mut in_string = false;
    let mut string_char = ' ';

    for c in input.chars() {
        if !in_string {
            match c {
                '"' | '\'' | '`' => {
                    in_string = true;
                    string_char = c;
                }
                '{' => brace_count += 1,
                '}' => brace_count -= 1,
                '[' => bracket_count += 1,
                ']' => bracket_count -= 1,
                '(' => paren_count += 1,
                ')' => paren_count -= 1,
                _ => {}
            }
        } else if c == string_char {
            in_string = false;
        }
    }

    brace_count == 0 && bracket_count == 0 && paren_count == 0 && !in_string
}

/// Format a value for display.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Object(fields) => {
            let fields = fields.borrow();
            let mut entries: Vec<String> = fields
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value))
                .collect();
            entries.sort();
            format!("{{ {} }}", entries.join(", "))
        }
        Value::Array(items) => {
            let items = items.borrow();
            let rendered: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_input_complete_simple() {
        assert!(is_input_complete("const x = 42;"));
        assert!(is_input_complete("print('hello');"));
    }

    #[test]
    fn test_is_input_complete_incomplete_brace() {
        assert!(!is_input_complete("const f = () => {"));
        assert!(!is_input_complete("if (true) {"));
    }

    #[test]
    fn test_is_input_complete_with_blocks() {
        assert!(is_input_complete("const f = () => { return 42; };"));
        assert!(is_input_complete("if (true) { print('yes'); }"));
    }

    #[test]
    fn test_is_input_complete_with_strings() {
        assert!(is_input_complete(r#"const s = "hello {"; "#));
        assert!(!is_input_complete(r#"const s = "unclosed"#));
    }

    #[test]
    fn test_format_value_basics() {
        assert_eq!(format_value(&Value::Undefined), "undefined");
        assert_eq!(format_value(&Value::Number(42.0)), "42");
        assert_eq!(format_value(&Value::String("x".to_string())), "'x'");
    }

    #[test]
    fn test_format_value_array() {
        let value = Value::array(vec![Value::Number(1.0), Value::String("a".to_string())]);
        assert_eq!(format_value(&value), "[1, 'a']");
    }
}
