//! Argument vector construction for a script file.
//!
//! A script whose first two characters are `#!` names its own interpreter;
//! everything else runs through the default shell with `-xe` (echo each
//! command, stop at the first failing one).

/// Marker that introduces an interpreter directive.
pub const INTERPRETER_DIRECTIVE: &str = "#!";

/// Flags passed to the default shell.
pub const DEFAULT_SHELL_FLAGS: &str = "-xe";

/// Reasons a `#!` line cannot be turned into an argument vector.
#[derive(Debug, thiserror::Error)]
pub enum CommandLineError {
    #[error("Invalid interpreter directive '{line}': {source}")]
    Tokenize {
        line: String,
        #[source]
        source: shell_words::ParseError,
    },

    #[error("Interpreter directive '{0}' does not name an interpreter")]
    MissingInterpreter(String),
}

/// Build the argument vector that executes `script_path`.
///
/// `script` is the script body written to `script_path`; only its first line
/// is inspected. `shell` is the default shell used when there is no
/// interpreter directive.
pub fn build_command_line(
    script: &str,
    script_path: &str,
    shell: &str,
) -> Result<Vec<String>, CommandLineError> {
    if !script.starts_with(INTERPRETER_DIRECTIVE) {
        return Ok(vec![
            shell.to_string(),
            DEFAULT_SHELL_FLAGS.to_string(),
            script_path.to_string(),
        ]);
    }

    let end = script.find('\n').unwrap_or(script.len());
    let line = script[..end].trim();

    let mut args = shell_words::split(&escape_word_hashes(line)).map_err(|source| {
        CommandLineError::Tokenize {
            line: line.to_string(),
            source,
        }
    })?;

    // The marker is part of the first word: `#! /bin/bash` leaves it empty.
    let interpreter = args
        .first()
        .and_then(|first| first.strip_prefix(INTERPRETER_DIRECTIVE))
        .filter(|interpreter| !interpreter.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CommandLineError::MissingInterpreter(line.to_string()))?;
    args[0] = interpreter;

    args.push(script_path.to_string());
    Ok(args)
}

/// Backslash-escape every unquoted `#` that starts a word.
///
/// The tokenizer reads such a `#` as the start of a comment, while a
/// directive line passes those words to the interpreter as they are.
fn escape_word_hashes(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut after_backslash = false;
    let mut word_start = true;

    for c in line.chars() {
        if after_backslash {
            after_backslash = false;
            word_start = false;
            escaped.push(c);
            continue;
        }
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else if c == '\\' && q == '"' {
                    after_backslash = true;
                }
            }
            None => match c {
                '\\' => after_backslash = true,
                '\'' | '"' => quote = Some(c),
                '#' if word_start => escaped.push('\\'),
                _ => {}
            },
        }
        word_start = quote.is_none() && !after_backslash && c.is_whitespace();
        escaped.push(c);
    }

    escaped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
