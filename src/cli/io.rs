//! JSON I/O handling for CLI
//!
//! - Input: one JSON document, or one statement per line, on stdin
//! - Output: one JSON object on stdout
//! - UTF-8 only

use std::io::{self, BufRead, Read, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read one JSON document from stdin
pub fn read_request() -> CliResult<Value> {
    parse_request(io::stdin().lock())
}

/// Read non-empty lines from stdin
pub fn read_statements() -> CliResult<Vec<String>> {
    parse_statements(io::stdin().lock())
}

/// Parse one JSON document, which may span several lines
pub fn parse_request<R: Read>(mut reader: R) -> CliResult<Value> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    if input.trim().is_empty() {
        return Err(CliError::invalid_input("Empty input"));
    }

    let value: Value = serde_json::from_str(&input)?;
    Ok(value)
}

/// Collect trimmed, non-empty lines
pub fn parse_statements<R: BufRead>(reader: R) -> CliResult<Vec<String>> {
    let mut statements = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            statements.push(line.to_string());
        }
    }
    if statements.is_empty() {
        return Err(CliError::invalid_input("No statements on input"));
    }
    Ok(statements)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(&response)
}

fn write_line(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
