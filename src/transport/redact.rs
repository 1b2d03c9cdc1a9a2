//! Payload redaction for request logging
//!
//! Embedding literals make request logs unreadable, so long numeric arrays
//! inside `command` are shortened to their first two values plus the
//! dimension count, and the command itself is capped.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

const MAX_COMMAND_CHARS: usize = 500;
const MAX_ARRAY_CHARS: usize = 50;

fn numeric_array() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\[[-0-9.eE,\s]+\]").ok())
        .as_ref()
}

/// Copy of `payload` that is safe to log
pub fn redact_payload(payload: &Value) -> Value {
    let mut redacted = payload.clone();
    if let Some(Value::String(command)) = redacted.get_mut("command") {
        *command = redact_command(command);
    }
    redacted
}

fn redact_command(command: &str) -> String {
    let Some(pattern) = numeric_array() else {
        return cap(command.to_string());
    };
    let shortened = pattern.replace_all(command, |caps: &Captures<'_>| {
        let literal = &caps[0];
        if literal.len() <= MAX_ARRAY_CHARS {
            return literal.to_string();
        }
        let values: Vec<&str> = literal
            .trim_matches(|c| c == '[' || c == ']')
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        match values.as_slice() {
            [first, second, ..] => format!("[{}, {}, ...] (dim:{})", first, second, values.len()),
            _ => format!("[...] (dim:{})", values.len()),
        }
    });

    cap(shortened.into_owned())
}

fn cap(command: String) -> String {
    if command.chars().count() > MAX_COMMAND_CHARS {
        let cut: String = command.chars().take(MAX_COMMAND_CHARS).collect();
        format!("{}...", cut)
    } else {
        command
    }
}
