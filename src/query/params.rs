//! # Client-side parameter binding
//!
//! The pattern-matching language has no server-side named parameters, so
//! `$name` references are replaced with literals before dispatch. References
//! inside quoted literals are left alone.
//!
//! Values that cannot be written as a literal (sequences, maps, and strings
//! that themselves contain `$`) are not inlined: the reference stays in the
//! text and the value is handed back to be sent as a regular parameter.

use serde_json::{Map, Value};

use crate::error::{ArcadeError, ArcadeResult};

use super::literal::quote;

/// Outcome of [`inline_parameters`]
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    /// Command text with inlined literals
    pub command: String,
    /// Parameters that still have to travel with the request
    pub deferred: Map<String, Value>,
}

impl BoundQuery {
    /// Deferred parameters as a payload member, `None` when nothing is left
    pub fn params(&self) -> Option<Value> {
        if self.deferred.is_empty() {
            None
        } else {
            Some(Value::Object(self.deferred.clone()))
        }
    }
}

/// Replace `$name` references in `command` with literals from `params`
pub fn inline_parameters(command: &str, params: &Value) -> ArcadeResult<BoundQuery> {
    let params = params.as_object().ok_or_else(|| {
        ArcadeError::validation("Parameters for pattern queries must be a JSON object")
    })?;

    let chars: Vec<char> = command.chars().collect();
    let mut out = String::with_capacity(command.len());
    let mut deferred = Map::new();
    let mut quote_char: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(open) = quote_char {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == open {
                quote_char = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote_char = Some(c);
                out.push(c);
                i += 1;
            }
            '$' if chars.get(i + 1).map_or(false, |n| is_ident_start(*n)) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let value = params.get(&name).ok_or_else(|| {
                    ArcadeError::validation(format!(
                        "Variable {} not found in the parameters",
                        name
                    ))
                })?;

                match render(value) {
                    Some(literal) => out.push_str(&literal),
                    None => {
                        out.push('$');
                        out.push_str(&name);
                        deferred.insert(name, value.clone());
                    }
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(BoundQuery {
        command: out,
        deferred,
    })
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.contains('$') => None,
        Value::String(s) => Some(quote(s)),
        Value::Array(_) | Value::Object(_) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
