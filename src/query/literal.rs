//! Literal encoding for statements built on the client

use serde_json::Value;

/// Escape backslashes and single quotes for a single-quoted literal
pub fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Single-quoted, escaped string literal
pub fn quote(raw: &str) -> String {
    format!("'{}'", escape(raw))
}

/// Render a JSON value as a statement literal.
///
/// Strings are quoted; arrays and objects are serialized to JSON text and
/// then quoted; numbers, booleans and null are written bare.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Array(_) | Value::Object(_) => quote(&value.to_string()),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
    }
}

/// Whether `name` can be spliced into a statement as a bare identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
