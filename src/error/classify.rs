//! Error payload classification
//!
//! The server reports failures as a loose JSON object with optional `error`,
//! `detail` and `exception` members and no stable error code. The rules below
//! run top to bottom and the first match wins, so the more specific rules
//! come first. A missing member is never an error.

use serde_json::Value;

use super::{ArcadeError, ErrorKind};

/// Exception name the server uses for rejected credentials
pub const SECURITY_EXCEPTION: &str = "com.arcadedb.server.security.ServerSecurityException";

/// Simple class name of the security exception, whatever its package
const SECURITY_EXCEPTION_NAME: &str = "ServerSecurityException";

/// Fragment of the exception name the SQL parser reports
pub const PARSING_EXCEPTION_MARKER: &str = "CommandSQLParsingException";

const UNKNOWN_MESSAGE: &str = "Unknown error";

/// Turn a raw server error payload into a typed error.
///
/// `query` is attached to parsing failures so the offending text travels with
/// the error.
pub fn classify(payload: &Value, query: Option<&str>) -> ArcadeError {
    let message = match payload {
        Value::String(s) => s.clone(),
        _ => member(payload, "error").unwrap_or_else(|| UNKNOWN_MESSAGE.to_string()),
    };
    let detail = member(payload, "detail").unwrap_or_default();
    let exception = member(payload, "exception").unwrap_or_default();
    let lowered = message.to_lowercase();

    let (kind, idempotent) = if is_security_exception(&exception) {
        (ErrorKind::Authentication, false)
    } else if exception.contains(PARSING_EXCEPTION_MARKER) || lowered.contains("parsing") {
        (ErrorKind::QueryParsing, false)
    } else if lowered.contains("transaction") || lowered.contains("idempotent") {
        (ErrorKind::Transaction, lowered.contains("idempotent"))
    } else if lowered.contains("schema")
        || (lowered.contains("type") && lowered.contains("not found"))
    {
        (ErrorKind::Schema, false)
    } else if lowered.contains("database") {
        (ErrorKind::Database, false)
    } else {
        (ErrorKind::Unknown, false)
    };

    let mut err = ArcadeError::new(kind, message)
        .with_server_fields(exception, detail, payload.clone())
        .with_idempotency_violation(idempotent);
    if kind == ErrorKind::QueryParsing {
        if let Some(query) = query {
            err = err.with_query(query);
        }
    }
    err
}

fn is_security_exception(exception: &str) -> bool {
    exception == SECURITY_EXCEPTION
        || exception.rsplit('.').next() == Some(SECURITY_EXCEPTION_NAME)
}

fn member(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_security_exception() {
        let err = classify(&json!({"exception": "com.arcadedb.server.security.ServerSecurityException"}), None);
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.message(), "Unknown error");

        let err = classify(&json!({"exception": "com.example.ServerSecurityException"}), None);
        assert_eq!(err.kind(), ErrorKind::Authentication);
        let err = classify(&json!({"exception": "com.example.NotServerSecurityException"}), None);
        assert_ne!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_security_wins_over_message_rules() {
        let payload = json!({
            "error": "parsing of credentials failed",
            "exception": SECURITY_EXCEPTION
        });
        assert_eq!(classify(&payload, None).kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_parsing_exception_marker_attaches_query() {
        let payload = json!({
            "error": "Syntax error",
            "exception": "com.arcadedb.query.sql.parser.CommandSQLParsingException"
        });
        let err = classify(&payload, Some("SELEC 1"));
        assert_eq!(err.kind(), ErrorKind::QueryParsing);
        assert_eq!(err.query(), Some("SELEC 1"));
    }

    #[test]
    fn test_parsing_in_message_case_insensitive() {
        let err = classify(&json!({"error": "Error on PARSING the command"}), None);
        assert_eq!(err.kind(), ErrorKind::QueryParsing);
        assert_eq!(err.query(), None);
    }

    #[test]
    fn test_idempotent_violation() {
        let err = classify(&json!({"error": "idempotent violation"}), Some("DELETE FROM V"));
        assert_eq!(err.kind(), ErrorKind::Transaction);
        assert!(err.is_idempotency_violation());
        // only parsing failures carry the query
        assert_eq!(err.query(), None);
    }

    #[test]
    fn test_transaction_without_idempotency() {
        let err = classify(&json!({"error": "Transaction not begun"}), None);
        assert_eq!(err.kind(), ErrorKind::Transaction);
        assert!(!err.is_idempotency_violation());
    }

    #[test]
    fn test_schema_rules() {
        let err = classify(&json!({"error": "Schema is locked"}), None);
        assert_eq!(err.kind(), ErrorKind::Schema);

        let err = classify(&json!({"error": "Type 'Person' not found"}), None);
        assert_eq!(err.kind(), ErrorKind::Schema);

        // "type" alone is not enough
        let err = classify(&json!({"error": "Invalid type for field"}), None);
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_database_rule() {
        let err = classify(&json!({"error": "Database 'x' is not available"}), None);
        assert_eq!(err.kind(), ErrorKind::Database);
    }

    #[test]
    fn test_unknown_preserves_payload() {
        let payload = json!({"error": "boom", "detail": "stack", "exception": "java.lang.NullPointerException", "extra": 1});
        let err = classify(&payload, None);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.detail(), "stack");
        assert_eq!(err.exception(), "java.lang.NullPointerException");
        assert_eq!(err.payload(), &payload);
    }

    #[test]
    fn test_missing_and_odd_fields() {
        let err = classify(&json!({}), None);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.message(), "Unknown error");
        assert_eq!(err.detail(), "");

        let err = classify(&json!({"error": null, "detail": 42}), None);
        assert_eq!(err.message(), "Unknown error");
        assert_eq!(err.detail(), "42");

        let err = classify(&json!("database offline"), None);
        assert_eq!(err.kind(), ErrorKind::Database);
    }
}
