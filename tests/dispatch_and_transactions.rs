//! Query Dispatch and Transaction Tests
//!
//! Tests for the request path up to the server boundary:
//! - Validation happens before any network call
//! - Idempotency violations escalate to the command endpoint exactly once
//! - Transactions roll back exactly once with the token begin issued
//! - Error payload classification

use arcadedb_driver::error::classify;
use arcadedb_driver::transport::{Reply, ScriptedTransport, TransportKind, SESSION_HEADER};
use arcadedb_driver::{
    ArcadeError, Database, Endpoints, ErrorKind, IsolationLevel, Language, QueryRequest,
    SessionState,
};
use serde_json::{json, Value};

fn database() -> Database<ScriptedTransport> {
    Database::attach(ScriptedTransport::new(), Endpoints::default(), "shop")
}

fn idempotency_violation() -> Value {
    json!({
        "error": "Query is not idempotent",
        "exception": "com.arcadedb.exception.CommandExecutionException"
    })
}

// =============================================================================
// Dispatcher Validation Tests
// =============================================================================

/// Unknown languages fail before the transport is touched.
#[test]
fn test_unsupported_language_never_reaches_server() {
    let db = database();

    for language in ["sparql", "", "sql;", "graphql2"] {
        let err = db
            .query(&QueryRequest::new(language, "SELECT 1"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "language {:?}", language);
    }
    assert_eq!(db.transport().call_count(), 0);
}

/// Every supported language is accepted and sent verbatim.
#[test]
fn test_supported_languages_are_sent() {
    let db = database();

    for language in Language::ALL {
        db.transport().push_ok(json!([]));
        db.query(&QueryRequest::new(language.as_str(), "x"), None)
            .unwrap();
    }

    let calls = db.transport().calls();
    assert_eq!(calls.len(), Language::ALL.len());
    for (call, language) in calls.iter().zip(Language::ALL.iter()) {
        assert_eq!(call.payload["language"], json!(language.as_str()));
    }
}

/// Negative limits and wire-protocol serializers are rejected locally.
#[test]
fn test_local_preconditions() {
    let db = database();
    let err = db
        .query(&QueryRequest::sql("SELECT FROM V").limit(-1), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let wire = Database::attach(
        ScriptedTransport::with_kind(TransportKind::Wire),
        Endpoints::default(),
        "shop",
    );
    let err = wire
        .query(&QueryRequest::sql("SELECT FROM V").serializer("graph"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(db.transport().call_count(), 0);
    assert_eq!(wire.transport().call_count(), 0);
}

// =============================================================================
// Idempotency Escalation Tests
// =============================================================================

/// The retry goes to the command endpoint and its result is returned.
#[test]
fn test_idempotency_retry_succeeds() {
    let db = database();
    db.transport()
        .push_server_error(idempotency_violation())
        .push_ok(json!([{"@rid": "#1:0"}]));

    let result = db
        .query(&QueryRequest::sql("INSERT INTO V SET a = 1"), None)
        .unwrap();
    assert_eq!(result, json!([{"@rid": "#1:0"}]));

    let calls = db.transport().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].endpoint, "/api/v1/query/shop");
    assert_eq!(calls[1].endpoint, "/api/v1/command/shop");
}

/// A failed retry is never retried again.
#[test]
fn test_idempotency_retry_is_attempted_once() {
    let db = database();
    db.transport()
        .push_server_error(idempotency_violation())
        .push_server_error(idempotency_violation())
        .push_ok(json!("unused"));

    let err = db
        .query(&QueryRequest::sql("INSERT INTO V SET a = 1"), None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transaction);
    assert!(err.is_idempotency_violation());
    assert!(err.message().contains("both regular query and command"));
    assert_eq!(db.transport().call_count(), 2);
    assert_eq!(db.transport().pending(), 1);
}

/// Requests already on the command endpoint are not escalated.
#[test]
fn test_commands_are_not_escalated() {
    let db = database();
    db.transport().push_server_error(idempotency_violation());

    let err = db
        .query(&QueryRequest::sql("INSERT INTO V SET a = 1").as_command(), None)
        .unwrap_err();
    assert!(err.is_idempotency_violation());
    assert_eq!(db.transport().call_count(), 1);
}

// =============================================================================
// Transaction Tests
// =============================================================================

/// A failing statement rolls back once, with the begin token.
#[test]
fn test_failed_transaction_rolls_back_once() {
    let db = database();
    db.transport()
        .push_reply(Reply::new(Value::Null).with_header(SESSION_HEADER, "AS-7"))
        .push_ok(json!([{"a": 1}]))
        .push_server_error(json!({"error": "Record is not valid"}))
        .push_ok(json!({}));

    let statements = [
        "INSERT INTO V SET a = 1",
        "INSERT INTO V SET a = 'bad'",
        "INSERT INTO V SET a = 3",
    ];
    let err = db
        .transactions()
        .execute_transaction(&statements, IsolationLevel::RepeatableRead)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transaction);
    assert_eq!(err.session_id(), Some("AS-7"));
    assert!(err.message().starts_with("Transaction failed"));

    let calls = db.transport().calls();
    let rollbacks: Vec<_> = calls
        .iter()
        .filter(|c| c.endpoint == "/api/v1/rollback/shop")
        .collect();
    assert_eq!(rollbacks.len(), 1);
    assert_eq!(rollbacks[0].session(), Some("AS-7"));
    assert!(calls.iter().all(|c| c.endpoint != "/api/v1/commit/shop"));
    assert_eq!(calls[0].payload, json!({"isolationLevel": "REPEATABLE_READ"}));
}

/// A successful transaction commits and returns each statement result.
#[test]
fn test_successful_transaction_commits() {
    let db = database();
    db.transport()
        .push_reply(Reply::new(Value::Null).with_header(SESSION_HEADER, "AS-8"))
        .push_ok(json!([1]))
        .push_ok(json!([2]))
        .push_ok(json!({}));

    let results = db
        .transactions()
        .execute_transaction(&["A", "B"], IsolationLevel::ReadCommitted)
        .unwrap();
    assert_eq!(results, vec![json!([1]), json!([2])]);

    let calls = db.transport().calls();
    assert_eq!(calls.last().map(|c| c.endpoint.as_str()), Some("/api/v1/commit/shop"));
    assert!(calls[1..].iter().all(|c| c.session() == Some("AS-8")));
}

/// A rejected commit leaves the session open, so it is rolled back once.
#[test]
fn test_commit_failure_rolls_back_once() {
    let db = database();
    db.transport()
        .push_reply(Reply::new(Value::Null).with_header(SESSION_HEADER, "AS-10"))
        .push_ok(json!([1]))
        .push_server_error(json!({"error": "Concurrent modification on record #3:1"}))
        .push_ok(json!({}));

    let err = db
        .transactions()
        .execute_transaction(&["A"], IsolationLevel::ReadCommitted)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transaction);
    assert_eq!(err.session_id(), Some("AS-10"));

    let endpoints: Vec<_> = db
        .transport()
        .calls()
        .into_iter()
        .map(|c| c.endpoint)
        .collect();
    assert_eq!(
        endpoints,
        vec![
            "/api/v1/begin/shop",
            "/api/v1/command/shop",
            "/api/v1/commit/shop",
            "/api/v1/rollback/shop",
        ]
    );
    assert_eq!(db.transport().pending(), 0);
}

/// A failed rollback is logged; the statement error stays the cause.
#[test]
fn test_rollback_failure_keeps_original_error() {
    let db = database();
    db.transport()
        .push_reply(Reply::new(Value::Null).with_header(SESSION_HEADER, "AS-11"))
        .push_server_error(json!({"error": "Record is not valid"}))
        .push_server_error(json!({"error": "Session expired"}));

    let err = db
        .transactions()
        .execute_transaction(&["INSERT INTO V SET a = 'bad'"], IsolationLevel::default())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transaction);
    assert_eq!(err.message(), "Transaction failed: Record is not valid");
    let cause = err.cause().unwrap();
    assert_eq!(cause.message(), "Record is not valid");
    assert_eq!(cause.query(), Some("INSERT INTO V SET a = 'bad'"));
    assert_eq!(db.transport().call_count(), 3);
}

/// A failed begin has no session to roll back.
#[test]
fn test_begin_failure_sends_no_rollback() {
    let db = database();
    db.transport()
        .push_server_error(json!({"error": "Database 'shop' is not available"}));

    let err = db
        .transactions()
        .execute_transaction(&["A"], IsolationLevel::default())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transaction);
    assert!(err.message().starts_with("Transaction failed"));
    assert_eq!(err.session_id(), None);
    assert!(err.cause().is_some());

    let calls = db.transport().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].endpoint, "/api/v1/begin/shop");

    db.transport().push_ok(json!({}));
    let err = db
        .transactions()
        .execute_transaction(&["A"], IsolationLevel::default())
        .unwrap_err();
    assert!(err.message().contains("did not return"));
    assert_eq!(db.transport().call_count(), 2);
}

/// Sessions are caller-owned and refuse reuse after they end.
#[test]
fn test_session_lifecycle() {
    let db = database();
    db.transport()
        .push_reply(Reply::new(Value::Null).with_header(SESSION_HEADER, "AS-9"))
        .push_ok(json!({}));

    let tx = db.transactions();
    let mut session = tx.begin(IsolationLevel::default()).unwrap();
    tx.commit(&mut session).unwrap();
    assert_eq!(session.state(), SessionState::Committed);

    let err = db
        .query(&QueryRequest::sql("SELECT FROM V"), Some(&session))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(tx.rollback(&mut session).is_err());
    assert_eq!(db.transport().call_count(), 2);
}

// =============================================================================
// Classification Tests
// =============================================================================

#[test]
fn test_classification_properties() {
    let err = classify(&json!({"exception": "com.example.ServerSecurityException"}), None);
    assert_eq!(err.kind(), ErrorKind::Authentication);

    let err = classify(&json!({"error": "idempotent violation"}), None);
    assert_eq!(err.kind(), ErrorKind::Transaction);
    assert!(err.is_idempotency_violation());

    let err: ArcadeError = classify(&json!({}), Some("SELECT"));
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.payload(), &json!({}));
}
