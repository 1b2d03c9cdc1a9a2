//! Bulk Accounting and Fallback Tests
//!
//! Tests for the multi-request operations:
//! - Bulk writes report exact success and failure counts
//! - Multi-type reads degrade from UNION to per-type queries
//! - Triplet reads degrade from MATCH to edge listing
//! - Vector inputs are validated before anything is sent

use std::time::Duration;

use arcadedb_driver::fallback::{Embedding, TripletFilter, VectorSearch};
use arcadedb_driver::transport::ScriptedTransport;
use arcadedb_driver::{Database, Endpoints, ErrorKind, RetryPolicy};
use serde_json::{json, Value};

fn database() -> Database<ScriptedTransport> {
    Database::attach(ScriptedTransport::new(), Endpoints::default(), "shop")
}

fn records(n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({"sku": format!("P{}", i), "qty": i})).collect()
}

fn parsing_error() -> Value {
    json!({
        "error": "Encountered \"UNION\"",
        "exception": "com.arcadedb.query.sql.parser.CommandSQLParsingException"
    })
}

// =============================================================================
// Bulk Accounting Tests
// =============================================================================

/// All chunks succeeding returns the record count.
#[test]
fn test_bulk_insert_all_success() {
    let db = database();
    for _ in 0..3 {
        db.transport().push_ok(json!([]));
    }

    let inserted = db
        .bulk()
        .with_batch_size(2)
        .insert("Product", &records(5), None)
        .unwrap();
    assert_eq!(inserted, 5);

    let calls = db.transport().calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].endpoint, "/api/v1/command/shop");
    assert_eq!(calls[0].payload["language"], json!("sqlscript"));
    assert_eq!(
        calls[2].command(),
        Some("INSERT INTO Product SET qty = 4, sku = 'P4'")
    );
}

/// All chunks failing reports every record as failed.
#[test]
fn test_bulk_insert_total_failure() {
    let db = database();
    for _ in 0..3 {
        db.transport()
            .push_server_error(json!({"error": "Duplicated key"}));
    }

    let err = db
        .bulk()
        .with_batch_size(2)
        .insert("Product", &records(5), None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BulkOperation);
    let counts = err.counts().unwrap();
    assert_eq!(counts.failed(), 5);
    assert_eq!(counts.requested, 5);
    assert_eq!(counts.succeeded, 0);
    assert!(counts.is_total_failure());
}

/// Mixed outcomes still fail, with the exact partial counts.
#[test]
fn test_bulk_insert_partial_failure() {
    let db = database();
    db.transport()
        .push_ok(json!([]))
        .push_server_error(json!({"error": "Duplicated key"}))
        .push_ok(json!([]));

    let err = db
        .bulk()
        .with_batch_size(2)
        .insert("Product", &records(5), None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BulkOperation);
    assert_eq!(err.type_name(), Some("Product"));
    let counts = err.counts().unwrap();
    assert_eq!(counts.succeeded, 3);
    assert_eq!(counts.failed_in_flight, 2);
    assert!(counts.failed() + counts.succeeded <= counts.requested);
    assert!(err.cause().is_some());
}

/// Records that produce no statement are skipped, not sent.
#[test]
fn test_bulk_insert_skips_empty_records() {
    let db = database();
    db.transport().push_ok(json!([]));

    let err = db
        .bulk()
        .insert("Product", &[json!({"sku": "A"}), json!({}), json!(7)], None)
        .unwrap_err();

    let counts = err.counts().unwrap();
    assert_eq!(counts.succeeded, 1);
    assert_eq!(counts.skipped, 2);
    assert_eq!(counts.attempted(), 1);
    assert_eq!(db.transport().call_count(), 1);
}

/// Chunk retry resends only the rejected chunk; committed chunks go out once.
#[test]
fn test_chunk_retry_never_resends_committed_chunks() {
    let db = database();
    db.transport()
        .push_ok(json!([]))
        .push_server_error(json!({"error": "Timeout"}))
        .push_ok(json!([]));

    let inserted = db
        .bulk()
        .with_batch_size(2)
        .with_chunk_retry(RetryPolicy::for_bulk(2, Duration::ZERO))
        .insert("Product", &records(4), None)
        .unwrap();
    assert_eq!(inserted, 4);

    let commands = db.transport().commands();
    assert_eq!(commands.len(), 3);
    let first_chunk = &commands[0];
    assert!(first_chunk.contains("'P0'") && first_chunk.contains("'P1'"));
    assert_eq!(commands.iter().filter(|c| *c == first_chunk).count(), 1);
    assert!(commands[1].contains("'P2'") && commands[1].contains("'P3'"));
    assert_eq!(commands[1], commands[2]);
}

/// A chunk still rejected after its retries is counted as failed.
#[test]
fn test_chunk_retry_exhausted_reports_partial_counts() {
    let db = database();
    db.transport()
        .push_ok(json!([]))
        .push_server_error(json!({"error": "Timeout"}))
        .push_server_error(json!({"error": "Timeout"}));

    let err = db
        .bulk()
        .with_batch_size(2)
        .with_chunk_retry(RetryPolicy::for_bulk(1, Duration::ZERO))
        .insert("Product", &records(4), None)
        .unwrap_err();

    let counts = err.counts().unwrap();
    assert_eq!(counts.succeeded, 2);
    assert_eq!(counts.failed_in_flight, 2);
    assert_eq!(db.transport().call_count(), 3);
}

/// Every upsert chunk rejected: a bulk error with every record failed.
#[test]
fn test_bulk_upsert_total_failure() {
    let db = database();
    db.transport()
        .push_server_error(json!({"error": "Duplicated key"}))
        .push_server_error(json!({"error": "Duplicated key"}));

    let err = db
        .bulk()
        .with_batch_size(2)
        .upsert("Product", &records(3), "sku", None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BulkOperation);
    assert!(err.message().starts_with("Bulk upsert failed"));
    let counts = err.counts().unwrap();
    assert_eq!(counts.requested, 3);
    assert_eq!(counts.failed_in_flight, 3);
    assert_eq!(counts.succeeded, 0);
    assert!(counts.is_total_failure());
    assert_eq!(
        db.transport().commands()[1],
        "UPDATE Product SET qty = 2, sku = 'P2' UPSERT WHERE sku = 'P2'"
    );
}

/// Deleting everything requires leaving safe mode.
#[test]
fn test_unconditional_delete_needs_safe_mode_off() {
    let db = database();
    let no_conditions: [&str; 0] = [];

    let err = db
        .bulk()
        .delete("Product", &no_conditions, true, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(db.transport().call_count(), 0);

    db.transport().push_ok(json!([]));
    assert_eq!(
        db.bulk()
            .delete("Product", &no_conditions, false, None)
            .unwrap(),
        0
    );
    assert_eq!(db.transport().commands(), vec!["TRUNCATE TYPE Product UNSAFE"]);
}

// =============================================================================
// Record Fallback Tests
// =============================================================================

/// A rejected UNION falls back to one query per type, merged in type order
/// and truncated to the overall limit.
#[test]
fn test_union_failure_falls_back_per_type() {
    let db = database();
    db.transport()
        .push_server_error(parsing_error())
        .push_ok(json!([{"t": "A", "n": 1}, {"t": "A", "n": 2}]))
        .push_ok(json!([{"t": "B", "n": 1}, {"t": "B", "n": 2}]));

    let rows = db
        .records()
        .fetch(&["A", "B"], None, Some(3), None)
        .unwrap();

    assert_eq!(
        rows,
        vec![
            json!({"t": "A", "n": 1}),
            json!({"t": "A", "n": 2}),
            json!({"t": "B", "n": 1}),
        ]
    );

    let commands = db.transport().commands();
    assert_eq!(commands.len(), 3);
    assert!(commands[0].contains(" UNION "));
    assert_eq!(commands[1], "SELECT * FROM A LIMIT 1");
    assert_eq!(commands[2], "SELECT * FROM B LIMIT 1");
}

/// Errors other than parsing failures do not trigger the fallback.
#[test]
fn test_union_non_parsing_error_propagates() {
    let db = database();
    db.transport().push_server_error(json!({
        "error": "Invalid credentials",
        "exception": "com.arcadedb.server.security.ServerSecurityException"
    }));

    let err = db
        .records()
        .fetch(&["A", "B"], Some("qty > 1"), None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(db.transport().call_count(), 1);
}

// =============================================================================
// Triplet Fallback Tests
// =============================================================================

/// MATCH and traversal both rejected: edges are listed with rid references.
#[test]
fn test_triplets_fall_back_to_edge_listing() {
    let db = database();
    db.transport()
        .push_server_error(parsing_error())
        .push_server_error(parsing_error())
        .push_ok(json!([{"@rid": "#9:0", "@type": "Knows", "@out": "#1:0", "@in": "#1:1"}]));

    let triplets = db
        .triplets()
        .fetch(&TripletFilter::default().limit(10), None)
        .unwrap();

    assert_eq!(triplets.len(), 1);
    assert_eq!(triplets[0].subject, json!({"@rid": "#1:0"}));
    assert_eq!(triplets[0].object, json!({"@rid": "#1:1"}));
    assert_eq!(db.transport().call_count(), 3);
}

// =============================================================================
// Vector Validation Tests
// =============================================================================

#[test]
fn test_vector_inputs_are_validated() {
    let err = Embedding::from_values(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = Embedding::from_values(&[json!("x"), json!(1)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let embedding = Embedding::from_values(&[json!(0.5), json!(1)]).unwrap();
    let err = VectorSearch::new("Doc", "vec", embedding, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

/// A batch with one malformed entry sends nothing.
#[test]
fn test_batch_search_validates_every_entry_first() {
    let db = database();
    let searches = vec![
        json!({"type_name": "Doc", "embedding_field": "vec", "query_embedding": [0.1, 0.2]}),
        json!({"type_name": "Doc", "embedding_field": "vec", "query_embedding": []}),
    ];

    let err = db.vectors().batch_search(&searches, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(db.transport().call_count(), 0);
}
