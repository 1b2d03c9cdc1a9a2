//! # Query
//!
//! Request model, literal encoding and the dispatcher that sends requests to
//! the query or command endpoint.

mod dispatcher;
pub mod literal;
mod params;
mod request;

pub use dispatcher::{Dispatcher, PreparedRequest};
pub use params::{inline_parameters, BoundQuery};
pub use request::{Language, QueryPayload, QueryRequest, Serializer};

use serde_json::Value;

/// Normalize a query result into a list of rows.
///
/// Arrays are returned as is, null becomes empty and any other value is a
/// single row.
pub fn into_rows(result: Value) -> Vec<Value> {
    match result {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
