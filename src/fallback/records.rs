//! Multi-type record retrieval

use serde_json::Value;

use crate::error::{ArcadeError, ArcadeResult};
use crate::query::{into_rows, Dispatcher};
use crate::transaction::Session;

use super::chain::FallbackChain;

/// Reads records from one or more types.
///
/// Several types are read with one UNION first; when the parser rejects it,
/// each type is read on its own and the results are merged in type order.
#[derive(Debug, Clone, Copy)]
pub struct RecordFetcher<'a> {
    dispatcher: Dispatcher<'a>,
}

impl<'a> RecordFetcher<'a> {
    pub fn new(dispatcher: Dispatcher<'a>) -> Self {
        Self { dispatcher }
    }

    /// Fetch records. A limit of 0 means no limit.
    pub fn fetch<S: AsRef<str>>(
        &self,
        type_names: &[S],
        where_clause: Option<&str>,
        limit: Option<usize>,
        session: Option<&Session>,
    ) -> ArcadeResult<Vec<Value>> {
        let types: Vec<&str> = type_names.iter().map(|t| t.as_ref().trim()).collect();
        if types.is_empty() || types.iter().any(|t| t.is_empty()) {
            return Err(ArcadeError::validation(
                "Type names must be a non-empty list of non-empty names",
            ));
        }
        let where_clause = where_clause.map(str::trim).filter(|w| !w.is_empty());
        let limit = limit.filter(|n| *n > 0);

        if let [single] = types.as_slice() {
            let query = select(single, where_clause, limit);
            return self.dispatcher.sql(&query, session).map(into_rows);
        }

        FallbackChain::new("records")
            .then("union", || {
                let union = types
                    .iter()
                    .map(|t| select(t, where_clause, None))
                    .collect::<Vec<_>>()
                    .join(" UNION ");
                let query = match limit {
                    Some(n) => format!("SELECT * FROM ({}) LIMIT {}", union, n),
                    None => union,
                };
                self.dispatcher.sql(&query, session).map(into_rows)
            })
            .then("per-type", || self.per_type(&types, where_clause, limit, session))
            .run()
    }

    /// A failing type is skipped unless every type fails; then the last
    /// failure is returned.
    fn per_type(
        &self,
        types: &[&str],
        where_clause: Option<&str>,
        limit: Option<usize>,
        session: Option<&Session>,
    ) -> ArcadeResult<Vec<Value>> {
        let per_type_limit = limit.map(|n| (n / types.len()).max(1));
        let mut merged = Vec::new();
        let mut answered = 0;
        let mut last_error = None;

        for type_name in types {
            let query = select(type_name, where_clause, per_type_limit);
            match self.dispatcher.sql(&query, session) {
                Ok(result) => {
                    answered += 1;
                    merged.extend(into_rows(result));
                }
                Err(err) if err.is_access_failure() => return Err(err),
                Err(err) => {
                    tracing::warn!(type_name, error = %err, "query failed for type, skipping");
                    last_error = Some(err);
                }
            }
        }

        if answered == 0 {
            if let Some(err) = last_error {
                return Err(err);
            }
        }

        if let Some(n) = limit {
            merged.truncate(n);
        }
        Ok(merged)
    }
}

fn select(type_name: &str, where_clause: Option<&str>, limit: Option<usize>) -> String {
    let mut query = format!("SELECT * FROM {}", type_name);
    if let Some(condition) = where_clause {
        query.push_str(&format!(" WHERE {}", condition));
    }
    if let Some(n) = limit {
        query.push_str(&format!(" LIMIT {}", n));
    }
    query
}
