//! # Bulk Batch Executor
//!
//! Records are cut into fixed-size chunks in input order. Each chunk becomes
//! one composite script posted to the command endpoint.
//!
//! ## Accounting
//! - A record that cannot be turned into a statement is skipped and never sent
//! - A rejected chunk fails every statement it carried
//! - All chunks are attempted; any failure is reported at the end with the
//!   final counts attached
//! - With a retry policy, a rejected chunk is resent on its own; a chunk the
//!   server accepted is never sent again

use serde_json::Value;

use crate::error::{ArcadeError, ArcadeResult, BulkCounts, ErrorKind};
use crate::query::{into_rows, Dispatcher, Language, QueryRequest};
use crate::transaction::Session;
use crate::transport::RetryPolicy;

use super::statements::{
    delete_by_rids, delete_statement, insert_statement, truncate_statement, upsert_statement,
};

/// Records per chunk unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 1000;

const STATEMENT_SEPARATOR: &str = "; ";

/// Chunked insert, upsert and delete for one database
#[derive(Debug, Clone, Copy)]
pub struct BulkExecutor<'a> {
    dispatcher: Dispatcher<'a>,
    batch_size: usize,
    chunk_retry: RetryPolicy,
}

impl<'a> BulkExecutor<'a> {
    pub fn new(dispatcher: Dispatcher<'a>) -> Self {
        Self {
            dispatcher,
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_retry: RetryPolicy::none(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Resend a chunk the server rejected with a transaction conflict or an
    /// unclassified error, up to the policy's attempts
    pub fn with_chunk_retry(mut self, policy: RetryPolicy) -> Self {
        self.chunk_retry = policy;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Insert records, returning how many were written
    pub fn insert(
        &self,
        type_name: &str,
        records: &[Value],
        session: Option<&Session>,
    ) -> ArcadeResult<usize> {
        self.run_chunks("insert", type_name, records, session, |record| {
            insert_statement(type_name, record)
        })
    }

    /// Insert or update records matched on `key_field`
    pub fn upsert(
        &self,
        type_name: &str,
        records: &[Value],
        key_field: &str,
        session: Option<&Session>,
    ) -> ArcadeResult<usize> {
        if key_field.trim().is_empty() {
            return Err(ArcadeError::validation(
                "Key field is required for upsert operations",
            ));
        }
        self.run_chunks("upsert", type_name, records, session, |record| {
            upsert_statement(type_name, record, key_field)
        })
    }

    /// Delete by conditions. The count is approximate: one per condition.
    ///
    /// With no conditions the call is rejected in safe mode; otherwise the
    /// whole type is cleared and 0 is returned.
    pub fn delete<S: AsRef<str>>(
        &self,
        type_name: &str,
        conditions: &[S],
        safe_mode: bool,
        session: Option<&Session>,
    ) -> ArcadeResult<usize> {
        if conditions.is_empty() {
            if safe_mode {
                return Err(ArcadeError::validation(
                    "Bulk delete without conditions is not allowed in safe mode. \
                     Disable safe mode to delete all records.",
                ));
            }
            self.clear(type_name, session)?;
            return Ok(0);
        }
        self.run_chunks("delete", type_name, conditions, session, |condition| {
            delete_statement(type_name, condition.as_ref())
        })
    }

    /// Delete every record of a type.
    ///
    /// Truncation is tried first. When the server refuses it, records are
    /// deleted by id one batch at a time until a batch comes back empty; a
    /// failing batch stops the loop. Returns the number deleted by id.
    pub fn safe_delete_all(&self, type_name: &str, session: Option<&Session>) -> ArcadeResult<usize> {
        let batch_size = self.checked_batch_size()?;
        let truncate = QueryRequest::sql(truncate_statement(type_name))
            .as_command()
            .without_idempotency_retry();

        match self.dispatcher.execute(&truncate, session) {
            Ok(_) => {
                tracing::info!(type_name, "truncated type");
                return Ok(0);
            }
            Err(err) if err.kind() == ErrorKind::Connection => {
                return Err(ArcadeError::transaction(format!(
                    "Safe delete all failed for type {}",
                    type_name
                ))
                .with_type_name(type_name)
                .with_cause(err));
            }
            Err(err) => {
                tracing::debug!(type_name, error = %err, "truncate refused, deleting in batches");
            }
        }

        let select = format!("SELECT @rid FROM {} LIMIT {}", type_name, batch_size);
        let mut deleted = 0;
        loop {
            let rids: Vec<String> = match self.dispatcher.sql(&select, session) {
                Ok(result) => into_rows(result)
                    .iter()
                    .filter_map(|row| row.get("@rid").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect(),
                Err(err) => {
                    tracing::error!(type_name, error = %err, "batch selection failed");
                    break;
                }
            };
            if rids.is_empty() {
                break;
            }

            let delete = QueryRequest::sql(delete_by_rids(type_name, &rids))
                .as_command()
                .without_idempotency_retry();
            if let Err(err) = self.dispatcher.execute(&delete, session) {
                tracing::error!(type_name, error = %err, "batch deletion failed");
                break;
            }
            deleted += rids.len();
            tracing::debug!(type_name, batch = rids.len(), "deleted batch");
        }
        Ok(deleted)
    }

    fn clear(&self, type_name: &str, session: Option<&Session>) -> ArcadeResult<()> {
        match self
            .dispatcher
            .sql_command(&truncate_statement(type_name), session)
        {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::Connection => Err(err),
            Err(err) => {
                tracing::debug!(type_name, error = %err, "truncate refused, falling back to delete");
                self.dispatcher
                    .sql_command(&format!("DELETE FROM {}", type_name), session)
                    .map(|_| ())
            }
        }
    }

    fn checked_batch_size(&self) -> ArcadeResult<usize> {
        if self.batch_size == 0 {
            return Err(ArcadeError::validation("Batch size must be positive"));
        }
        Ok(self.batch_size)
    }

    fn run_chunks<I, F>(
        &self,
        operation: &str,
        type_name: &str,
        items: &[I],
        session: Option<&Session>,
        build: F,
    ) -> ArcadeResult<usize>
    where
        F: Fn(&I) -> Option<String>,
    {
        let batch_size = self.checked_batch_size()?;
        if type_name.trim().is_empty() {
            return Err(ArcadeError::validation("Type name must not be empty"));
        }
        if items.is_empty() {
            return Ok(0);
        }

        let mut counts = BulkCounts::new(items.len());
        let mut last_error = None;

        for (index, chunk) in items.chunks(batch_size).enumerate() {
            let statements: Vec<String> = chunk.iter().filter_map(&build).collect();
            counts.skipped += chunk.len() - statements.len();
            if statements.is_empty() {
                continue;
            }

            let script = QueryRequest::new(
                Language::SqlScript.as_str(),
                statements.join(STATEMENT_SEPARATOR),
            )
            .as_command();

            let outcome = self.chunk_retry.run(
                |_| self.dispatcher.execute(&script, session),
                ArcadeError::is_retryable_chunk_failure,
            );
            match outcome {
                Ok(_) => counts.succeeded += statements.len(),
                Err(err) => {
                    tracing::warn!(
                        operation,
                        type_name,
                        chunk = index,
                        statements = statements.len(),
                        error = %err,
                        "bulk chunk failed"
                    );
                    counts.failed_in_flight += statements.len();
                    last_error = Some(err);
                }
            }
        }

        if counts.failed() == 0 {
            return Ok(counts.succeeded);
        }

        let reason = if counts.is_total_failure() {
            format!("Bulk {} failed for type {}", operation, type_name)
        } else {
            format!("Bulk {} partially failed for type {}", operation, type_name)
        };
        let err = ArcadeError::bulk(reason, counts).with_type_name(type_name);
        Err(match last_error {
            Some(cause) => err.with_cause(cause),
            None => err,
        })
    }
}
