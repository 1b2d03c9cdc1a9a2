//! # Transaction Session Manager
//!
//! `(none) --begin--> Open --commit--> Committed`
//! `Open --rollback--> RolledBack`
//!
//! ## Rules
//! - The token comes from the begin response headers, never the body
//! - A finished session is rejected before any request is made
//! - `execute_transaction` rolls back exactly once on any failure, and a
//!   rollback failure never replaces the error that caused it

use serde_json::{json, Value};

use crate::error::{ArcadeError, ArcadeResult};
use crate::query::{Dispatcher, QueryRequest};
use crate::transport::{Headers, SESSION_HEADER};

use super::session::{IsolationLevel, Session, SessionState};

/// Begins, commits and rolls back sessions for one database
#[derive(Debug, Clone, Copy)]
pub struct TransactionManager<'a> {
    dispatcher: Dispatcher<'a>,
}

impl<'a> TransactionManager<'a> {
    pub fn new(dispatcher: Dispatcher<'a>) -> Self {
        Self { dispatcher }
    }

    /// Open a session
    pub fn begin(&self, isolation: IsolationLevel) -> ArcadeResult<Session> {
        let endpoint = self.dispatcher.endpoints().begin(self.dispatcher.database());
        let reply = self
            .dispatcher
            .transport()
            .post(
                &endpoint,
                &json!({ "isolationLevel": isolation.as_str() }),
                &Headers::new(),
            )
            .map_err(|err| err.into_classified(None))?;

        let token = reply
            .header(SESSION_HEADER)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ArcadeError::transaction(format!(
                    "Server did not return a {} header",
                    SESSION_HEADER
                ))
            })?;

        tracing::debug!(
            database = self.dispatcher.database(),
            session = token,
            isolation = isolation.as_str(),
            "transaction started"
        );
        Ok(Session::new(token, isolation))
    }

    /// Commit the session; its state changes only when the server accepts
    pub fn commit(&self, session: &mut Session) -> ArcadeResult<()> {
        let endpoint = self.dispatcher.endpoints().commit(self.dispatcher.database());
        self.finish(&endpoint, session)?;
        session.finish(SessionState::Committed);
        tracing::debug!(session = session.token(), "transaction committed");
        Ok(())
    }

    /// Roll the session back; its state changes only when the server accepts
    pub fn rollback(&self, session: &mut Session) -> ArcadeResult<()> {
        let endpoint = self.dispatcher.endpoints().rollback(self.dispatcher.database());
        self.finish(&endpoint, session)?;
        session.finish(SessionState::RolledBack);
        tracing::debug!(session = session.token(), "transaction rolled back");
        Ok(())
    }

    fn finish(&self, endpoint: &str, session: &Session) -> ArcadeResult<()> {
        session.ensure_open()?;
        let mut headers = Headers::new();
        headers.insert(SESSION_HEADER.to_string(), session.token().to_string());
        self.dispatcher
            .transport()
            .post(endpoint, &json!({}), &headers)
            .map(|_| ())
            .map_err(|err| err.into_classified(None).with_session(session.token()))
    }

    /// Run statements as commands in order, stopping at the first failure.
    ///
    /// The failing statement is attached to the error.
    pub fn execute_batch<S: AsRef<str>>(
        &self,
        statements: &[S],
        session: Option<&Session>,
    ) -> ArcadeResult<Vec<Value>> {
        if statements.is_empty() {
            return Err(ArcadeError::validation(
                "Statements must be a non-empty list",
            ));
        }

        statements
            .iter()
            .map(|statement| {
                let statement = statement.as_ref();
                self.dispatcher
                    .execute(&QueryRequest::sql(statement).as_command(), session)
                    .map_err(|err| err.with_query(statement))
            })
            .collect()
    }

    /// Run statements atomically under a fresh session
    pub fn execute_transaction<S: AsRef<str>>(
        &self,
        statements: &[S],
        isolation: IsolationLevel,
    ) -> ArcadeResult<Vec<Value>> {
        if statements.is_empty() {
            return Err(ArcadeError::validation(
                "Statements must be a non-empty list",
            ));
        }

        let mut session = self
            .begin(isolation)
            .map_err(|err| transaction_failed(err, None))?;

        let outcome = self
            .execute_batch(statements, Some(&session))
            .and_then(|results| self.commit(&mut session).map(|_| results));

        outcome.map_err(|err| {
            if session.is_open() {
                if let Err(rollback_err) = self.rollback(&mut session) {
                    tracing::error!(
                        session = session.token(),
                        error = %rollback_err,
                        "failed to rollback transaction"
                    );
                }
            }
            transaction_failed(err, Some(session.token()))
        })
    }
}

fn transaction_failed(cause: ArcadeError, session: Option<&str>) -> ArcadeError {
    let mut err = ArcadeError::transaction(format!("Transaction failed: {}", cause));
    if let Some(token) = session {
        err = err.with_session(token);
    }
    err.with_cause(cause)
}
