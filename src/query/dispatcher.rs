//! # Query Dispatcher
//!
//! Validates a [`QueryRequest`], picks the query or command endpoint and
//! performs the single idempotency escalation.
//!
//! ## Rules
//! - Every precondition is checked before the first network call
//! - A read-form request rejected as mutating is resent once to the command
//!   endpoint; a failure there is final
//! - Validation and parsing failures are never retried

use serde_json::Value;

use crate::config::Endpoints;
use crate::error::{ArcadeError, ArcadeResult};
use crate::transaction::Session;
use crate::transport::{Headers, Transport, TransportKind, SESSION_HEADER};

use super::params::inline_parameters;
use super::request::{Language, QueryPayload, QueryRequest, Serializer};

const LOGGED_COMMAND_CHARS: usize = 100;

/// Request ready to be posted
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub command: String,
    pub payload: Value,
    pub headers: Headers,
}

/// Routes requests for one database
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    transport: &'a dyn Transport,
    database: &'a str,
    endpoints: &'a Endpoints,
}

impl<'a> Dispatcher<'a> {
    pub fn new(transport: &'a dyn Transport, database: &'a str, endpoints: &'a Endpoints) -> Self {
        Self {
            transport,
            database,
            endpoints,
        }
    }

    pub fn database(&self) -> &str {
        self.database
    }

    pub fn transport(&self) -> &'a dyn Transport {
        self.transport
    }

    pub fn endpoints(&self) -> &'a Endpoints {
        self.endpoints
    }

    /// Validate `request` and turn it into a payload plus headers.
    ///
    /// Nothing is sent; every error here is a `Validation` error.
    pub fn prepare(
        &self,
        request: &QueryRequest,
        session: Option<&Session>,
    ) -> ArcadeResult<PreparedRequest> {
        let language = Language::parse(&request.language)?;

        if let Some(limit) = request.limit {
            if limit < 0 {
                return Err(ArcadeError::validation(
                    "Limit must be a non-negative integer",
                ));
            }
        }

        let serializer = match request.serializer.as_deref() {
            Some(name) => {
                let serializer = Serializer::parse(name)?;
                if self.transport.kind() != TransportKind::Http {
                    return Err(ArcadeError::validation(
                        "Serializer is only supported with the HTTP transport",
                    ));
                }
                Some(serializer)
            }
            None => None,
        };

        let mut headers = Headers::new();
        if let Some(session) = session {
            session.ensure_open()?;
            if self.transport.kind() != TransportKind::Http {
                return Err(ArcadeError::validation(
                    "Session ID is only supported with the HTTP transport",
                ));
            }
            headers.insert(SESSION_HEADER.to_string(), session.token().to_string());
        }

        let (command, params) = match &request.params {
            Some(params) if language.inlines_parameters() && has_values(params) => {
                let bound = inline_parameters(&request.command, params)?;
                let deferred = bound.params();
                (bound.command, deferred)
            }
            other => (request.command.clone(), other.clone()),
        };

        let payload = QueryPayload {
            command: command.clone(),
            language: language.as_str().to_string(),
            limit: request.limit,
            params,
            serializer,
        }
        .to_value()?;

        Ok(PreparedRequest {
            command,
            payload,
            headers,
        })
    }

    /// Execute one request
    pub fn execute(&self, request: &QueryRequest, session: Option<&Session>) -> ArcadeResult<Value> {
        let prepared = self.prepare(request, session)?;
        let endpoint = if request.is_command {
            self.endpoints.command(self.database)
        } else {
            self.endpoints.query(self.database)
        };

        match self.send(&endpoint, &prepared, session) {
            Ok(result) => Ok(result),
            Err(original)
                if original.is_idempotency_violation()
                    && !request.is_command
                    && request.retry_on_idempotency_violation =>
            {
                tracing::info!(
                    database = self.database,
                    command = %shorten(&prepared.command),
                    "retrying non-idempotent query as command"
                );
                let command_endpoint = self.endpoints.command(self.database);
                self.send(&command_endpoint, &prepared, session)
                    .map_err(|retry| escalation_failed(original, retry, &prepared, session))
            }
            Err(err) => Err(err),
        }
    }

    /// Run a read-form SQL statement
    pub fn sql(&self, command: &str, session: Option<&Session>) -> ArcadeResult<Value> {
        self.execute(&QueryRequest::sql(command), session)
    }

    /// Run a SQL statement against the command endpoint
    pub fn sql_command(&self, command: &str, session: Option<&Session>) -> ArcadeResult<Value> {
        self.execute(&QueryRequest::sql(command).as_command(), session)
    }

    fn send(
        &self,
        endpoint: &str,
        prepared: &PreparedRequest,
        session: Option<&Session>,
    ) -> ArcadeResult<Value> {
        self.transport
            .post(endpoint, &prepared.payload, &prepared.headers)
            .map(|reply| reply.result)
            .map_err(|err| {
                let err = err.into_classified(Some(&prepared.command));
                match session {
                    Some(session) => err.with_session(session.token()),
                    None => err,
                }
            })
    }
}

impl std::fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("database", &self.database)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

fn escalation_failed(
    original: ArcadeError,
    retry: ArcadeError,
    prepared: &PreparedRequest,
    session: Option<&Session>,
) -> ArcadeError {
    let mut err = ArcadeError::transaction(format!(
        "Query failed as both regular query and command. Original error: {}. Retry error: {}",
        original, retry
    ))
    .with_idempotency_violation(true)
    .with_query(prepared.command.clone());
    if let Some(session) = session {
        err = err.with_session(session.token());
    }
    err.with_cause(original)
}

fn has_values(params: &Value) -> bool {
    match params {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn shorten(command: &str) -> String {
    if command.chars().count() > LOGGED_COMMAND_CHARS {
        let cut: String = command.chars().take(LOGGED_COMMAND_CHARS).collect();
        format!("{}...", cut)
    } else {
        command.to_string()
    }
}
