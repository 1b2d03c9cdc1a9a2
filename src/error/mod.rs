//! Error types for the driver
//!
//! Every failure surfaces as an [`ArcadeError`] tagged with an [`ErrorKind`].
//! Server-side failures keep the raw payload they were classified from, and
//! client-side failures (`Validation`) are raised before any request is sent.

mod classify;

pub use classify::{classify, PARSING_EXCEPTION_MARKER, SECURITY_EXCEPTION};

use std::fmt;

use serde_json::Value;

/// Error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials rejected by the server
    Authentication,
    /// The server's parser rejected the query text
    QueryParsing,
    /// Transaction lifecycle failure or idempotency violation
    Transaction,
    /// Unknown type, missing property, schema mismatch
    Schema,
    /// Database-level failure (missing, already exists, ...)
    Database,
    /// Client-side precondition failure, never sent over the network
    Validation,
    /// Transport failure before any server response existed
    Connection,
    /// Bulk mutation with failed records
    BulkOperation,
    /// Vector search or vector index failure
    VectorOperation,
    /// Classification fallback
    Unknown,
}

impl ErrorKind {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "ARCADE_AUTHENTICATION",
            ErrorKind::QueryParsing => "ARCADE_QUERY_PARSING",
            ErrorKind::Transaction => "ARCADE_TRANSACTION",
            ErrorKind::Schema => "ARCADE_SCHEMA",
            ErrorKind::Database => "ARCADE_DATABASE",
            ErrorKind::Validation => "ARCADE_VALIDATION",
            ErrorKind::Connection => "ARCADE_CONNECTION",
            ErrorKind::BulkOperation => "ARCADE_BULK_OPERATION",
            ErrorKind::VectorOperation => "ARCADE_VECTOR_OPERATION",
            ErrorKind::Unknown => "ARCADE_UNKNOWN",
        }
    }

    /// Whether the failure was detected without talking to the server
    pub fn is_client_side(&self) -> bool {
        matches!(self, ErrorKind::Validation)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Record accounting for a bulk mutation.
///
/// `skipped` records never left the client (shape violations), while
/// `failed_in_flight` records were sent in a chunk the server rejected.
/// The two are only merged by [`BulkCounts::failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkCounts {
    pub requested: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed_in_flight: usize,
}

impl BulkCounts {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Default::default()
        }
    }

    /// Records that did not make it, whether skipped or rejected
    pub fn failed(&self) -> usize {
        self.skipped + self.failed_in_flight
    }

    /// Records that were actually sent to the server
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed_in_flight
    }

    pub fn is_total_failure(&self) -> bool {
        self.requested > 0 && self.failed() == self.requested
    }

    pub fn is_partial_failure(&self) -> bool {
        self.failed() > 0 && self.failed() < self.requested
    }
}

/// Driver error with the server payload and call-site context preserved
#[derive(Debug, Clone)]
pub struct ArcadeError {
    kind: ErrorKind,
    message: String,
    exception: String,
    detail: String,
    payload: Value,
    query: Option<String>,
    session_id: Option<String>,
    idempotency_violation: bool,
    counts: Option<BulkCounts>,
    dimensions: Option<usize>,
    database: Option<String>,
    type_name: Option<String>,
    cause: Option<Box<ArcadeError>>,
}

impl ArcadeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            exception: String::new(),
            detail: String::new(),
            payload: Value::Null,
            query: None,
            session_id: None,
            idempotency_violation: false,
            counts: None,
            dimensions: None,
            database: None,
            type_name: None,
            cause: None,
        }
    }

    /// Client-side precondition failure
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, reason)
    }

    /// Transport failure with no server response
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, reason)
    }

    pub fn transaction(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, reason)
    }

    pub fn database(reason: impl Into<String>, database: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::Database, reason);
        err.database = Some(database.into());
        err
    }

    pub fn bulk(reason: impl Into<String>, counts: BulkCounts) -> Self {
        let mut err = Self::new(ErrorKind::BulkOperation, reason);
        err.counts = Some(counts);
        err
    }

    pub fn vector(reason: impl Into<String>, dimensions: Option<usize>) -> Self {
        let mut err = Self::new(ErrorKind::VectorOperation, reason);
        err.dimensions = dimensions;
        err
    }

    pub(crate) fn with_server_fields(
        mut self,
        exception: impl Into<String>,
        detail: impl Into<String>,
        payload: Value,
    ) -> Self {
        self.exception = exception.into();
        self.detail = detail.into();
        self.payload = payload;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_idempotency_violation(mut self, flag: bool) -> Self {
        self.idempotency_violation = flag;
        self
    }

    /// Chain the error that triggered this one
    pub fn with_cause(mut self, cause: ArcadeError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Server-reported exception type name, empty for client-side errors
    pub fn exception(&self) -> &str {
        &self.exception
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// The server error payload exactly as received
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn counts(&self) -> Option<BulkCounts> {
        self.counts
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn database_name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn cause(&self) -> Option<&ArcadeError> {
        self.cause.as_deref()
    }

    /// A read-form submission the server rejected because it mutates
    pub fn is_idempotency_violation(&self) -> bool {
        self.kind == ErrorKind::Transaction && self.idempotency_violation
    }

    /// Server-side chunk rejections worth resending that one chunk for.
    ///
    /// Connection failures are excluded: the chunk may have been applied.
    pub fn is_retryable_chunk_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::Transaction | ErrorKind::Unknown)
    }

    /// The server could not be reached or refused the credentials; no
    /// fallback or per-item recovery can help
    pub fn is_access_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::Connection | ErrorKind::Authentication)
    }
}

impl fmt::Display for ArcadeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        if let Some(counts) = &self.counts {
            write!(
                f,
                " ({}/{} records failed)",
                counts.failed(),
                counts.requested
            )?;
        }
        if self.kind == ErrorKind::QueryParsing {
            if let Some(query) = &self.query {
                write!(f, "\nQuery: {}", query)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ArcadeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Result type for driver operations
pub type ArcadeResult<T> = Result<T, ArcadeError>;
