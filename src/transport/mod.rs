//! Transport layer
//!
//! The driver reaches the server through two primitives, `post` and `get`.
//! Everything above this module is written against the [`Transport`] trait so
//! the HTTP client can be swapped for the scripted one in tests.
//!
//! # Failure shapes
//!
//! - `Server`: the server answered with an error payload, to be classified
//! - `Unreachable`: the request never left the client, safe to resend
//! - `Interrupted`: the request may have reached the server, never resent here

mod http;
mod redact;
mod retry;
mod scripted;

pub use http::{decode_body, join_url, HttpTransport};
pub use redact::redact_payload;
pub use retry::{RetryPolicy, RetryingTransport};
pub use scripted::{Method, RecordedCall, ScriptedTransport};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::error::{classify, ArcadeError};

/// Header carrying the transaction session token
pub const SESSION_HEADER: &str = "arcadedb-session-id";

/// Extra request headers, or response headers with lower-cased names
pub type Headers = BTreeMap<String, String>;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// A successful response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    /// Decoded result value
    pub result: Value,
    /// Response headers
    pub headers: Headers,
}

impl Reply {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            headers: Headers::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// What kind of backend sits behind a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The HTTP API; supports serializers and session headers
    Http,
    /// A wire-protocol backend without HTTP-only request options
    Wire,
}

/// Transport failures
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The server answered with an error payload
    #[error("server error: {0}")]
    Server(Value),

    /// Connection could not be established; nothing was sent
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// The exchange broke after the request may have been sent
    #[error("request interrupted: {0}")]
    Interrupted(String),

    /// The request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Only requests that provably never reached the server are resent
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Unreachable(_))
    }

    /// Convert into a driver error, classifying server payloads
    pub fn into_classified(self, query: Option<&str>) -> ArcadeError {
        match self {
            TransportError::Server(payload) => classify(&payload, query),
            TransportError::InvalidRequest(reason) => ArcadeError::validation(reason),
            other => ArcadeError::connection(other.to_string()),
        }
    }
}

impl From<TransportError> for ArcadeError {
    fn from(err: TransportError) -> Self {
        err.into_classified(None)
    }
}

/// Request/response primitives
pub trait Transport: Send + Sync {
    /// POST a JSON payload
    fn post(&self, endpoint: &str, payload: &Value, headers: &Headers) -> TransportResult<Reply>;

    /// GET an endpoint
    fn get(&self, endpoint: &str, headers: &Headers) -> TransportResult<Reply>;

    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, endpoint: &str, payload: &Value, headers: &Headers) -> TransportResult<Reply> {
        (**self).post(endpoint, payload, headers)
    }

    fn get(&self, endpoint: &str, headers: &Headers) -> TransportResult<Reply> {
        (**self).get(endpoint, headers)
    }

    fn kind(&self) -> TransportKind {
        (**self).kind()
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post(&self, endpoint: &str, payload: &Value, headers: &Headers) -> TransportResult<Reply> {
        (**self).post(endpoint, payload, headers)
    }

    fn get(&self, endpoint: &str, headers: &Headers) -> TransportResult<Reply> {
        (**self).get(endpoint, headers)
    }

    fn kind(&self) -> TransportKind {
        (**self).kind()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, endpoint: &str, payload: &Value, headers: &Headers) -> TransportResult<Reply> {
        (**self).post(endpoint, payload, headers)
    }

    fn get(&self, endpoint: &str, headers: &Headers) -> TransportResult<Reply> {
        (**self).get(endpoint, headers)
    }

    fn kind(&self) -> TransportKind {
        (**self).kind()
    }
}
