//! In-memory transport for tests and dry runs
//!
//! Replies are served from a queue in the order they were pushed, and every
//! call is recorded so tests can assert on endpoints, payloads and headers.
//! An exhausted queue answers with a null result.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{Headers, Reply, Transport, TransportError, TransportKind, TransportResult, SESSION_HEADER};

/// HTTP method of a recorded call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One call made against a [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: String,
    pub payload: Value,
    pub headers: Headers,
}

impl RecordedCall {
    /// The `command` member of the payload, if any
    pub fn command(&self) -> Option<&str> {
        self.payload.get("command").and_then(Value::as_str)
    }

    /// Session token header, if any
    pub fn session(&self) -> Option<&str> {
        self.headers.get(SESSION_HEADER).map(String::as_str)
    }
}

/// Queue-driven transport
#[derive(Debug)]
pub struct ScriptedTransport {
    kind: TransportKind,
    replies: Mutex<VecDeque<TransportResult<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::with_kind(TransportKind::Http)
    }

    pub fn with_kind(kind: TransportKind) -> Self {
        Self {
            kind,
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: Reply) -> &Self {
        locked(&self.replies).push_back(Ok(reply));
        self
    }

    pub fn push_ok(&self, result: Value) -> &Self {
        self.push_reply(Reply::new(result))
    }

    /// Queue a server error payload
    pub fn push_server_error(&self, payload: Value) -> &Self {
        self.push_error(TransportError::Server(payload))
    }

    pub fn push_error(&self, err: TransportError) -> &Self {
        locked(&self.replies).push_back(Err(err));
        self
    }

    /// Replies not consumed yet
    pub fn pending(&self) -> usize {
        locked(&self.replies).len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        locked(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    /// Commands of all recorded calls, in order
    pub fn commands(&self) -> Vec<String> {
        locked(&self.calls)
            .iter()
            .filter_map(|call| call.command().map(str::to_string))
            .collect()
    }

    fn record(&self, call: RecordedCall) -> TransportResult<Reply> {
        locked(&self.calls).push(call);
        locked(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Ok(Reply::default()))
    }
}

impl Transport for ScriptedTransport {
    fn post(&self, endpoint: &str, payload: &Value, headers: &Headers) -> TransportResult<Reply> {
        self.record(RecordedCall {
            method: Method::Post,
            endpoint: endpoint.to_string(),
            payload: payload.clone(),
            headers: headers.clone(),
        })
    }

    fn get(&self, endpoint: &str, headers: &Headers) -> TransportResult<Reply> {
        self.record(RecordedCall {
            method: Method::Get,
            endpoint: endpoint.to_string(),
            payload: Value::Null,
            headers: headers.clone(),
        })
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }
}
