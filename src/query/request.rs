//! Query request types
//!
//! A [`QueryRequest`] carries the caller's raw options; validation into
//! [`Language`] and [`Serializer`] happens at dispatch time so that a bad
//! option fails before anything is sent.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ArcadeError, ArcadeResult};

/// Query languages the server accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Sql,
    SqlScript,
    GraphQl,
    Cypher,
    Gremlin,
    Mongo,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Sql,
        Language::SqlScript,
        Language::GraphQl,
        Language::Cypher,
        Language::Gremlin,
        Language::Mongo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Sql => "sql",
            Language::SqlScript => "sqlscript",
            Language::GraphQl => "graphql",
            Language::Cypher => "cypher",
            Language::Gremlin => "gremlin",
            Language::Mongo => "mongo",
        }
    }

    /// Parse a language name, case-insensitively
    pub fn parse(name: &str) -> ArcadeResult<Self> {
        let lowered = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|language| language.as_str() == lowered)
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::ALL.iter().map(Language::as_str).collect();
                ArcadeError::validation(format!(
                    "Language {} not supported. Available languages: {}",
                    lowered,
                    supported.join(", ")
                ))
            })
    }

    /// Pattern-matching language without server-side named parameters
    pub fn inlines_parameters(&self) -> bool {
        matches!(self, Language::Cypher)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result serializers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Serializer {
    Graph,
    Record,
}

impl Serializer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Serializer::Graph => "graph",
            Serializer::Record => "record",
        }
    }

    pub fn parse(name: &str) -> ArcadeResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "graph" => Ok(Serializer::Graph),
            "record" => Ok(Serializer::Record),
            _ => Err(ArcadeError::validation(
                "Serializer must be None, 'graph' or 'record'",
            )),
        }
    }
}

/// Body posted to the query and command endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub command: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serializer: Option<Serializer>,
}

impl QueryPayload {
    pub fn to_value(&self) -> ArcadeResult<Value> {
        serde_json::to_value(self)
            .map_err(|e| ArcadeError::validation(format!("Failed to encode payload: {}", e)))
    }
}

/// One logical query or command
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub language: String,
    pub command: String,
    pub limit: Option<i64>,
    pub params: Option<Value>,
    pub serializer: Option<String>,
    /// Route to the command endpoint
    pub is_command: bool,
    /// Resend to the command endpoint after an idempotency violation
    pub retry_on_idempotency_violation: bool,
}

impl QueryRequest {
    pub fn new(language: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            command: command.into(),
            limit: None,
            params: None,
            serializer: None,
            is_command: false,
            retry_on_idempotency_violation: true,
        }
    }

    pub fn sql(command: impl Into<String>) -> Self {
        Self::new(Language::Sql.as_str(), command)
    }

    pub fn cypher(command: impl Into<String>) -> Self {
        Self::new(Language::Cypher.as_str(), command)
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn serializer(mut self, serializer: impl Into<String>) -> Self {
        self.serializer = Some(serializer.into());
        self
    }

    /// Send to the command endpoint
    pub fn as_command(mut self) -> Self {
        self.is_command = true;
        self
    }

    pub fn without_idempotency_retry(mut self) -> Self {
        self.retry_on_idempotency_violation = false;
        self
    }

    /// Raw payload, without validation or parameter inlining
    pub fn payload(&self) -> QueryPayload {
        QueryPayload {
            command: self.command.clone(),
            language: self.language.clone(),
            limit: self.limit,
            params: self.params.clone(),
            serializer: None,
        }
    }
}
