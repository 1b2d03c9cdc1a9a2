//! Caller-held transaction sessions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ArcadeError, ArcadeResult};

/// Transaction isolation level requested at begin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
}

impl IsolationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ_COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE_READ",
        }
    }

    /// Accepts `READ_COMMITTED`, `read-committed` and similar spellings
    pub fn parse(name: &str) -> ArcadeResult<Self> {
        match name.trim().to_uppercase().replace('-', "_").as_str() {
            "READ_COMMITTED" => Ok(IsolationLevel::ReadCommitted),
            "REPEATABLE_READ" => Ok(IsolationLevel::RepeatableRead),
            other => Err(ArcadeError::validation(format!(
                "Unknown isolation level {}. Expected READ_COMMITTED or REPEATABLE_READ",
                other
            ))),
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Committed,
    RolledBack,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Open)
    }
}

/// One open transaction.
///
/// The token is issued by the server and owned by the caller; the driver
/// keeps no registry of sessions. Once committed or rolled back a session
/// is rejected before any request is made with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    isolation: IsolationLevel,
    state: SessionState,
}

impl Session {
    /// Wrap a token the server issued
    pub fn new(token: impl Into<String>, isolation: IsolationLevel) -> Self {
        Self {
            token: token.into(),
            isolation,
            state: SessionState::Open,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn ensure_open(&self) -> ArcadeResult<()> {
        let finished = match self.state {
            SessionState::Open => return Ok(()),
            SessionState::Committed => "committed",
            SessionState::RolledBack => "rolled back",
        };
        Err(ArcadeError::validation(format!(
            "Session {} is already {}",
            self.token, finished
        ))
        .with_session(self.token.clone()))
    }

    pub(crate) fn finish(&mut self, state: SessionState) {
        self.state = state;
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<session {} {}>", self.token, self.isolation)
    }
}
