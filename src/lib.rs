//! arcadedb-driver - resilient access layer for ArcadeDB
//!
//! Sits between application code and the server's HTTP API and adds what
//! the raw API lacks:
//! - classified, context-carrying errors
//! - explicit transaction sessions with guaranteed rollback
//! - chunked bulk writes with exact failure accounting
//! - fallback chains for multi-type, triplet and vector queries

pub mod bulk;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod fallback;
pub mod query;
pub mod server;
pub mod transaction;
pub mod transport;

pub use config::{ClientConfig, ConfigError, Endpoints, RetryConfig};
pub use database::Database;
pub use error::{ArcadeError, ArcadeResult, BulkCounts, ErrorKind};
pub use query::{Dispatcher, Language, QueryRequest};
pub use transaction::{IsolationLevel, Session, SessionState, TransactionManager};
pub use transport::{HttpTransport, RetryPolicy, RetryingTransport, Transport, TransportError};
