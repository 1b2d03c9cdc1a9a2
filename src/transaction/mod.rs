//! # Transactions
//!
//! Sessions are plain values threaded through every call by the caller.
//! The manager issues them and moves them to a terminal state; it never
//! keeps a token after returning it.

mod manager;
mod session;

pub use manager::TransactionManager;
pub use session::{IsolationLevel, Session, SessionState};
