//! CLI module for the ArcadeDB driver
//!
//! Provides command-line access to:
//! - check: connection and credential check
//! - query / command: one-shot execution from a JSON request on stdin
//! - transaction: atomic statement batch
//! - bulk-insert: chunked record insertion
//! - vector-search: single or batch similarity search
//! - databases: list, create, drop

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, DatabaseAction};
pub use commands::{run, run_command, QueryInput};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_request, parse_statements, write_error, write_response};
