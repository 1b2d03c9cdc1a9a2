//! CLI argument definitions using clap
//!
//! Commands:
//! - arcadedb-cli check --config <path>
//! - arcadedb-cli query --config <path> --database <db>
//! - arcadedb-cli command --config <path> --database <db>
//! - arcadedb-cli transaction --config <path> --database <db>
//! - arcadedb-cli bulk-insert --config <path> --database <db> --type <T>
//! - arcadedb-cli vector-search --config <path> --database <db>
//! - arcadedb-cli databases list|create|drop --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// arcadedb-cli - resilient command-line access to an ArcadeDB server
#[derive(Parser, Debug)]
#[command(name = "arcadedb-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./arcadedb.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify the server is reachable and the credentials are accepted
    Check,

    /// Run one query read from stdin as a JSON object
    Query {
        /// Target database
        #[arg(long)]
        database: String,
    },

    /// Run one command read from stdin as a JSON object
    Command {
        /// Target database
        #[arg(long)]
        database: String,
    },

    /// Run the statements on stdin, one per line, in one transaction
    Transaction {
        /// Target database
        #[arg(long)]
        database: String,

        /// READ_COMMITTED or REPEATABLE_READ
        #[arg(long, default_value = "READ_COMMITTED")]
        isolation: String,
    },

    /// Insert the JSON array of records on stdin
    BulkInsert {
        /// Target database
        #[arg(long)]
        database: String,

        /// Type to insert into
        #[arg(long = "type")]
        type_name: String,

        /// Records per chunk
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,

        /// Resend a rejected chunk up to this many times
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },

    /// Run the vector search (object) or searches (array) on stdin
    VectorSearch {
        /// Target database
        #[arg(long)]
        database: String,
    },

    /// Manage databases
    Databases {
        #[command(subcommand)]
        action: DatabaseAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum DatabaseAction {
    /// List database names
    List,

    /// Create a database
    Create {
        /// Database name
        name: String,
    },

    /// Drop a database
    Drop {
        /// Database name
        name: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
