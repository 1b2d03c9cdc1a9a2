//! CLI command implementations
//!
//! Each command loads the configuration, builds a retrying HTTP transport,
//! runs one driver operation and writes a single JSON response to stdout.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{ClientConfig, Endpoints};
use crate::database::Database;
use crate::fallback::VectorSearchSpec;
use crate::query::QueryRequest;
use crate::server;
use crate::transaction::IsolationLevel;
use crate::transport::{HttpTransport, RetryPolicy, RetryingTransport};

use super::args::{Cli, Command, DatabaseAction};
use super::errors::{CliError, CliResult};
use super::io::{read_request, read_statements, write_error, write_response};

type CliTransport = RetryingTransport<HttpTransport>;

/// A query or command as read from stdin
#[derive(Debug, Clone, Deserialize)]
pub struct QueryInput {
    #[serde(default = "default_language")]
    pub language: String,
    pub command: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub serializer: Option<String>,
}

fn default_language() -> String {
    "sql".to_string()
}

impl QueryInput {
    pub fn into_request(self, is_command: bool) -> QueryRequest {
        let mut request = QueryRequest::new(self.language, self.command);
        request.limit = self.limit;
        request.params = self.params;
        request.serializer = self.serializer;
        if is_command {
            request = request.as_command();
        }
        request
    }
}

/// Connection pieces shared by every command
struct Connection {
    transport: CliTransport,
    endpoints: Endpoints,
    bulk_delay: Duration,
}

fn connect(config_path: &Path) -> CliResult<Connection> {
    let config = ClientConfig::load(config_path)?.with_env_overrides()?;
    let endpoints = config.endpoints();
    let policy = RetryPolicy::from(&config.retry);
    let bulk_delay = Duration::from_millis(config.retry.delay_ms);
    tracing::debug!(config = %config, "connecting");

    let transport = RetryingTransport::new(HttpTransport::new(config)?, policy);
    Ok(Connection {
        transport,
        endpoints,
        bulk_delay,
    })
}

fn open_database(connection: Connection, name: &str) -> CliResult<(Database<CliTransport>, Duration)> {
    let bulk_delay = connection.bulk_delay;
    let db = Database::open(connection.transport, connection.endpoints, name)?;
    Ok((db, bulk_delay))
}

/// Run the CLI with parsed arguments
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match run_command(cli) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Best effort: the error is also returned to the caller
            let _ = write_error(e.code_str(), e.message());
            Err(e)
        }
    }
}

/// Run a specific command
pub fn run_command(cli: Cli) -> CliResult<()> {
    let connection = connect(&cli.config)?;

    match cli.command {
        Command::Check => check(connection),
        Command::Query { database } => query(connection, &database, false),
        Command::Command { database } => query(connection, &database, true),
        Command::Transaction {
            database,
            isolation,
        } => transaction(connection, &database, &isolation),
        Command::BulkInsert {
            database,
            type_name,
            batch_size,
            retries,
        } => bulk_insert(connection, &database, &type_name, batch_size, retries),
        Command::VectorSearch { database } => vector_search(connection, &database),
        Command::Databases { action } => databases(connection, action),
    }
}

fn check(connection: Connection) -> CliResult<()> {
    server::check_connection(&connection.transport, &connection.endpoints)?;
    write_response(json!({ "connected": true }))
}

fn query(connection: Connection, database: &str, is_command: bool) -> CliResult<()> {
    let input: QueryInput = serde_json::from_value(read_request()?)?;
    let (db, _) = open_database(connection, database)?;
    let result = db.query(&input.into_request(is_command), None)?;
    write_response(result)
}

fn transaction(connection: Connection, database: &str, isolation: &str) -> CliResult<()> {
    let isolation = IsolationLevel::parse(isolation)?;
    let statements = read_statements()?;
    let (db, _) = open_database(connection, database)?;
    let results = db
        .transactions()
        .execute_transaction(&statements, isolation)?;
    write_response(Value::Array(results))
}

fn bulk_insert(
    connection: Connection,
    database: &str,
    type_name: &str,
    batch_size: usize,
    retries: u32,
) -> CliResult<()> {
    let records = match read_request()? {
        Value::Array(records) => records,
        _ => {
            return Err(CliError::invalid_input(
                "bulk-insert expects a JSON array of records",
            ))
        }
    };
    let (db, bulk_delay) = open_database(connection, database)?;

    let mut bulk = db.bulk().with_batch_size(batch_size);
    if retries > 0 {
        bulk = bulk.with_chunk_retry(RetryPolicy::for_bulk(retries, bulk_delay));
    }
    let inserted = bulk.insert(type_name, &records, None)?;
    write_response(json!({ "inserted": inserted, "requested": records.len() }))
}

fn vector_search(connection: Connection, database: &str) -> CliResult<()> {
    let input = read_request()?;
    let (db, _) = open_database(connection, database)?;
    let vectors = db.vectors();

    let result = match input {
        Value::Array(searches) => {
            let results = vectors.batch_search(&searches, None)?;
            json!(results)
        }
        single => {
            let spec: VectorSearchSpec = serde_json::from_value(single)?;
            let search = spec.build()?;
            Value::Array(vectors.search(&search, None)?)
        }
    };
    write_response(result)
}

fn databases(connection: Connection, action: DatabaseAction) -> CliResult<()> {
    let transport = &connection.transport;
    let endpoints = &connection.endpoints;

    match action {
        DatabaseAction::List => {
            let names = server::list_databases(transport, endpoints)?;
            write_response(json!(names))
        }
        DatabaseAction::Create { name } => {
            server::create_database(transport, endpoints, &name)?;
            write_response(json!({ "created": name }))
        }
        DatabaseAction::Drop { name } => {
            server::drop_database(transport, endpoints, &name)?;
            write_response(json!({ "dropped": name }))
        }
    }
}
