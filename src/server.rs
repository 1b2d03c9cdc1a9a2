//! # Server-level operations
//!
//! Database existence, listing, creation and removal, plus a connection
//! check. These talk to the server endpoints rather than a database.

use serde_json::{json, Value};

use crate::config::Endpoints;
use crate::error::{ArcadeError, ArcadeResult, ErrorKind};
use crate::query::into_rows;
use crate::transport::{Headers, Transport};

fn validate_name(name: &str) -> ArcadeResult<()> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ArcadeError::validation(format!(
            "Invalid database name: '{}'",
            name
        )));
    }
    Ok(())
}

fn server_command(
    transport: &dyn Transport,
    endpoints: &Endpoints,
    command: &str,
) -> ArcadeResult<Value> {
    transport
        .post(&endpoints.server(), &json!({ "command": command }), &Headers::new())
        .map(|reply| reply.result)
        .map_err(|err| err.into_classified(None))
}

/// Whether the database exists
pub fn exists(transport: &dyn Transport, endpoints: &Endpoints, name: &str) -> ArcadeResult<bool> {
    validate_name(name)?;
    let reply = transport
        .get(&endpoints.exists(name), &Headers::new())
        .map_err(|err| err.into_classified(None))?;
    match reply.result {
        Value::Bool(found) => Ok(found),
        other => Err(ArcadeError::database(
            format!("Unexpected response to exists check: {}", other),
            name,
        )),
    }
}

/// Names of all databases visible to the user
pub fn list_databases(transport: &dyn Transport, endpoints: &Endpoints) -> ArcadeResult<Vec<String>> {
    let reply = transport
        .get(&endpoints.databases(), &Headers::new())
        .map_err(|err| err.into_classified(None))?;
    Ok(into_rows(reply.result)
        .into_iter()
        .filter_map(|name| name.as_str().map(str::to_string))
        .collect())
}

/// Create a database; fails when it already exists
pub fn create_database(transport: &dyn Transport, endpoints: &Endpoints, name: &str) -> ArcadeResult<()> {
    if exists(transport, endpoints, name)? {
        return Err(ArcadeError::database(
            format!("Database {} already exists", name),
            name,
        ));
    }
    let result = server_command(transport, endpoints, &format!("create database {}", name))?;
    expect_ok(result, "create", name)?;
    tracing::info!(database = name, "database created");
    Ok(())
}

/// Drop a database; fails when it does not exist
pub fn drop_database(transport: &dyn Transport, endpoints: &Endpoints, name: &str) -> ArcadeResult<()> {
    if !exists(transport, endpoints, name)? {
        return Err(ArcadeError::database(
            format!("Database {} does not exist", name),
            name,
        ));
    }
    let result = server_command(transport, endpoints, &format!("drop database {}", name))?;
    expect_ok(result, "drop", name)?;
    tracing::info!(database = name, "database dropped");
    Ok(())
}

/// Verify the server is reachable and the credentials are accepted
pub fn check_connection(transport: &dyn Transport, endpoints: &Endpoints) -> ArcadeResult<()> {
    match server_command(transport, endpoints, "list databases") {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::Authentication => Err(err),
        Err(err) => Err(ArcadeError::connection("Unable to connect to server").with_cause(err)),
    }
}

fn expect_ok(result: Value, action: &str, name: &str) -> ArcadeResult<()> {
    if result.as_str() == Some("ok") {
        return Ok(());
    }
    Err(ArcadeError::database(
        format!("Could not {} database {}: {}", action, name, result),
        name,
    ))
}
