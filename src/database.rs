//! # Database handle
//!
//! Owns the transport, the database name and the endpoint table, and hands
//! out the components that work against that database. Components borrow
//! the handle, so they are cheap to create per call.

use std::fmt;

use serde_json::Value;

use crate::bulk::BulkExecutor;
use crate::config::Endpoints;
use crate::error::{ArcadeError, ArcadeResult};
use crate::fallback::{RecordFetcher, TripletFetcher, VectorOps};
use crate::query::{Dispatcher, QueryRequest};
use crate::server;
use crate::transaction::{Session, TransactionManager};
use crate::transport::Transport;

/// One database on one server
#[derive(Debug)]
pub struct Database<T: Transport> {
    transport: T,
    name: String,
    endpoints: Endpoints,
}

impl<T: Transport> Database<T> {
    /// Open an existing database
    pub fn open(transport: T, endpoints: Endpoints, name: impl Into<String>) -> ArcadeResult<Self> {
        let name = name.into();
        if !server::exists(&transport, &endpoints, &name)? {
            return Err(ArcadeError::database(
                format!("Database {} does not exist, create it first", name),
                name,
            ));
        }
        Ok(Self::attach(transport, endpoints, name))
    }

    /// Create the database, then open it
    pub fn create(transport: T, endpoints: Endpoints, name: impl Into<String>) -> ArcadeResult<Self> {
        let name = name.into();
        server::create_database(&transport, &endpoints, &name)?;
        Ok(Self::attach(transport, endpoints, name))
    }

    /// Wrap a database without checking that it exists
    pub fn attach(transport: T, endpoints: Endpoints, name: impl Into<String>) -> Self {
        Self {
            transport,
            name: name.into(),
            endpoints,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.transport, &self.name, &self.endpoints)
    }

    /// Execute one query or command
    pub fn query(&self, request: &QueryRequest, session: Option<&Session>) -> ArcadeResult<Value> {
        self.dispatcher().execute(request, session)
    }

    pub fn transactions(&self) -> TransactionManager<'_> {
        TransactionManager::new(self.dispatcher())
    }

    pub fn bulk(&self) -> BulkExecutor<'_> {
        BulkExecutor::new(self.dispatcher())
    }

    pub fn records(&self) -> RecordFetcher<'_> {
        RecordFetcher::new(self.dispatcher())
    }

    pub fn triplets(&self) -> TripletFetcher<'_> {
        TripletFetcher::new(self.dispatcher())
    }

    pub fn vectors(&self) -> VectorOps<'_> {
        VectorOps::new(self.dispatcher())
    }
}

impl<T: Transport> fmt::Display for Database<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Database name={}>", self.name)
    }
}
