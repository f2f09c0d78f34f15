//! Database connection handling
//!
//! This module provides scoped connections to a PostgreSQL server. The traits exist so
//! the lifecycle and orchestration code can run against an in-memory server in tests.

use async_trait::async_trait;
use sqlx::{postgres::PgConnectOptions, ConnectOptions, Connection, Executor, PgConnection};

use crate::config::ConnectionDescriptor;
use crate::error::Result;

/// A server that connections can be opened against
#[async_trait]
pub trait DatabaseServer: Send + Sync {
    type Connection: SqlConnection;

    /// Open a connection to the database named by the descriptor
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Self::Connection>;
}

/// An open connection. Dropping it without `close` still releases it.
#[async_trait]
pub trait SqlConnection: Send {
    /// Execute one batch of SQL, which may hold several statements
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Close the connection, waiting for the server to acknowledge
    async fn close(self) -> Result<()>;
}

/// PostgreSQL server reached through sqlx
#[derive(Debug, Clone, Copy, Default)]
pub struct PgServer;

#[async_trait]
impl DatabaseServer for PgServer {
    type Connection = DatabaseConnection;

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<DatabaseConnection> {
        DatabaseConnection::connect(descriptor).await
    }
}

/// A live PostgreSQL connection
///
/// Always a single unpooled connection, so closing it leaves nothing holding the
/// database open before it is dropped.
#[derive(Debug)]
pub struct DatabaseConnection {
    connection: PgConnection,
}

impl DatabaseConnection {
    /// Create a new database connection from a descriptor
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let connection = connect_options(descriptor).connect().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl SqlConnection for DatabaseConnection {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        // A plain &str runs over the simple query protocol, so multi-statement batches work.
        self.connection.execute(sql).await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.connection.close().await?;
        Ok(())
    }
}

fn connect_options(descriptor: &ConnectionDescriptor) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&descriptor.host)
        .port(descriptor.port)
        .application_name("db_publisher");
    if !descriptor.username.is_empty() {
        options = options.username(&descriptor.username);
    }
    if !descriptor.password.is_empty() {
        options = options.password(&descriptor.password);
    }
    if let Some(database) = &descriptor.database {
        options = options.database(database);
    }
    options
}
