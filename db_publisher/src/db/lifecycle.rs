//! Disposable database lifecycle
//!
//! Creates the uniquely named temporary database and drops it again. Creation errors
//! are fatal; drop errors are only ever logged.

use chrono::{DateTime, Utc};

use crate::config::{ConnectionDescriptor, ADMIN_DATABASE};
use crate::db::connection::{DatabaseServer, SqlConnection};
use crate::error::{Error, Result};

/// Where a disposable database is in its life. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatabaseState {
    Unborn,
    Created,
    Populated,
    Diffed,
    Dropped,
}

/// A temporary database owned by one publish run
#[derive(Debug, Clone)]
pub struct DisposableDatabase {
    name: String,
    descriptor: ConnectionDescriptor,
    state: DatabaseState,
}

impl DisposableDatabase {
    /// `{target}_{yyyyMMddHHmmss}_temp`, lowercased
    pub fn name_for(target_database: &str, now: DateTime<Utc>) -> Result<String> {
        let name = format!("{}_{}_temp", target_database, now.format("%Y%m%d%H%M%S")).to_lowercase();
        // The suffix keeps generated names distinct; this guards the format itself.
        Self::ensure_distinct(&name, target_database)?;
        Ok(name)
    }

    /// Fail if `name` would address the target database. Postgres folds unquoted
    /// identifiers to lowercase, so the comparison ignores case.
    pub fn ensure_distinct(name: &str, target_database: &str) -> Result<()> {
        if name.eq_ignore_ascii_case(target_database) {
            return Err(Error::Configuration(format!(
                "Temporary database name {} collides with the target database",
                name
            )));
        }
        Ok(())
    }

    fn unborn(server: &ConnectionDescriptor, name: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: server.with_database(name).without_pooling(),
            state: DatabaseState::Unborn,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connection details bound to this database, with pooling disabled
    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> DatabaseState {
        self.state
    }

    /// Move to `next`, which must come after the current state
    pub fn advance(&mut self, next: DatabaseState) -> Result<()> {
        if next <= self.state {
            return Err(Error::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(database = %self.name, from = ?self.state, to = ?next, "State transition");
        self.state = next;
        Ok(())
    }
}

/// Creates and drops disposable databases on a server
pub struct DatabaseLifecycleManager<'a, S: DatabaseServer> {
    server: &'a S,
}

impl<'a, S: DatabaseServer> DatabaseLifecycleManager<'a, S> {
    pub fn new(server: &'a S) -> Self {
        Self { server }
    }

    /// Create `name` on the server described by `server_descriptor`.
    ///
    /// The statement runs over an administrative connection; the returned database
    /// carries its own descriptor bound to `name`.
    pub async fn create(
        &self,
        server_descriptor: &ConnectionDescriptor,
        name: &str,
    ) -> Result<DisposableDatabase> {
        let mut database = DisposableDatabase::unborn(server_descriptor, name);

        tracing::debug!(database = name, "Creating temp database");
        self.run_admin(server_descriptor, &format!("CREATE DATABASE {};", name))
            .await
            .map_err(|e| Error::database_creation(name, e))?;

        database.advance(DatabaseState::Created)?;
        Ok(database)
    }

    /// Drop the database, best-effort. Returns whether it was dropped.
    ///
    /// Errors never propagate: teardown must not replace the outcome of the run.
    pub async fn drop_database(&self, database: &mut DisposableDatabase) -> bool {
        match self.try_drop(database).await {
            Ok(()) => {
                tracing::debug!(database = database.name(), "Dropped temp database");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Temp database was not dropped");
                false
            }
        }
    }

    async fn try_drop(&self, database: &mut DisposableDatabase) -> Result<()> {
        if database.state() == DatabaseState::Dropped {
            return Ok(());
        }

        tracing::debug!(database = database.name(), "Dropping temp database");
        self.run_admin(database.descriptor(), &format!("DROP DATABASE {};", database.name()))
            .await
            .map_err(|e| Error::drop_failed(database.name(), e))?;

        database.advance(DatabaseState::Dropped)
    }

    /// Run one statement against the always-present administrative database
    async fn run_admin(&self, descriptor: &ConnectionDescriptor, sql: &str) -> Result<()> {
        let admin = descriptor.with_database(ADMIN_DATABASE).without_pooling();
        let mut connection = self.server.open(&admin).await?;
        connection.execute(sql).await?;
        connection.close().await
    }
}
