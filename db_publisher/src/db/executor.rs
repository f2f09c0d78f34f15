//! Schema applier
//!
//! Runs ordered schema files against the disposable database, one at a time.

use crate::db::connection::SqlConnection;
use crate::error::{Error, Result};
use crate::schema::SchemaFile;

/// Applies schema files in the order given
pub struct SchemaApplier<'a, C: SqlConnection> {
    connection: &'a mut C,
}

impl<'a, C: SqlConnection> SchemaApplier<'a, C> {
    pub fn new(connection: &'a mut C) -> Self {
        Self { connection }
    }

    /// Execute each file's original text as one batch, stopping at the first failure
    pub async fn apply(&mut self, files: &[SchemaFile]) -> Result<()> {
        tracing::debug!(files = files.len(), "Applying sql files");

        for file in files {
            tracing::debug!(file = %file.path.display(), "Applying to temp database");
            self.connection
                .execute(&file.sql)
                .await
                .map_err(|e| Error::schema_apply(&file.path, e))?;
        }

        Ok(())
    }
}
