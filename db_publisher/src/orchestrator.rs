//! Publish orchestration
//!
//! Sequences one run: order files, create the disposable database, apply, diff, drop,
//! and optionally save the diff as a publish file.

use chrono::Utc;
use std::path::PathBuf;

use crate::config::Config;
use crate::db::{
    DatabaseLifecycleManager, DatabaseServer, DatabaseState, DisposableDatabase, SchemaApplier,
    SqlConnection,
};
use crate::diff::{DiffOrchestrator, DiffTool};
use crate::error::Result;
use crate::publish::PublishFileWriter;
use crate::schema::{SchemaFile, SchemaFileOrderer};

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Diff script; empty when the databases already match
    pub diff: String,
    pub publish_file: Option<PathBuf>,
    pub temp_database: String,
    /// False when the disposable database was kept or could not be dropped
    pub dropped: bool,
}

/// Drives a publish run against a database server and a diff tool
pub struct Orchestrator<S: DatabaseServer, D: DiffTool> {
    config: Config,
    server: S,
    diff_tool: D,
    orderer: SchemaFileOrderer,
}

impl<S: DatabaseServer, D: DiffTool> Orchestrator<S, D> {
    pub fn new(config: Config, server: S, diff_tool: D) -> Self {
        Self {
            config,
            server,
            diff_tool,
            orderer: SchemaFileOrderer::new(),
        }
    }

    pub fn with_orderer(mut self, orderer: SchemaFileOrderer) -> Self {
        self.orderer = orderer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole publish
    pub async fn run(&self) -> Result<PublishOutcome> {
        let files = self.orderer.order(&self.config.schema_directory)?;

        let lifecycle = DatabaseLifecycleManager::new(&self.server);
        let name = DisposableDatabase::name_for(self.config.target_database(), Utc::now())?;
        let mut database = lifecycle.create(&self.config.temp, &name).await?;

        let result = self.populate_and_diff(&mut database, &files).await;

        let dropped = if self.config.do_not_drop {
            tracing::info!(database = database.name(), "Keeping temp database");
            false
        } else {
            lifecycle.drop_database(&mut database).await
        };

        let diff = result?;

        let publish_file = if self.config.generate_publish_file {
            let writer =
                PublishFileWriter::new(&self.config.output_directory, self.config.target_database());
            Some(writer.write(&diff)?)
        } else {
            None
        };

        Ok(PublishOutcome {
            diff,
            publish_file,
            temp_database: database.name().to_string(),
            dropped,
        })
    }

    async fn populate_and_diff(
        &self,
        database: &mut DisposableDatabase,
        files: &[SchemaFile],
    ) -> Result<String> {
        let mut connection = self.server.open(database.descriptor()).await?;
        SchemaApplier::new(&mut connection).apply(files).await?;
        connection.close().await?;
        database.advance(DatabaseState::Populated)?;

        let diff = DiffOrchestrator::new(&self.diff_tool)
            .diff(database.descriptor(), &self.config.target)
            .await?;
        database.advance(DatabaseState::Diffed)?;

        Ok(diff)
    }
}
