//! db_publisher: publishes a directory of SQL schema files into a disposable database
//!
//! The schema files are applied in a dependency-aware order to a freshly created
//! temporary database, which is then diffed against a persistent target database by an
//! external tool. The diff can be saved as a versioned publish script before the
//! temporary database is dropped.

pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod orchestrator;
pub mod publish;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::{Config, ConfigLayer, ConnectionDescriptor};
pub use db::{DatabaseLifecycleManager, DatabaseServer, DisposableDatabase, PgServer};
pub use diff::{DiffTool, MigraDiffTool};
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, PublishOutcome};
pub use publish::PublishFileWriter;
pub use schema::{SchemaFile, SchemaFileOrderer};

/// Publish with the real PostgreSQL server and the configured diff tool
pub async fn publish(config: Config) -> Result<PublishOutcome> {
    let diff_tool = MigraDiffTool::new(&config.diff_tool, config.diff_timeout);
    Orchestrator::new(config, PgServer, diff_tool).run().await
}
