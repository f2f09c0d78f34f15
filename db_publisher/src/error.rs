//! Error types for db_publisher

use std::path::PathBuf;

use thiserror::Error;

use crate::db::lifecycle::DatabaseState;

/// Result type for db_publisher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for db_publisher
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to create database {database}: {source}")]
    DatabaseCreation {
        database: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to apply {}: {source}", .file.display())]
    SchemaApply {
        file: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Diff tool error: {0}")]
    DiffTool(String),

    /// Only ever logged; dropping the disposable database is best-effort.
    #[error("Failed to drop database {database}: {source}")]
    Drop {
        database: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid database state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: DatabaseState,
        to: DatabaseState,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn database_creation(database: impl Into<String>, source: Error) -> Self {
        Error::DatabaseCreation {
            database: database.into(),
            source: Box::new(source),
        }
    }

    pub fn schema_apply(file: impl Into<PathBuf>, source: Error) -> Self {
        Error::SchemaApply {
            file: file.into(),
            source: Box::new(source),
        }
    }

    pub fn drop_failed(database: impl Into<String>, source: Error) -> Self {
        Error::Drop {
            database: database.into(),
            source: Box::new(source),
        }
    }
}

/// Convert TOML deserialization errors to configuration errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Configuration(error.to_string())
    }
}
