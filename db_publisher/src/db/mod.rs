//! Database module for db_publisher
//!
//! This module handles connections, the disposable database lifecycle, and applying
//! schema files.

pub mod connection;
pub mod executor;
pub mod lifecycle;

// Re-export key types
pub use connection::{DatabaseConnection, DatabaseServer, PgServer, SqlConnection};
pub use executor::SchemaApplier;
pub use lifecycle::{DatabaseLifecycleManager, DatabaseState, DisposableDatabase};
