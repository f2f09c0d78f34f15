//! Schema module for db_publisher
//!
//! This module discovers and orders schema files.

pub mod orderer;

// Re-export key types
pub use orderer::{SchemaFile, SchemaFileOrderer};
