//! Utilities for db_publisher

pub mod logging;

pub use logging::init_logging;
