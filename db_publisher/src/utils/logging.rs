//! Logging utilities for db_publisher
//!
//! Diagnostics go to stderr; stdout is reserved for the diff script.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogFormat;
use crate::error::{Error, Result};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "db_publisher=debug"
    } else {
        "db_publisher=warn"
    }
}

/// Initialize logging. `RUST_LOG` overrides the level chosen by `debug`.
pub fn init_logging(debug: bool, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
    };

    result.map_err(|e| Error::Configuration(format!("Failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(true), "db_publisher=debug");
        assert_eq!(default_filter(false), "db_publisher=warn");
    }
}
