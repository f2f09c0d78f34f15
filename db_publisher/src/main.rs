//! db_publisher CLI - publish SQL schema files and print the diff against a target database.

use anyhow::Context;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::io::Write;
use std::path::PathBuf;

use db_publisher::config::{self, Config, ConfigLayer};
use db_publisher::utils::init_logging;

/// Every option can also be given through an environment variable of the same name.
#[derive(Parser, Debug)]
#[command(name = "db_publisher")]
#[command(about = "Publish SQL schema files to a temp database and diff it against a target")]
#[command(version)]
struct Cli {
    /// Connection string for the target database. Required.
    #[arg(long = "target_connection", env = "target_connection", value_name = "CONNECTION_STRING")]
    target_connection: Option<String>,

    /// Connection string for the temp database server. Default: local database inside container.
    #[arg(long = "temp_connection", env = "temp_connection", value_name = "CONNECTION_STRING")]
    temp_connection: Option<String>,

    /// Directory with sql files. Default: current directory.
    #[arg(long = "schema_directory", env = "schema_directory", value_name = "DIRECTORY")]
    schema_directory: Option<PathBuf>,

    /// Directory for publish script files, used with generate_publish_file. Default: bin/Debug/publish
    #[arg(long = "output_directory", env = "output_directory", value_name = "DIRECTORY")]
    output_directory: Option<PathBuf>,

    /// Generate a publish script file.
    #[arg(
        long = "generate_publish_file",
        env = "generate_publish_file",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    generate_publish_file: bool,

    /// Do not drop the temp database.
    #[arg(
        long = "do_not_drop",
        env = "do_not_drop",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    do_not_drop: bool,

    /// Enable debug output.
    #[arg(
        long = "debug",
        env = "debug",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    debug: bool,

    /// Diff tool executable. Default: migra
    #[arg(long = "diff_tool", env = "diff_tool", value_name = "PROGRAM")]
    diff_tool: Option<PathBuf>,

    /// Seconds to wait for the diff tool before killing it. Default: 300
    #[arg(long = "diff_timeout", env = "diff_timeout", value_name = "SECONDS")]
    diff_timeout: Option<u64>,

    /// Log format: text or json
    #[arg(long = "log_format", env = "log_format", value_name = "FORMAT")]
    log_format: Option<String>,

    /// TOML file with defaults for any of the options above
    #[arg(long = "config", env = "db_publisher_config", value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_layer(self) -> ConfigLayer {
        ConfigLayer {
            temp_connection: self.temp_connection,
            target_connection: self.target_connection,
            schema_directory: self.schema_directory,
            output_directory: self.output_directory,
            generate_publish_file: self.generate_publish_file.then_some(true),
            debug: self.debug.then_some(true),
            do_not_drop: self.do_not_drop.then_some(true),
            diff_tool: self.diff_tool,
            diff_timeout: self.diff_timeout,
            log_format: self.log_format,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_layer = match &cli.config {
        Some(path) => config::load_from_file(path)?,
        None => ConfigLayer::default(),
    };
    let config = Config::resolve(cli.into_layer().or(file_layer))?;

    init_logging(config.debug, config.log_format)?;

    let outcome = db_publisher::publish(config)
        .await
        .context("Publish failed")?;

    if let Some(path) = &outcome.publish_file {
        tracing::debug!(path = %path.display(), "Publish file written");
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(outcome.diff.as_bytes())?;
    stdout.flush()?;

    Ok(())
}
