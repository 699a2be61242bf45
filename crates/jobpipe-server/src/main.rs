//! Jobpipe Server - Main entry point

use anyhow::Result;
use clap::Parser;
use jobpipe_common::logging::{init_logging, LogConfig, LogLevel};
use tracing::info;

use jobpipe_server::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = LogConfig::builder()
        .log_file_prefix("jobpipe-server")
        .filter_directives("jobpipe_server=debug,tower_http=debug,sqlx=warn");
    if cli.verbose {
        builder = builder.level(LogLevel::Debug);
    }

    // Environment variables take precedence
    let log_config = builder.build().merge_env()?;
    let _guard = init_logging(&log_config)?;

    info!(command = ?cli.command(), "Starting jobpipe-server");

    cli::run(cli).await
}
