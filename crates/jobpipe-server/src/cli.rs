//! Command-line interface
//!
//! `serve` runs the HTTP API and the daily schedule. The other subcommands run
//! a single pipeline pass in the foreground against the same configuration and
//! exit.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use crate::config::Config;
use crate::context::AppContext;
use crate::features;
use crate::ingest::{IngestConfig, ReconcileScope};
use crate::sources::{SourceRegistry, SourceSelector};

#[derive(Parser, Debug)]
#[command(name = "jobpipe-server")]
#[command(author, version, about = "Job ingestion and enrichment pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Debug-level console logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API and the ingestion schedule (default)
    Serve,

    /// Run one ingestion pass and exit
    Ingest {
        /// Source name; every source when omitted
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Run one reconciliation pass and exit
    Reconcile {
        /// Regenerate enrichment for every active record
        #[arg(long)]
        all: bool,
    },

    /// List registered sources
    Sources,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command() {
        Command::Serve => serve().await,
        Command::Ingest { source } => ingest(source).await,
        Command::Reconcile { all } => {
            reconcile(if all {
                ReconcileScope::All
            } else {
                ReconcileScope::Missing
            })
            .await
        },
        Command::Sources => {
            dotenvy::dotenv().ok();
            let registry = SourceRegistry::standard(IngestConfig::from_env()?.max_jobs_per_source)?;
            for name in registry.names() {
                info!(source = %name, "Registered source");
            }
            Ok(())
        },
    }
}

async fn serve() -> Result<()> {
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let shutdown_timeout = config.server.shutdown_timeout_secs;

    let ctx = AppContext::init(config).await?;
    ctx.start_schedule().await?;

    let app = features::app(ctx.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    ctx.shutdown().await;
    info!("Server shut down gracefully");
    Ok(())
}

async fn ingest(source: Option<String>) -> Result<()> {
    let mut config = Config::load()?;
    config.ingest.schedule_enabled = false;
    let ctx = AppContext::init(config).await?;

    let report = ctx
        .service
        .ingest(&SourceSelector::parse(source.as_deref()))
        .await;
    ctx.shutdown().await;

    let report = report?;
    info!(summary = %serde_json::to_string(&report)?, "Ingestion finished");
    if report.locked_out {
        anyhow::bail!("Lock '{}' is held by another worker", report.lock);
    }
    Ok(())
}

async fn reconcile(scope: ReconcileScope) -> Result<()> {
    let mut config = Config::load()?;
    config.ingest.schedule_enabled = false;
    let ctx = AppContext::init(config).await?;

    let report = ctx.service.reconcile(scope).await;
    ctx.shutdown().await;

    info!(summary = %serde_json::to_string(&report)?, "Reconciliation finished");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
