//! gridwatchd: serves orchestrator cluster state as Prometheus metrics.
//!
//! Each scrape of `/metrics` polls the control plane (leader, nodes,
//! allocations, evaluations, deployments, raft) and renders the result.
//!
//! # Usage
//!
//! ```text
//! gridwatchd serve --address http://127.0.0.1:4646 --listen 0.0.0.0:9172
//! gridwatchd probe --address http://127.0.0.1:4646
//! gridwatchd scrape --config /etc/gridwatch.toml
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gridwatch_client::HttpControlPlane;
use gridwatch_collector::Exporter;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{CollectorArgs, DaemonConfig};

#[derive(Parser)]
#[command(name = "gridwatchd", about = "Orchestrator metrics exporter")]
struct Cli {
    /// Log as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve `/metrics` and `/healthz` over HTTP.
    Serve {
        /// Address to listen on [default: 0.0.0.0:9172].
        #[arg(long)]
        listen: Option<SocketAddr>,

        #[command(flatten)]
        args: CollectorArgs,
    },
    /// Check that the control plane answers; exits non-zero if not.
    Probe {
        #[command(flatten)]
        args: CollectorArgs,
    },
    /// Run a single scrape and print it.
    Scrape {
        #[command(flatten)]
        args: CollectorArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve { listen, args } => {
            let mut config = DaemonConfig::load(&args)?;
            if let Some(listen) = listen {
                config.listen = listen;
            }
            serve(config).await
        }
        Command::Probe { args } => probe(DaemonConfig::load(&args)?).await,
        Command::Scrape { args } => scrape(DaemonConfig::load(&args)?).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gridwatchd=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_exporter(config: &DaemonConfig) -> anyhow::Result<Exporter<HttpControlPlane>> {
    let client = HttpControlPlane::new(&config.address, config.token.clone())
        .context("failed to create control-plane client")?;
    let exporter = Exporter::new(Arc::new(client), config.collector.clone())?;
    Ok(exporter)
}

async fn serve(config: DaemonConfig) -> anyhow::Result<()> {
    info!(address = %config.address, "gridwatch exporter starting");
    let exporter = Arc::new(build_exporter(&config)?);
    info!(
        concurrency = config.collector.concurrency,
        allocation_concurrency = config.collector.allocation_concurrency,
        allow_stale_reads = config.collector.allow_stale_reads,
        "collector initialized"
    );

    let router = gridwatch_api::build_router(exporter);
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "HTTP server starting");

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("gridwatch exporter stopped");
    Ok(())
}

async fn probe(config: DaemonConfig) -> anyhow::Result<()> {
    let exporter = build_exporter(&config)?;
    exporter
        .probe()
        .await
        .with_context(|| format!("control plane at {} is not reachable", config.address))?;
    info!(address = %config.address, "control plane reachable");
    Ok(())
}

async fn scrape(config: DaemonConfig) -> anyhow::Result<()> {
    let exporter = build_exporter(&config)?;
    let families = exporter.collect().await;
    print!("{}", gridwatch_metrics::render_prometheus(&families));
    Ok(())
}
