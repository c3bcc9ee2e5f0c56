//! dts-server: accepts worker connections and hands out queued tasks.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: workers on 0.0.0.0:9001, HTTP API on 9002
//! dts-server
//!
//! # From a config file, with an override
//! dts-server --config dts.toml --port 9100
//!
//! # Via environment variables
//! DTS_PORT=9100 DTS_SELECTION=first dts-server
//! ```

use std::path::PathBuf;

use clap::Parser;
use dts_scheduler::{SchedulerConfig, SchedulerServer, SelectionPolicy};
use tokio::sync::watch;

/// Distributed task scheduler.
#[derive(Parser, Debug)]
#[command(name = "dts-server", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "DTS_CONFIG")]
    config: Option<PathBuf>,

    /// Bind host for the worker listener and HTTP API.
    #[arg(long)]
    host: Option<String>,

    /// Worker listener port.
    #[arg(long)]
    port: Option<u16>,

    /// HTTP API port.
    #[arg(long)]
    http_port: Option<u16>,

    /// Disable the HTTP API.
    #[arg(long)]
    no_http: bool,

    /// Worker selection policy: "round_robin" or "first".
    #[arg(long)]
    selection: Option<SelectionPolicy>,

    /// Back-off after finding no worker, in milliseconds.
    #[arg(long)]
    backoff_ms: Option<u64>,
}

impl Cli {
    /// Command-line flags win over the file and the environment.
    fn apply(&self, config: &mut SchedulerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(port) = self.http_port {
            config.http.port = port;
        }
        if self.no_http {
            config.http.enabled = false;
        }
        if let Some(selection) = self.selection {
            config.selection = selection;
        }
        if let Some(ms) = self.backoff_ms {
            config.backoff_ms = ms;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(?cli, "starting dts-server");

    let mut config = SchedulerConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let server = SchedulerServer::bind(config).await?;
    if let Some(http) = server.http_addr() {
        tracing::info!(addr = %http, "submit tasks with POST /tasks");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.run(shutdown_rx).await?;

    tracing::info!("dts-server exited cleanly");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
