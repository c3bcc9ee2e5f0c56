//! dts-worker: connects to a scheduler and answers tasks with SHA-256 digests.
//!
//! # Usage
//!
//! ```bash
//! # Local scheduler on the default port
//! dts-worker
//!
//! # Remote scheduler, reconnecting every 5 seconds after a drop
//! dts-worker --scheduler 10.0.0.5:9001 --reconnect-secs 5
//! ```

use std::time::Duration;

use clap::Parser;
use dts_worker::{Sha256Processor, WorkerClient};
use tokio::sync::watch;

/// Task worker for the distributed task scheduler.
#[derive(Parser, Debug)]
#[command(name = "dts-worker", version, about)]
struct Cli {
    /// Scheduler address (`host:port`).
    #[arg(long, env = "DTS_SCHEDULER_ADDR", default_value = "127.0.0.1:9001")]
    scheduler: String,

    /// Seconds to wait before reconnecting after the connection drops.
    /// Without it the worker exits when the session ends.
    #[arg(long, env = "DTS_RECONNECT_SECS")]
    reconnect_secs: Option<u64>,
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
    tracing::info!(?cli, "starting dts-worker");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let processor = Sha256Processor;
    let reconnect = cli.reconnect_secs.map(Duration::from_secs);

    loop {
        let outcome = match WorkerClient::connect(&cli.scheduler).await {
            Ok(mut client) => client.run(&processor, shutdown_rx.clone()).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(stats) => {
                tracing::info!(
                    completed = stats.completed,
                    failed = stats.failed,
                    "dts-worker exited cleanly"
                );
                return Ok(());
            }
            Err(e) => match reconnect {
                Some(delay) => {
                    tracing::warn!(error = %e, retry_in = ?delay, "scheduler connection lost");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown_rx.wait_for(|stop| *stop) => return Ok(()),
                    }
                }
                None if e.is_disconnect() => {
                    tracing::info!(error = %e, "scheduler closed the connection");
                    return Ok(());
                }
                None => return Err(e.into()),
            },
        }
    }
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
