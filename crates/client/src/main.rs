//! dts-client: submit one value to a running dts-server.
//!
//! # Usage
//!
//! ```bash
//! dts-client "Hello, World!"
//! dts-client "Hello, World!" --server http://10.0.0.5:9002 --wait
//! ```

use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use dts_client::SchedulerClient;

/// Submit a task to the distributed task scheduler.
#[derive(Parser, Debug)]
#[command(name = "dts-client", version, about)]
struct Cli {
    /// Input value to process.
    data: String,

    /// Base URL of the scheduler's HTTP API.
    #[arg(long, env = "DTS_SERVER_URL", default_value = "http://127.0.0.1:9002")]
    server: String,

    /// Wait for the result and print it.
    #[arg(long)]
    wait: bool,

    /// Give up waiting after this many seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.data.trim().is_empty() {
        bail!("nothing to submit: input is empty");
    }

    let client = SchedulerClient::new(&cli.server);
    let id = client.submit(&cli.data).await?;
    tracing::debug!(task_id = %id, server = %client.base_url(), "task submitted");
    println!("{id}");

    if cli.wait {
        let result = client
            .wait_for_result(
                &id,
                Duration::from_secs(cli.timeout_secs),
                Duration::from_millis(250),
            )
            .await?;
        println!("{}", result.result);
    }

    Ok(())
}
