//! Scheduler process: worker listener, dispatcher, HTTP API and housekeeping.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api;
use crate::config::SchedulerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::SchedulerError;
use crate::session::run_session;
use crate::shutdown::stop_requested;
use crate::state::{SchedulerState, SharedState};

/// Pause after a failed `accept` before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// A bound scheduler, ready to run.
///
/// Binding and running are split so callers (and tests using port 0) can
/// read the real addresses before any worker connects.
pub struct SchedulerServer {
    config: SchedulerConfig,
    state: SharedState,
    listener: TcpListener,
    http_listener: Option<TcpListener>,
}

impl SchedulerServer {
    /// Bind the worker listener, and the HTTP listener when enabled.
    pub async fn bind(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let listener = bind_listener(&config.listen_addr()).await?;
        let http_listener = if config.http.enabled {
            Some(bind_listener(&config.http_addr()).await?)
        } else {
            None
        };
        let state = SchedulerState::new(&config).shared();
        Ok(Self {
            config,
            state,
            listener,
            http_listener,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SchedulerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Serve until `shutdown` flips to `true`.
    ///
    /// Open worker sessions are left to end on their own when their
    /// connections close; background tasks are awaited.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), SchedulerError> {
        let Self {
            config,
            state,
            listener,
            http_listener,
        } = self;

        let addr = listener.local_addr()?;
        info!(
            addr = %addr,
            selection = ?config.selection,
            "scheduler listening for workers"
        );

        let mut background: Vec<JoinHandle<()>> = Vec::new();

        let dispatcher = Dispatcher::new(state.clone(), config.backoff());
        let dispatcher_shutdown = shutdown.clone();
        background.push(tokio::spawn(async move {
            dispatcher.run(dispatcher_shutdown).await;
        }));

        if config.result_ttl().is_some() {
            let sweeper_state = state.clone();
            let interval = config.sweep_interval();
            let sweeper_shutdown = shutdown.clone();
            background.push(tokio::spawn(async move {
                sweeper_state
                    .results
                    .run_sweeper(interval, sweeper_shutdown)
                    .await;
            }));
        }

        if let Some(http) = http_listener {
            background.push(spawn_http(http, state.clone(), shutdown.clone()));
        }

        if config.metrics_log_interval_secs > 0 {
            background.push(spawn_metrics_log(
                state.clone(),
                Duration::from_secs(config.metrics_log_interval_secs),
                shutdown.clone(),
            ));
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(run_session(state.clone(), stream, peer.to_string()));
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to accept worker connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                _ = stop_requested(&mut shutdown) => break,
            }
        }

        info!("scheduler shutting down");
        for handle in background {
            if let Err(e) = handle.await {
                error!(error = %e, "background task panicked");
            }
        }
        info!("scheduler stopped");
        Ok(())
    }
}

async fn bind_listener(addr: &str) -> Result<TcpListener, SchedulerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| SchedulerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

fn spawn_http(
    listener: TcpListener,
    state: SharedState,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let addr = listener.local_addr().ok();
        info!(addr = ?addr, "HTTP API listening");

        let app = api::router(state);
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut rx = shutdown;
                stop_requested(&mut rx).await;
            })
            .await;
        if let Err(e) = result {
            error!(error = %e, "HTTP API failed");
        }
        info!("HTTP API stopped");
    })
}

fn spawn_metrics_log(
    state: SharedState,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snap = state.metrics.snapshot();
                    let workers = state.registry.len().await;
                    let queued = state.queue.len().await;
                    info!(
                        submitted = snap.submitted,
                        dispatched = snap.dispatched,
                        requeued = snap.requeued,
                        dispatch_failures = snap.dispatch_failures,
                        results = snap.results_received,
                        workers,
                        queued,
                        "scheduler metrics"
                    );
                }
                _ = stop_requested(&mut shutdown) => break,
            }
        }
    })
}
