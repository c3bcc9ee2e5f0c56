//! Worker side of the scheduler connection.
//!
//! The worker reads `TASK` frames, runs them through a [`Processor`] and
//! answers each with a `RESULT` frame on the same connection. Tasks are
//! handled one at a time in arrival order.

use dts_wire::{read_frame, write_frame, Command, Frame, ResultPayload, TaskPayload};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::processor::Processor;

/// Counters for one connection's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub completed: u64,
    pub failed: u64,
    pub ignored: u64,
}

pub struct WorkerClient<S = TcpStream> {
    peer: String,
    reader: ReadHalf<S>,
    writer: WriteHalf<S>,
    stats: RunStats,
}

impl WorkerClient<TcpStream> {
    /// Open a TCP connection to the scheduler.
    pub async fn connect(addr: &str) -> Result<Self, WorkerError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| WorkerError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;
        info!(scheduler = %addr, "connected to scheduler");
        Ok(Self::from_stream(stream, addr))
    }
}

impl<S> WorkerClient<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn from_stream(stream: S, peer: impl Into<String>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            peer: peer.into(),
            reader,
            writer,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Process tasks until `shutdown` flips to `true` or the connection fails.
    ///
    /// Returns the stats on shutdown and the connection error otherwise.
    pub async fn run<P>(
        &mut self,
        processor: &P,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunStats, WorkerError>
    where
        P: Processor + ?Sized,
    {
        info!(scheduler = %self.peer, processor = processor.name(), "worker running");
        loop {
            let frame = tokio::select! {
                frame = read_frame(&mut self.reader) => frame?,
                _ = stop_requested(&mut shutdown) => {
                    info!(scheduler = %self.peer, "worker stopping");
                    return Ok(self.stats);
                }
            };
            self.handle_frame(processor, frame).await?;
        }
    }

    async fn handle_frame<P>(&mut self, processor: &P, frame: Frame) -> Result<(), WorkerError>
    where
        P: Processor + ?Sized,
    {
        if frame.kind() != Some(Command::Task) {
            debug!(command = frame.command, "ignoring frame");
            self.stats.ignored += 1;
            return Ok(());
        }

        let task: TaskPayload = match frame.decode_json() {
            Ok(task) => task,
            Err(e) => {
                warn!(error = %e, "skipping malformed task");
                self.stats.failed += 1;
                return Ok(());
            }
        };

        info!(task_id = %task.id, "received task");
        let result = match processor.process(&task.data).await {
            Ok(result) => result,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "task processing failed, skipping");
                self.stats.failed += 1;
                return Ok(());
            }
        };

        let reply = Frame::result(&ResultPayload {
            task_id: task.id.clone(),
            result,
        })?;
        write_frame(&mut self.writer, &reply).await?;
        self.stats.completed += 1;
        debug!(task_id = %task.id, "sent result");
        Ok(())
    }
}

/// Resolve once `shutdown` holds `true` or its sender is gone, without
/// leaking the `watch::Ref` guard into the caller's `select!`.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
