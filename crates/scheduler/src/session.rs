//! Per-connection worker session.
//!
//! A session registers the worker, then reads frames until the connection
//! fails. `RESULT` frames are stored; every other command is dropped without
//! an error or a log line. When the loop ends the worker is deregistered and
//! its transport closed.

use std::sync::Arc;

use dts_wire::{read_frame, Command, Frame, ResultPayload, WireError};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, instrument, warn};

use crate::registry::WorkerHandle;
use crate::state::SchedulerState;
use crate::task::TaskId;

/// Serve one worker connection to completion.
#[instrument(name = "worker_session", skip_all, fields(peer = %peer))]
pub async fn run_session<S>(state: Arc<SchedulerState>, stream: S, peer: String)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let handle = Arc::new(WorkerHandle::new(
        state.registry.next_worker_id(),
        peer,
        writer,
    ));

    state.registry.add(handle.clone()).await;
    state.metrics.record_worker_connected();
    info!(worker = %handle.peer(), worker_id = handle.id(), "worker connected");

    let reason = serve(&state, &mut reader).await;
    if reason.is_disconnect() {
        info!(worker = %handle.peer(), reason = %reason, "worker disconnected");
    } else {
        warn!(worker = %handle.peer(), error = %reason, "worker session failed");
    }

    if state.registry.remove(handle.id()).await.is_some() {
        state.metrics.record_worker_disconnected();
    }
    handle.close().await;
}

/// Read and handle frames until something fails. Returns the failure.
async fn serve<R>(state: &SchedulerState, reader: &mut R) -> WireError
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = match read_frame(reader).await {
            Ok(frame) => frame,
            Err(e) => return e,
        };
        if let Err(e) = handle_frame(state, &frame).await {
            return e;
        }
    }
}

/// Apply one frame received from a worker.
///
/// A `RESULT` body that does not parse ends the session.
pub async fn handle_frame(state: &SchedulerState, frame: &Frame) -> Result<(), WireError> {
    match frame.kind() {
        Some(Command::Result) => {
            let result: ResultPayload = frame.decode_json()?;
            let task_id = TaskId::from(result.task_id);
            info!(task_id = %task_id, "received result for task");
            state.results.put(task_id, result.result).await;
            state.metrics.record_result();
        }
        _ => state.metrics.record_ignored_frame(),
    }
    Ok(())
}
