//! Dispatch loop pairing queued tasks with live workers.
//!
//! Each iteration walks `Idle -> TaskPulled -> WorkerSelected -> Sent`, or
//! `WorkerSelected -> Requeued` when no worker is registered. A requeued task
//! goes back on the tail of the queue and the loop sleeps for the back-off
//! before pulling again.
//!
//! A failed write to the chosen worker is logged and counted, and the task is
//! dropped. It is not requeued.

use std::sync::Arc;
use std::time::Duration;

use dts_wire::Frame;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::error::SchedulerError;
use crate::registry::WorkerId;
use crate::shutdown::stop_requested;
use crate::state::SchedulerState;
use crate::task::{Task, TaskId};

/// Where a single dispatch attempt ended up.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The task was written to a worker.
    Sent { task_id: TaskId, worker: WorkerId },
    /// No worker was available; the task is back on the queue.
    Requeued { task_id: TaskId },
    /// Writing to the worker failed; the task is lost.
    Failed {
        task_id: TaskId,
        error: SchedulerError,
    },
}

impl DispatchOutcome {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::Sent { task_id, .. } | Self::Requeued { task_id } | Self::Failed { task_id, .. } => {
                task_id
            }
        }
    }
}

pub struct Dispatcher {
    state: Arc<SchedulerState>,
    backoff: Duration,
}

impl Dispatcher {
    pub fn new(state: Arc<SchedulerState>, backoff: Duration) -> Self {
        Self { state, backoff }
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// Shutdown is only observed while waiting for a task or backing off, so a
    /// task that has left the queue is always carried through to an outcome.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(backoff = ?self.backoff, "dispatcher started");
        loop {
            let task = tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => break,
                task = self.state.queue.dequeue() => task,
            };

            if let DispatchOutcome::Requeued { .. } = self.dispatch(task).await {
                tokio::select! {
                    biased;
                    _ = stop_requested(&mut shutdown) => break,
                    _ = tokio::time::sleep(self.backoff) => {}
                }
            }
        }
        info!("dispatcher stopped");
    }

    /// Pull the next task, waiting for one if the queue is empty, and try to place it.
    pub async fn dispatch_next(&self) -> DispatchOutcome {
        let task = self.state.queue.dequeue().await;
        self.dispatch(task).await
    }

    /// Try to place `task` on a worker, requeueing it if none is registered.
    pub async fn dispatch(&self, task: Task) -> DispatchOutcome {
        let task_id = task.id.clone();
        match self.send_to_worker(&task).await {
            Ok(worker) => {
                self.state.metrics.record_dispatched();
                DispatchOutcome::Sent { task_id, worker }
            }
            Err(SchedulerError::NoCapacity) => {
                debug!(task_id = %task_id, "no workers available, requeueing task");
                self.state.queue.requeue(task).await;
                self.state.metrics.record_requeued();
                DispatchOutcome::Requeued { task_id }
            }
            Err(error) => {
                error!(task_id = %task_id, error = %error, "error assigning task");
                self.state.metrics.record_dispatch_failure();
                DispatchOutcome::Failed { task_id, error }
            }
        }
    }

    async fn send_to_worker(&self, task: &Task) -> Result<WorkerId, SchedulerError> {
        let worker = self
            .state
            .registry
            .select_one()
            .await
            .ok_or(SchedulerError::NoCapacity)?;

        let frame = Frame::task(&task.to_payload())?;
        worker
            .send(&frame)
            .await
            .map_err(|source| SchedulerError::DispatchFailure {
                task_id: task.id.clone(),
                source,
            })?;

        info!(task_id = %task.id, worker = %worker.peer(), "assigned task to worker");
        Ok(worker.id())
    }
}

#[cfg(test)]
mod tests {
    use dts_wire::{read_frame, Command, TaskPayload};
    use tokio::io::DuplexStream;

    use super::*;
    use crate::registry::{SelectionPolicy, WorkerHandle};

    const BACKOFF: Duration = Duration::from_secs(1);

    /// Register a worker backed by an in-memory pipe; returns the worker's read end.
    async fn attach_worker(state: &SchedulerState, peer: &str) -> DuplexStream {
        attach_worker_with_capacity(state, peer, 64 * 1024).await
    }

    async fn attach_worker_with_capacity(
        state: &SchedulerState,
        peer: &str,
        capacity: usize,
    ) -> DuplexStream {
        let (scheduler_side, worker_side) = tokio::io::duplex(capacity);
        let handle = WorkerHandle::new(state.registry.next_worker_id(), peer, scheduler_side);
        state.registry.add(Arc::new(handle)).await;
        worker_side
    }

    async fn next_task(worker: &mut DuplexStream) -> TaskPayload {
        let frame = read_frame(worker).await.unwrap();
        assert_eq!(frame.kind(), Some(Command::Task));
        frame.decode_json().unwrap()
    }

    #[tokio::test]
    async fn happy_path_preserves_fifo() {
        let state = SchedulerState::default().shared();
        let mut worker = attach_worker(&state, "w1").await;
        let dispatcher = Dispatcher::new(state.clone(), BACKOFF);

        state.queue.enqueue(Task::with_id("A", "first")).await;
        state.queue.enqueue(Task::with_id("B", "second")).await;

        assert!(matches!(dispatcher.dispatch_next().await, DispatchOutcome::Sent { .. }));
        assert!(matches!(dispatcher.dispatch_next().await, DispatchOutcome::Sent { .. }));

        let a = next_task(&mut worker).await;
        let b = next_task(&mut worker).await;
        assert_eq!((a.id.as_str(), a.data.as_str()), ("A", "first"));
        assert_eq!((b.id.as_str(), b.data.as_str()), ("B", "second"));
        assert_eq!(state.metrics.snapshot().dispatched, 2);
    }

    #[tokio::test]
    async fn no_worker_requeues_at_tail() {
        let state = SchedulerState::default().shared();
        let dispatcher = Dispatcher::new(state.clone(), BACKOFF);

        state.queue.enqueue(Task::with_id("A", "x")).await;
        state.queue.enqueue(Task::with_id("B", "y")).await;

        let outcome = dispatcher.dispatch_next().await;
        assert!(matches!(outcome, DispatchOutcome::Requeued { .. }));
        assert_eq!(outcome.task_id().as_str(), "A");

        assert_eq!(state.queue.len().await, 2);
        assert_eq!(state.queue.dequeue().await.id.as_str(), "B");
        assert_eq!(state.queue.dequeue().await.id.as_str(), "A");
        assert_eq!(state.metrics.snapshot().requeued, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn requeued_task_dispatches_once_a_worker_arrives() {
        let state = SchedulerState::default().shared();
        state.queue.enqueue(Task::with_id("T", "payload")).await;

        let (stop_tx, stop_rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(state.clone(), BACKOFF);
        let handle = tokio::spawn(async move { dispatcher.run(stop_rx).await });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let requeued = state.metrics.snapshot().requeued;
        assert!(requeued >= 2, "expected repeated requeues, got {requeued}");
        assert_eq!(state.queue.len().await, 1);

        let mut worker = attach_worker(&state, "late").await;
        let registered_at = tokio::time::Instant::now();
        let task = tokio::time::timeout(Duration::from_secs(5), next_task(&mut worker))
            .await
            .expect("task should reach the late worker");
        assert_eq!(task.id, "T");
        assert!(registered_at.elapsed() <= BACKOFF);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn failed_write_drops_the_task() {
        let state = SchedulerState::default().shared();
        let worker = attach_worker(&state, "gone").await;
        drop(worker);

        let dispatcher = Dispatcher::new(state.clone(), BACKOFF);
        state.queue.enqueue(Task::with_id("lost", "x")).await;

        match dispatcher.dispatch_next().await {
            DispatchOutcome::Failed { task_id, error } => {
                assert_eq!(task_id.as_str(), "lost");
                assert!(matches!(error, SchedulerError::DispatchFailure { .. }));
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        // Known gap: the task is not retried.
        assert!(state.queue.is_empty().await);
        assert_eq!(state.metrics.snapshot().dispatch_failures, 1);
    }

    #[tokio::test]
    async fn round_robin_spreads_tasks() {
        let state = SchedulerState::with_policy(SelectionPolicy::RoundRobin).shared();
        let mut w1 = attach_worker(&state, "w1").await;
        let mut w2 = attach_worker(&state, "w2").await;
        let dispatcher = Dispatcher::new(state.clone(), BACKOFF);

        for id in ["1", "2", "3", "4"] {
            dispatcher.dispatch(Task::with_id(id, "x")).await;
        }

        assert_eq!(next_task(&mut w1).await.id, "1");
        assert_eq!(next_task(&mut w2).await.id, "2");
        assert_eq!(next_task(&mut w1).await.id, "3");
        assert_eq!(next_task(&mut w2).await.id, "4");
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_while_idle() {
        let state = SchedulerState::default().shared();
        let (stop_tx, stop_rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(state, BACKOFF);
        let handle = tokio::spawn(async move { dispatcher.run(stop_rx).await });

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("dispatcher should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_lets_an_in_flight_send_finish() {
        let state = SchedulerState::default().shared();
        // Too small for one frame, so the send stalls until the worker reads.
        let mut worker = attach_worker_with_capacity(&state, "slow", 8).await;
        state.queue.enqueue(Task::with_id("A", "first")).await;
        state.queue.enqueue(Task::with_id("B", "second")).await;

        let (stop_tx, stop_rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(state.clone(), BACKOFF);
        let handle = tokio::spawn(async move { dispatcher.run(stop_rx).await });

        tokio::time::timeout(Duration::from_secs(2), async {
            while state.queue.len().await != 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("dispatcher should pull the first task");
        tokio::time::sleep(Duration::from_millis(20)).await;

        stop_tx.send(true).unwrap();
        let task = tokio::time::timeout(Duration::from_secs(2), next_task(&mut worker))
            .await
            .expect("the pulled task should still be delivered");
        assert_eq!(task.id, "A");

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher should stop")
            .unwrap();
        assert_eq!(state.queue.len().await, 1);
        assert_eq!(state.metrics.snapshot().dispatched, 1);
    }

    #[test]
    fn run_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let dispatcher = Dispatcher::new(SchedulerState::default().shared(), BACKOFF);
        let (_tx, rx) = watch::channel(false);
        let fut = dispatcher.run(rx);
        assert_send(&fut);
    }
}
