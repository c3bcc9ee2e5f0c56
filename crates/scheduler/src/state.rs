use std::sync::Arc;

use tracing::info;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::metrics::SchedulerMetrics;
use crate::queue::TaskQueue;
use crate::registry::{SelectionPolicy, WorkerRegistry};
use crate::results::ResultStore;
use crate::task::{Task, TaskId};

/// Everything the accept loop, dispatcher, sessions and HTTP API share.
#[derive(Debug)]
pub struct SchedulerState {
    pub queue: TaskQueue,
    pub registry: WorkerRegistry,
    pub results: ResultStore,
    pub metrics: SchedulerMetrics,
}

/// Thread-safe handle to the scheduler state.
pub type SharedState = Arc<SchedulerState>;

impl SchedulerState {
    pub fn new(config: &SchedulerConfig) -> Self {
        let results = match config.result_ttl() {
            Some(ttl) => ResultStore::with_ttl(ttl),
            None => ResultStore::new(),
        };
        Self {
            queue: TaskQueue::new(),
            registry: WorkerRegistry::new(config.selection),
            results,
            metrics: SchedulerMetrics::new(),
        }
    }

    /// State with an unbounded result store and the given selection policy.
    pub fn with_policy(policy: SelectionPolicy) -> Self {
        Self {
            queue: TaskQueue::new(),
            registry: WorkerRegistry::new(policy),
            results: ResultStore::new(),
            metrics: SchedulerMetrics::new(),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    /// Accept one input value and queue it as a task with a fresh id.
    pub async fn submit(&self, data: impl Into<String>) -> Result<TaskId, SchedulerError> {
        let data = data.into();
        if data.trim().is_empty() {
            return Err(SchedulerError::InvalidSubmission(
                "task data must not be empty".into(),
            ));
        }

        let task = Task::new(data);
        let id = task.id.clone();
        self.queue.enqueue(task).await;
        self.metrics.record_submitted();
        info!(task_id = %id, "submitted task");
        Ok(id)
    }
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::with_policy(SelectionPolicy::default())
    }
}
