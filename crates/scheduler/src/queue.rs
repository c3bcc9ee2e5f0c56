//! FIFO holding area for submitted tasks.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

use crate::task::Task;

/// Task queue shared by the submission path and the dispatcher.
///
/// [`dequeue`](Self::dequeue) suspends until a task is available. Tasks that
/// could not be placed go back on the tail via [`requeue`](Self::requeue).
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    available: Notify,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(&self, task: Task) {
        self.tasks.lock().await.push_back(task);
        self.available.notify_one();
    }

    /// Put a task back at the tail of the queue.
    pub async fn requeue(&self, task: Task) {
        self.enqueue(task).await;
    }

    /// Take the oldest task, waiting until one exists.
    ///
    /// Cancel-safe: a task leaves the queue only when the returned future
    /// completes.
    pub async fn dequeue(&self) -> Task {
        loop {
            if let Some(task) = self.tasks.lock().await.pop_front() {
                return task;
            }
            self.available.notified().await;
        }
    }

    /// Take the oldest task if one is queued.
    pub async fn try_dequeue(&self) -> Option<Task> {
        self.tasks.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }
}
